//! WebSocket 구독 레지스트리.
//!
//! 연결별 구독 집합과 생존 플래그를 관리합니다. 주기 데이터는 공유
//! broadcast 채널로 흐르고, 각 연결의 전송 태스크가
//! `filter_for_conn`으로 자기 몫만 걸러냅니다. 확인 응답과 하트비트
//! 제어는 연결별 direct 채널로만 전달되어 해당 연결에만 도달합니다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};

use super::messages::ServerMessage;

/// direct 채널 버퍼 크기.
const DIRECT_CHANNEL_CAPACITY: usize = 32;

/// 연결별 direct 채널로 전달되는 지시.
#[derive(Debug, Clone)]
pub enum Directive {
    /// 이 연결에만 보내는 메시지 (확인 응답, 퐁, 에러)
    Message(ServerMessage),
    /// 전송 계층 핑
    Ping,
    /// 연결 종료
    Close,
}

/// 연결 상태.
#[derive(Debug)]
struct ClientConn {
    /// 구독 중인 심볼 (대문자 정규화)
    subscriptions: HashSet<String>,
    /// 마지막 점검 이후 응답 여부
    alive: bool,
    /// direct 채널 송신단
    direct: mpsc::Sender<Directive>,
}

/// 구독 레지스트리.
pub struct SubscriptionRegistry {
    broadcast_tx: broadcast::Sender<ServerMessage>,
    conns: RwLock<HashMap<String, ClientConn>>,
}

impl SubscriptionRegistry {
    /// 주어진 broadcast 버퍼 크기로 레지스트리를 생성합니다.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            broadcast_tx: tx,
            conns: RwLock::new(HashMap::new()),
        }
    }

    /// 새 연결을 등록하고 (broadcast 수신기, direct 수신기)를
    /// 반환합니다.
    pub async fn register(
        &self,
        conn_id: &str,
    ) -> (broadcast::Receiver<ServerMessage>, mpsc::Receiver<Directive>) {
        let (direct_tx, direct_rx) = mpsc::channel(DIRECT_CHANNEL_CAPACITY);
        let conn = ClientConn {
            subscriptions: HashSet::new(),
            alive: true,
            direct: direct_tx,
        };
        self.conns.write().await.insert(conn_id.to_string(), conn);
        (self.broadcast_tx.subscribe(), direct_rx)
    }

    /// 연결을 제거합니다. 이미 없는 연결이어도 무해합니다.
    pub async fn unregister(&self, conn_id: &str) {
        self.conns.write().await.remove(conn_id);
    }

    /// 구독 집합을 통째로 교체하고 유효 목록을 반환합니다.
    pub async fn set_subscriptions(&self, conn_id: &str, symbols: &[String]) -> Vec<String> {
        let mut conns = self.conns.write().await;
        let Some(conn) = conns.get_mut(conn_id) else {
            return Vec::new();
        };

        conn.subscriptions = symbols.iter().map(|s| s.to_uppercase()).collect();

        let mut effective: Vec<String> = conn.subscriptions.iter().cloned().collect();
        effective.sort();
        effective
    }

    /// 구독을 모두 해제합니다.
    pub async fn clear_subscriptions(&self, conn_id: &str) {
        let mut conns = self.conns.write().await;
        if let Some(conn) = conns.get_mut(conn_id) {
            conn.subscriptions.clear();
        }
    }

    /// 연결의 현재 구독 집합.
    pub async fn subscriptions_of(&self, conn_id: &str) -> HashSet<String> {
        let conns = self.conns.read().await;
        conns
            .get(conn_id)
            .map(|c| c.subscriptions.clone())
            .unwrap_or_default()
    }

    /// 연결을 응답 상태로 표시합니다 (퐁 수신 시).
    pub async fn mark_alive(&self, conn_id: &str) {
        let mut conns = self.conns.write().await;
        if let Some(conn) = conns.get_mut(conn_id) {
            conn.alive = true;
        }
    }

    /// 모든 연결의 broadcast 스트림으로 메시지를 전송합니다.
    ///
    /// 수신자가 없으면 0을 반환합니다 (에러 아님).
    pub fn broadcast(&self, message: ServerMessage) -> usize {
        self.broadcast_tx.send(message).unwrap_or(0)
    }

    /// 특정 연결의 direct 채널로 지시를 전달합니다.
    pub async fn send_direct(&self, conn_id: &str, directive: Directive) {
        let conns = self.conns.read().await;
        if let Some(conn) = conns.get(conn_id) {
            let _ = conn.direct.send(directive).await;
        }
    }

    /// broadcast 메시지를 연결에 맞게 필터링합니다.
    ///
    /// `market_update`는 페이로드를 구독 집합과의 교집합으로
    /// 재구성하며, 교집합이 비면 `None`을 반환해 전송을 건너뜁니다.
    /// `pcr_update`와 `sentiment_update`는 그대로 통과합니다.
    pub async fn filter_for_conn(
        &self,
        conn_id: &str,
        message: &ServerMessage,
    ) -> Option<ServerMessage> {
        match message {
            ServerMessage::MarketUpdate { timestamp, data } => {
                let subscriptions = {
                    let conns = self.conns.read().await;
                    conns.get(conn_id)?.subscriptions.clone()
                };

                let filtered: HashMap<_, _> = data
                    .iter()
                    .filter(|(symbol, _)| subscriptions.contains(*symbol))
                    .map(|(symbol, quote)| (symbol.clone(), quote.clone()))
                    .collect();

                if filtered.is_empty() {
                    None
                } else {
                    Some(ServerMessage::MarketUpdate {
                        timestamp: *timestamp,
                        data: filtered,
                    })
                }
            }
            other => Some(other.clone()),
        }
    }

    /// 하트비트 점검.
    ///
    /// 지난 점검에 응답하지 않은 연결은 종료 지시 후 제거하고, 나머지는
    /// 미응답 상태로 표시한 뒤 전송 계층 핑을 보냅니다. 종료된 연결
    /// ID 목록을 반환합니다.
    pub async fn probe_sweep(&self) -> Vec<String> {
        let mut conns = self.conns.write().await;
        let mut terminated = Vec::new();

        for (id, conn) in conns.iter_mut() {
            if conn.alive {
                conn.alive = false;
                let _ = conn.direct.try_send(Directive::Ping);
            } else {
                let _ = conn.direct.try_send(Directive::Close);
                terminated.push(id.clone());
            }
        }

        for id in &terminated {
            conns.remove(id);
        }

        terminated
    }

    /// 현재 연결 수.
    pub async fn connection_count(&self) -> usize {
        self.conns.read().await.len()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// 공유 가능한 레지스트리 타입.
pub type SharedRegistry = Arc<SubscriptionRegistry>;

/// 새로운 공유 레지스트리 생성.
pub fn create_registry(capacity: usize) -> SharedRegistry {
    Arc::new(SubscriptionRegistry::new(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dash_core::MarketQuote;
    use rust_decimal_macros::dec;

    fn quote(symbol: &str) -> MarketQuote {
        MarketQuote {
            symbol: symbol.to_string(),
            price: dec!(100),
            change: dec!(1),
            change_percent: dec!(1),
            volume: 1000,
            timestamp: Utc::now(),
        }
    }

    fn market_update(symbols: &[&str]) -> ServerMessage {
        let data = symbols
            .iter()
            .map(|s| (s.to_string(), quote(s)))
            .collect();
        ServerMessage::MarketUpdate {
            timestamp: 0,
            data,
        }
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let registry = SubscriptionRegistry::new(16);
        let (_rx, _direct) = registry.register("c1").await;
        assert_eq!(registry.connection_count().await, 1);

        registry.unregister("c1").await;
        registry.unregister("c1").await;
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_replaces_wholesale() {
        let registry = SubscriptionRegistry::new(16);
        let (_rx, _direct) = registry.register("c1").await;

        let first = registry
            .set_subscriptions("c1", &["nifty".to_string(), "BANKNIFTY".to_string()])
            .await;
        assert_eq!(first, vec!["BANKNIFTY", "NIFTY"]);

        // 교체이지 병합이 아님
        let second = registry
            .set_subscriptions("c1", &["FINNIFTY".to_string()])
            .await;
        assert_eq!(second, vec!["FINNIFTY"]);
        assert_eq!(registry.subscriptions_of("c1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_market_filter_is_exact_intersection() {
        let registry = SubscriptionRegistry::new(16);
        let (_rx, _direct) = registry.register("c1").await;
        registry
            .set_subscriptions("c1", &["NIFTY".to_string(), "FINNIFTY".to_string()])
            .await;

        let msg = market_update(&["NIFTY", "BANKNIFTY", "MIDCPNIFTY"]);
        let filtered = registry.filter_for_conn("c1", &msg).await.unwrap();

        match filtered {
            ServerMessage::MarketUpdate { data, .. } => {
                assert_eq!(data.len(), 1);
                assert!(data.contains_key("NIFTY"));
            }
            _ => panic!("Expected MarketUpdate"),
        }
    }

    #[tokio::test]
    async fn test_empty_intersection_skips_message() {
        let registry = SubscriptionRegistry::new(16);
        let (_rx, _direct) = registry.register("c1").await;
        registry.set_subscriptions("c1", &["FINNIFTY".to_string()]).await;

        let msg = market_update(&["NIFTY", "BANKNIFTY"]);
        assert!(registry.filter_for_conn("c1", &msg).await.is_none());

        // 구독이 없는 연결도 아무것도 받지 않음
        let (_rx2, _direct2) = registry.register("c2").await;
        assert!(registry.filter_for_conn("c2", &msg).await.is_none());
    }

    #[tokio::test]
    async fn test_pcr_and_sentiment_pass_unfiltered() {
        let registry = SubscriptionRegistry::new(16);
        let (_rx, _direct) = registry.register("c1").await;
        // 구독이 전혀 없어도 통과

        let msg = ServerMessage::SentimentUpdate {
            timestamp: 0,
            data: HashMap::new(),
        };
        assert!(registry.filter_for_conn("c1", &msg).await.is_some());
    }

    #[tokio::test]
    async fn test_probe_sweep_terminates_silent_connections() {
        let registry = SubscriptionRegistry::new(16);
        let (_rx1, mut direct1) = registry.register("silent").await;
        let (_rx2, mut direct2) = registry.register("responsive").await;

        // 1차 점검: 모두 생존 → 핑 전송, 미응답 표시
        let terminated = registry.probe_sweep().await;
        assert!(terminated.is_empty());
        assert!(matches!(direct1.recv().await, Some(Directive::Ping)));
        assert!(matches!(direct2.recv().await, Some(Directive::Ping)));

        // responsive만 퐁으로 응답
        registry.mark_alive("responsive").await;

        // 2차 점검: silent 종료
        let terminated = registry.probe_sweep().await;
        assert_eq!(terminated, vec!["silent".to_string()]);
        assert!(matches!(direct1.recv().await, Some(Directive::Close)));
        assert!(matches!(direct2.recv().await, Some(Directive::Ping)));
        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_responsive_connection_survives_many_sweeps() {
        let registry = SubscriptionRegistry::new(16);
        let (_rx, _direct) = registry.register("c1").await;

        for _ in 0..5 {
            let terminated = registry.probe_sweep().await;
            assert!(terminated.is_empty());
            registry.mark_alive("c1").await;
        }
        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_without_receivers() {
        let registry = SubscriptionRegistry::new(16);
        // 수신자가 없어도 패닉하지 않음
        assert_eq!(registry.broadcast(market_update(&["NIFTY"])), 0);
    }
}
