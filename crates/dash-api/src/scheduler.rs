//! 실시간 데이터 팬아웃 스케줄러.
//!
//! 주기적으로 시세/PCR/심리 데이터를 생성해 WebSocket으로 전송하고,
//! 캐시에 기록합니다. 만료된 세션과 캐시 항목도 주기적으로
//! 정리합니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dash_broker::{next_expiry, BrokerClient, SyntheticFallback};
use dash_core::FanoutConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::DataCaches;
use crate::metrics::{record_fanout_tick, set_active_sessions};
use crate::session::SessionStore;
use crate::websocket::{ServerMessage, SharedRegistry};

/// 팬아웃 스케줄러.
///
/// 모든 틱 메서드는 외부에서 직접 호출할 수 있어 주기와 무관하게
/// 동작을 검증할 수 있습니다.
pub struct FanoutScheduler<C> {
    broker: Arc<SyntheticFallback<C>>,
    caches: Arc<DataCaches>,
    sessions: Arc<SessionStore>,
    registry: SharedRegistry,
    symbols: Vec<String>,
    cache_ttl: chrono::Duration,
}

impl<C: BrokerClient + 'static> FanoutScheduler<C> {
    /// 새 스케줄러 생성.
    pub fn new(
        broker: Arc<SyntheticFallback<C>>,
        caches: Arc<DataCaches>,
        sessions: Arc<SessionStore>,
        registry: SharedRegistry,
        symbols: Vec<String>,
        cache_ttl_secs: u64,
    ) -> Self {
        Self {
            broker,
            caches,
            sessions,
            registry,
            symbols,
            cache_ttl: chrono::Duration::seconds(cache_ttl_secs as i64),
        }
    }

    /// 시세 틱. 연결이 없으면 생성과 전송을 모두 건너뜁니다.
    ///
    /// # 반환값
    ///
    /// 전송이 일어났으면 `true`
    pub async fn market_tick(&self) -> bool {
        if self.registry.connection_count().await == 0 {
            debug!("Market tick skipped: no active connections");
            return false;
        }

        let mut data = HashMap::new();
        for symbol in &self.symbols {
            let quote = self.broker.quote(symbol).await;
            self.caches.market.put(symbol.clone(), quote.clone()).await;
            data.insert(symbol.clone(), quote);
        }

        record_fanout_tick("market");
        self.registry.broadcast(ServerMessage::MarketUpdate {
            timestamp: Utc::now().timestamp_millis(),
            data,
        });
        true
    }

    /// PCR 틱. 심볼별로 옵션 체인에서 PCR을 계산해 캐시하고
    /// 전송합니다. 체인은 같은 만기의 캐시 항목을 재사용합니다.
    pub async fn pcr_tick(&self) {
        let expiry = next_expiry();
        for symbol in &self.symbols {
            let key = DataCaches::chain_key(symbol, &expiry);
            let chain = match self.caches.option_chain.get(&key).await {
                Some(chain) => chain,
                None => {
                    let chain = self.broker.option_chain(symbol, &expiry).await;
                    self.caches.option_chain.put(key, chain.clone()).await;
                    chain
                }
            };

            let snapshot = self.broker.put_call_ratio(&chain);
            self.caches.pcr.put(symbol.clone(), snapshot.clone()).await;
            self.caches
                .sentiment
                .put(symbol.clone(), snapshot.sentiment.clone())
                .await;

            self.registry.broadcast(ServerMessage::PcrUpdate {
                symbol: symbol.clone(),
                timestamp: Utc::now().timestamp_millis(),
                data: snapshot,
            });
        }
        record_fanout_tick("pcr");
    }

    /// 심리 틱. 심볼별 심리를 하나의 메시지로 묶어 전송합니다.
    /// 캐시에 없는 심볼은 즉석에서 계산합니다.
    pub async fn sentiment_tick(&self) {
        let expiry = next_expiry();
        let mut data = HashMap::new();
        for symbol in &self.symbols {
            let sentiment = match self.caches.sentiment.get(symbol).await {
                Some(sentiment) => sentiment,
                None => {
                    let chain = self.broker.option_chain(symbol, &expiry).await;
                    let snapshot = self.broker.put_call_ratio(&chain);
                    self.caches
                        .sentiment
                        .put(symbol.clone(), snapshot.sentiment.clone())
                        .await;
                    snapshot.sentiment
                }
            };
            data.insert(symbol.clone(), sentiment);
        }

        record_fanout_tick("sentiment");
        self.registry.broadcast(ServerMessage::SentimentUpdate {
            timestamp: Utc::now().timestamp_millis(),
            data,
        });
    }

    /// 정리 틱. 만료된 세션과 오래된 캐시 항목을 제거합니다.
    pub async fn sweep_tick(&self) {
        let expired_sessions = self.sessions.sweep_expired().await;
        let stale_entries = self.caches.sweep_all(self.cache_ttl).await;

        set_active_sessions(self.sessions.count().await as f64);
        record_fanout_tick("sweep");

        if expired_sessions > 0 || stale_entries > 0 {
            info!(
                expired_sessions,
                stale_entries, "Sweep removed expired entries"
            );
        } else {
            debug!("Sweep found nothing to remove");
        }
    }

    /// 모든 주기 태스크를 시작합니다.
    ///
    /// 반환된 핸들은 취소 토큰이 발화되면 종료됩니다.
    pub fn spawn_all(
        self: Arc<Self>,
        config: &FanoutConfig,
        sweep_interval_secs: u64,
        cancellation_token: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        info!(
            market = config.market_interval_secs,
            pcr = config.pcr_interval_secs,
            sentiment = config.sentiment_interval_secs,
            sweep = sweep_interval_secs,
            "Fan-out scheduler started"
        );

        vec![
            self.clone().spawn_loop(
                Duration::from_secs(config.market_interval_secs),
                cancellation_token.clone(),
                |s| async move {
                    s.market_tick().await;
                },
            ),
            self.clone().spawn_loop(
                Duration::from_secs(config.pcr_interval_secs),
                cancellation_token.clone(),
                |s| async move { s.pcr_tick().await },
            ),
            self.clone().spawn_loop(
                Duration::from_secs(config.sentiment_interval_secs),
                cancellation_token.clone(),
                |s| async move { s.sentiment_tick().await },
            ),
            self.spawn_loop(
                Duration::from_secs(sweep_interval_secs),
                cancellation_token,
                |s| async move { s.sweep_tick().await },
            ),
        ]
    }

    fn spawn_loop<F, Fut>(
        self: Arc<Self>,
        interval: Duration,
        cancellation_token: CancellationToken,
        tick: F,
    ) -> JoinHandle<()>
    where
        F: Fn(Arc<Self>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 시작 직후의 즉시 틱은 건너뜀
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => tick(self.clone()).await,
                    _ = cancellation_token.cancelled() => break,
                }
            }
        })
    }
}
