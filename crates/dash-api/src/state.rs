//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 모든 API 핸들러에서 공유되는 상태를 관리합니다.
//! Arc로 래핑되어 여러 요청 간에 안전하게 공유됩니다.

use std::sync::Arc;

use dash_broker::{SmartApiClient, SyntheticFallback};
use dash_core::AppConfig;

use crate::cache::DataCaches;
use crate::session::SessionStore;
use crate::store::WatchlistStore;
use crate::websocket::{create_registry, ServerMessage, SharedRegistry};

/// 주기 데이터 브로드캐스트 채널 용량.
const BROADCAST_CAPACITY: usize = 256;

/// 애플리케이션 공유 상태.
///
/// 이 구조체는 모든 API 핸들러에서 접근할 수 있는 공유 리소스를 포함합니다.
/// Axum의 State extractor를 통해 핸들러에 주입됩니다.
#[derive(Clone)]
pub struct AppState {
    /// 브로커 클라이언트 - 업스트림 실패 시 합성 데이터로 폴백
    pub broker: Arc<SyntheticFallback<SmartApiClient>>,

    /// 세션 저장소 - 로그인 세션, 만료 검사
    pub sessions: Arc<SessionStore>,

    /// 데이터 캐시 - 시세/옵션체인/PCR/심리/히스토리
    pub caches: Arc<DataCaches>,

    /// 관심목록 저장소
    pub watchlists: Arc<WatchlistStore>,

    /// WebSocket 구독 레지스트리 - 실시간 데이터 브로드캐스트
    pub registry: SharedRegistry,

    /// 애플리케이션 설정
    pub config: Arc<AppConfig>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    pub fn new(config: AppConfig, broker: SyntheticFallback<SmartApiClient>) -> Self {
        Self {
            broker: Arc::new(broker),
            sessions: Arc::new(SessionStore::new(config.session.timeout_secs)),
            caches: Arc::new(DataCaches::new()),
            watchlists: Arc::new(WatchlistStore::new()),
            registry: create_registry(BROADCAST_CAPACITY),
            config: Arc::new(config),
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// WebSocket 메시지 브로드캐스트.
    ///
    /// 연결된 모든 클라이언트에게 메시지를 전송합니다.
    pub fn broadcast(&self, message: ServerMessage) -> usize {
        self.registry.broadcast(message)
    }

    /// 업스트림 브로커 연결 여부.
    pub async fn is_broker_connected(&self) -> bool {
        self.broker.is_connected().await
    }

    /// 서버 업타임(초) 반환.
    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
    }
}

/// 테스트용 AppState 생성 헬퍼.
///
/// 업스트림 연결 없이 합성 데이터만으로 동작하는 상태를 생성합니다.
#[cfg(test)]
pub fn create_test_state() -> AppState {
    let config = AppConfig::default();
    let broker = SyntheticFallback::synthetic_only();
    AppState::new(config, broker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_test_state_is_synthetic_only() {
        let state = create_test_state();
        assert!(!state.is_broker_connected().await);
        assert_eq!(state.registry.connection_count().await, 0);
    }

    #[test]
    fn test_uptime_is_non_negative() {
        let state = create_test_state();
        assert!(state.uptime_secs() >= 0);
    }
}
