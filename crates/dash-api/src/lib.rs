//! # Dash API
//!
//! Axum 기반 브로커 대시보드 백엔드:
//! - REST API (시세, 옵션 체인, PCR, 포트폴리오, 과거 데이터, 검색, 관심목록)
//! - WebSocket 실시간 팬아웃 (시세/PCR/심리, 하트비트)
//! - 세션 저장소와 TTL 캐시
//! - Prometheus 메트릭

pub mod cache;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod store;
pub mod websocket;

pub use error::{ApiErrorResponse, ApiResult};
pub use scheduler::FanoutScheduler;
pub use session::{SessionEntry, SessionStore};
pub use state::AppState;
