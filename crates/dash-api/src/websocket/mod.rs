//! WebSocket 실시간 데이터 모듈.
//!
//! 구독 레지스트리, 메시지 타입, 연결 핸들러, 하트비트로 구성됩니다.

pub mod handler;
pub mod heartbeat;
pub mod messages;
pub mod registry;

pub use handler::{websocket_handler, websocket_router, WsState};
pub use heartbeat::{run_heartbeat, HEARTBEAT_INTERVAL_SECS};
pub use messages::{ClientMessage, ServerMessage, WsError};
pub use registry::{create_registry, Directive, SharedRegistry, SubscriptionRegistry};
