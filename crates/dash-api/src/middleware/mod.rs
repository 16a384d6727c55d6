//! HTTP 미들웨어 모듈.

pub mod metrics;
pub mod session;

pub use metrics::metrics_layer;
pub use session::{require_session, SESSION_HEADER};
