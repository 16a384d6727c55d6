//! WebSocket 하트비트 태스크.
//!
//! 주기적으로 모든 연결에 Ping을 보내고, 직전 주기에 응답하지 않은
//! 연결을 종료합니다. 무응답 연결은 두 번의 점검 안에 정리됩니다.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::registry::SharedRegistry;

/// 하트비트 점검 주기 (초).
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// 하트비트 루프를 실행합니다.
///
/// 취소 토큰이 발화될 때까지 `interval`마다 [`SubscriptionRegistry::probe_sweep`]를
/// 호출합니다.
///
/// [`SubscriptionRegistry::probe_sweep`]: super::registry::SubscriptionRegistry::probe_sweep
pub async fn run_heartbeat(
    registry: SharedRegistry,
    interval: Duration,
    cancellation_token: CancellationToken,
) {
    info!(
        "Heartbeat task started (interval: {}s)",
        interval.as_secs()
    );

    let mut ticker = tokio::time::interval(interval);
    // 시작 직후의 즉시 틱은 건너뜀
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let terminated = registry.probe_sweep().await;
                if !terminated.is_empty() {
                    info!(
                        "Heartbeat terminated {} unresponsive connection(s)",
                        terminated.len()
                    );
                } else {
                    debug!("Heartbeat sweep: all connections responsive");
                }
            }
            _ = cancellation_token.cancelled() => {
                info!("Heartbeat task shutting down");
                break;
            }
        }
    }
}
