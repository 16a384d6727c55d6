//! 세션 검증 미들웨어.
//!
//! 보호된 라우트에서 `X-Session-Id` 헤더를 검증하고, 세션 항목을
//! request extension으로 주입합니다.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiErrorResponse;
use crate::state::AppState;

/// 세션 ID를 전달하는 요청 헤더.
pub const SESSION_HEADER: &str = "x-session-id";

/// 세션을 검증하고 [`SessionEntry`]를 extension으로 주입하는 미들웨어.
///
/// 헤더가 없거나 세션이 유효하지 않으면 401을 반환합니다. 만료된
/// 세션은 검증 과정에서 저장소에서 제거됩니다.
///
/// [`SessionEntry`]: crate::session::SessionEntry
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session_id = match request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(id) => id.to_string(),
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiErrorResponse::new(
                    "SESSION_REQUIRED",
                    "X-Session-Id 헤더가 필요합니다",
                )),
            )
                .into_response();
        }
    };

    match state.sessions.validate(&session_id).await {
        Ok(entry) => {
            request.extensions_mut().insert(entry);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Session validation failed");
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiErrorResponse::new("SESSION_INVALID", e.to_string())),
            )
                .into_response()
        }
    }
}
