//! 인증 API 라우트.
//!
//! 업스트림 브로커 로그인으로 세션을 만들고 폐기합니다.
//!
//! # 엔드포인트
//!
//! - `POST /api/auth/login` - 업스트림 로그인 후 세션 발급
//! - `POST /api/auth/logout` - 세션 폐기

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use dash_broker::BrokerCredentials;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ApiErrorResponse, ApiResult};
use crate::middleware::SESSION_HEADER;
use crate::state::AppState;

/// 로그인 요청.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// 브로커 클라이언트 코드
    pub client_code: String,
    /// MPIN
    pub mpin: String,
    /// TOTP (통과 전달만, 서버는 생성하지 않음)
    pub totp: String,
    /// API 키 (생략 시 서버 설정값 사용)
    #[serde(default)]
    pub api_key: Option<String>,
}

/// 로그인 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// 발급된 세션 ID
    pub session_id: String,
    /// 클라이언트 코드
    pub client_code: String,
}

/// 성공 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/auth/login - 업스트림 로그인 후 세션 발급.
///
/// 로그인 실패는 401로 돌아오며 서버 상태에는 영향을 주지 않습니다.
async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let api_key = match request.api_key {
        Some(key) => key,
        None => state
            .config
            .broker
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().to_string())
            .ok_or_else(|| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiErrorResponse::new(
                        "API_KEY_REQUIRED",
                        "API 키가 요청에도 서버 설정에도 없습니다",
                    )),
                )
            })?,
    };

    let credentials = BrokerCredentials {
        api_key: api_key.into(),
        client_code: request.client_code.clone(),
        mpin: request.mpin.into(),
        totp: request.totp.into(),
    };

    let tokens = state.broker.login(&credentials).await.map_err(|e| {
        warn!(client_code = %request.client_code, error = %e, "Login failed");
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiErrorResponse::new("AUTH_FAILED", e.to_string())),
        )
    })?;

    let origin = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let session_id = state
        .sessions
        .create(tokens, request.client_code.clone(), origin)
        .await;

    info!(client_code = %request.client_code, "Login succeeded, session created");

    Ok(Json(LoginResponse {
        session_id,
        client_code: request.client_code,
    }))
}

/// POST /api/auth/logout - 세션 폐기.
///
/// 세션이 이미 없어도 성공으로 응답합니다.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<SuccessResponse>> {
    if let Some(id) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        state.sessions.destroy(id).await;
        info!("Session destroyed");
    }

    Ok(Json(SuccessResponse {
        success: true,
        message: "로그아웃되었습니다".to_string(),
    }))
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}
