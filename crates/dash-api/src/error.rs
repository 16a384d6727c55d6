//! 통합 API 에러 응답 타입.
//!
//! 모든 API 엔드포인트에서 일관된 에러 형식을 제공합니다.

use axum::http::StatusCode;
use axum::Json;
use dash_core::DashError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "SESSION_EXPIRED",
///   "message": "세션이 만료되었습니다",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "AUTH_FAILED", "INVALID_INPUT", "NOT_FOUND")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    pub timestamp: i64,
}

impl ApiErrorResponse {
    /// 기본 에러 생성.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입 별칭.
///
/// # Example
///
/// ```ignore
/// async fn get_quote(
///     Path(symbol): Path<String>,
///     State(state): State<Arc<AppState>>,
/// ) -> ApiResult<Json<MarketQuote>> {
///     let quote = state.broker.quote(&symbol).await.map_err(api_error)?;
///     Ok(Json(quote))
/// }
/// ```
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// [`DashError`]를 HTTP 응답으로 변환합니다.
pub fn api_error(err: DashError) -> (StatusCode, Json<ApiErrorResponse>) {
    let (status, code) = match &err {
        DashError::Auth(_) => (StatusCode::UNAUTHORIZED, "AUTH_FAILED"),
        DashError::Session(_) => (StatusCode::UNAUTHORIZED, "SESSION_EXPIRED"),
        DashError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        DashError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        DashError::Network(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };
    (status, Json(ApiErrorResponse::new(code, err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_response_new() {
        let error = ApiErrorResponse::new("TEST_ERROR", "Test message");
        assert_eq!(error.code, "TEST_ERROR");
        assert_eq!(error.message, "Test message");
        assert!(error.details.is_none());
    }

    #[test]
    fn test_json_serialization_omits_empty_details() {
        let error = ApiErrorResponse::new("NOT_FOUND", "Resource not found");
        let json = serde_json::to_string(&error).unwrap();

        assert!(!json.contains("details"));
        assert!(json.contains(r#""code":"NOT_FOUND""#));
        assert!(json.contains(r#""message":"Resource not found""#));
    }

    #[test]
    fn test_dash_error_status_mapping() {
        let (status, body) = api_error(DashError::Session("expired".to_string()));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.0.code, "SESSION_EXPIRED");

        let (status, body) = api_error(DashError::NotFound("watchlist".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.0.code, "NOT_FOUND");

        let (status, _) = api_error(DashError::Internal("boom".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
