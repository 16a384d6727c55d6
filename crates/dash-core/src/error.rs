//! 대시보드 백엔드의 에러 타입.
//!
//! 이 모듈은 백엔드 전반에서 사용되는 에러 타입을 정의합니다.

use thiserror::Error;

/// 핵심 대시보드 에러.
#[derive(Debug, Error)]
pub enum DashError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 세션 에러 (유효하지 않거나 만료됨)
    #[error("세션 에러: {0}")]
    Session(String),

    /// 캐시 에러
    #[error("캐시 에러: {0}")]
    Cache(String),

    /// 업스트림 브로커 에러
    #[error("브로커 에러: {0}")]
    Broker(String),

    /// 인증 에러
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 찾을 수 없음
    #[error("찾을 수 없음: {0}")]
    NotFound(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 대시보드 작업을 위한 Result 타입.
pub type DashResult<T> = Result<T, DashError>;

impl DashError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DashError::Network(_) | DashError::Broker(_))
    }

    /// 클라이언트 입력 문제인지 확인합니다.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DashError::InvalidInput(_) | DashError::NotFound(_) | DashError::Session(_)
        )
    }
}

impl From<serde_json::Error> for DashError {
    fn from(err: serde_json::Error) -> Self {
        DashError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let network_err = DashError::Network("timeout".to_string());
        assert!(network_err.is_retryable());

        let session_err = DashError::Session("expired".to_string());
        assert!(!session_err.is_retryable());
    }

    #[test]
    fn test_error_client_classification() {
        assert!(DashError::NotFound("watchlist".to_string()).is_client_error());
        assert!(!DashError::Internal("oops".to_string()).is_client_error());
    }

    #[test]
    fn test_serde_error_conversion() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: DashError = bad.unwrap_err().into();
        assert!(matches!(err, DashError::Serialization(_)));
    }
}
