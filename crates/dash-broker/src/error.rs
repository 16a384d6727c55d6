//! 브로커 에러 타입.

use thiserror::Error;

/// 업스트림 브로커 관련 에러.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// 인증 실패 (로그인 중 네트워크 장애 포함)
    #[error("Auth failure: {0}")]
    Auth(String),

    /// 데이터 조회 실패
    #[error("Fetch failure: {0}")]
    Fetch(String),

    /// 응답 파싱 실패
    #[error("Parse failure: {0}")]
    Parse(String),

    /// 업스트림이 지원하지 않는 작업
    #[error("Not supported: {0}")]
    Unsupported(&'static str),
}

/// 브로커 작업을 위한 Result 타입.
pub type BrokerResult<T> = Result<T, BrokerError>;

impl BrokerError {
    /// 합성 데이터로 대체 가능한 에러인지 확인.
    ///
    /// 인증 실패는 대체하지 않습니다. 세션 자체가 무효이므로 호출자가
    /// 재로그인해야 합니다.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            BrokerError::Fetch(_) | BrokerError::Parse(_) | BrokerError::Unsupported(_)
        )
    }

    /// 로그인 경로의 에러를 인증 실패로 정규화합니다.
    ///
    /// 로그인 중의 타임아웃/연결 실패는 자격증명 거부와 구분하지 않고
    /// 모두 인증 실패로 보고합니다.
    pub fn into_auth(self) -> Self {
        match self {
            BrokerError::Auth(_) => self,
            BrokerError::Fetch(_) | BrokerError::Parse(_) => {
                BrokerError::Auth("network".to_string())
            }
            BrokerError::Unsupported(what) => BrokerError::Auth(what.to_string()),
        }
    }
}

impl From<reqwest::Error> for BrokerError {
    fn from(err: reqwest::Error) -> Self {
        BrokerError::Fetch(err.to_string())
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        BrokerError::Parse(err.to_string())
    }
}
