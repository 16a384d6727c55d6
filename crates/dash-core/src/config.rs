//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다. 모든 시간 값은
//! 초 단위이며, 기본값은 업스트림 연결 없이도 서버가 동작하도록
//! 설정되어 있습니다.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 업스트림 브로커 설정
    #[serde(default)]
    pub broker: BrokerConfig,
    /// 세션 설정
    #[serde(default)]
    pub session: SessionConfig,
    /// 캐시 설정
    #[serde(default)]
    pub cache: CacheConfig,
    /// 실시간 전송 설정
    #[serde(default)]
    pub fanout: FanoutConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            broker: BrokerConfig::default(),
            session: SessionConfig::default(),
            cache: CacheConfig::default(),
            fanout: FanoutConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            request_timeout_secs: 30,
        }
    }
}

/// 업스트림 브로커 설정.
///
/// 자격증명이 없으면 서버는 합성 데이터만으로 동작합니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrokerConfig {
    /// REST API 기본 URL
    #[serde(default = "default_broker_base_url")]
    pub base_url: String,
    /// API 키
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// 클라이언트 코드
    #[serde(default)]
    pub client_code: Option<String>,
    /// MPIN
    #[serde(default)]
    pub mpin: Option<SecretString>,
    /// TOTP (통과 전달만, 생성하지 않음)
    #[serde(default)]
    pub totp: Option<SecretString>,
}

fn default_broker_base_url() -> String {
    "https://apiconnect.angelone.in".to_string()
}

impl BrokerConfig {
    /// 업스트림 로그인에 필요한 자격증명이 모두 있는지 확인합니다.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
            && self.client_code.is_some()
            && self.mpin.is_some()
            && self.totp.is_some()
    }
}

/// 세션 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// 세션 유효 시간 (초, 기본 8시간)
    pub timeout_secs: u64,
    /// 만료 세션 정리 주기 (초, 기본 1시간)
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 8 * 3600,
            sweep_interval_secs: 3600,
        }
    }
}

/// 캐시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// 캐시 항목 TTL (초, 기본 24시간)
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 24 * 3600 }
    }
}

/// 실시간 전송 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FanoutConfig {
    /// 시세 전송 주기 (초)
    pub market_interval_secs: u64,
    /// PCR 전송 주기 (초)
    pub pcr_interval_secs: u64,
    /// 심리 전송 주기 (초)
    pub sentiment_interval_secs: u64,
    /// 하트비트 점검 주기 (초)
    pub heartbeat_interval_secs: u64,
    /// 전송 대상 지수 심볼
    pub symbols: Vec<String>,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            market_interval_secs: 5,
            pcr_interval_secs: 10,
            sentiment_interval_secs: 15,
            heartbeat_interval_secs: 30,
            symbols: vec![
                "NIFTY".to_string(),
                "BANKNIFTY".to_string(),
                "FINNIFTY".to_string(),
                "MIDCPNIFTY".to_string(),
            ],
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값에서 시작하고, `FSDASH__` 접두사의 환경
    /// 변수가 항상 마지막에 적용됩니다 (예:
    /// `FSDASH__SERVER__PORT=8080`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("FSDASH")
                    .separator("__")
                    .try_parsing(true),
            );

        let loaded = builder.build()?;
        loaded.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }
}
