//! # Dash Broker
//!
//! 업스트림 브로커(Angel One SmartAPI) 연동 계층을 제공합니다:
//! - `BrokerClient` trait - 통합 브로커 인터페이스
//! - `SmartApiClient` - SmartAPI REST 구현
//! - `MarketDataGenerator` - 합성 시장 데이터 생성기
//! - `SyntheticFallback` - 실패 시 합성 데이터로 대체하는 계층

pub mod error;
pub mod fallback;
pub mod smartapi;
pub mod synthetic;
pub mod traits;

pub use error::{BrokerError, BrokerResult};
pub use fallback::SyntheticFallback;
pub use smartapi::{index_token, SmartApiClient};
pub use synthetic::{next_expiry, MarketDataGenerator};
pub use traits::{BrokerClient, BrokerCredentials};
