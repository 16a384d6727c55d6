//! # Dash Core
//!
//! 대시보드 백엔드의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 백엔드 전반에서 사용되는 기본 타입을 제공합니다:
//! - 시세 / 옵션 체인 / PCR 데이터 구조체
//! - 과거 데이터 및 포트폴리오 타입
//! - 업스트림 세션 토큰
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;
