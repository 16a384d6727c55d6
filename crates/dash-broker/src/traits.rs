//! 브로커 클라이언트 trait 정의.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dash_core::{
    Candle, ExchangeCode, HistoryInterval, Holding, Instrument, MarketQuote, OptionChain,
    Position, SessionTokens,
};
use secrecy::SecretString;

use crate::BrokerResult;

/// 업스트림 로그인 자격증명.
///
/// TOTP는 호출자가 제공한 값을 그대로 전달합니다. 생성하지 않습니다.
#[derive(Debug, Clone)]
pub struct BrokerCredentials {
    /// API 키
    pub api_key: SecretString,
    /// 클라이언트 코드
    pub client_code: String,
    /// MPIN
    pub mpin: SecretString,
    /// TOTP 코드
    pub totp: SecretString,
}

/// 통합 브로커 인터페이스.
///
/// 순수한 요청/응답 계층입니다. 재시도, 캐싱, 합성 대체는 모두
/// 호출자 몫입니다.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// 브로커 이름 반환.
    fn name(&self) -> &str;

    /// 업스트림 세션 생성.
    async fn login(&self, credentials: &BrokerCredentials) -> BrokerResult<SessionTokens>;

    /// 심볼의 현재 시세 조회.
    async fn quote(
        &self,
        tokens: &SessionTokens,
        exchange: ExchangeCode,
        symbol: &str,
        token: &str,
    ) -> BrokerResult<MarketQuote>;

    /// 보유 종목 조회.
    async fn holdings(&self, tokens: &SessionTokens) -> BrokerResult<Vec<Holding>>;

    /// 미결제 포지션 조회.
    async fn positions(&self, tokens: &SessionTokens) -> BrokerResult<Vec<Position>>;

    /// 종목 검색.
    async fn search(
        &self,
        tokens: &SessionTokens,
        exchange: ExchangeCode,
        text: &str,
    ) -> BrokerResult<Vec<Instrument>>;

    /// 과거 캔들 조회.
    async fn candles(
        &self,
        tokens: &SessionTokens,
        exchange: ExchangeCode,
        token: &str,
        interval: HistoryInterval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BrokerResult<Vec<Candle>>;

    /// 옵션 체인 조회.
    async fn option_chain(
        &self,
        tokens: &SessionTokens,
        symbol: &str,
        expiry: &str,
    ) -> BrokerResult<OptionChain>;
}
