//! 합성 데이터 대체 계층.
//!
//! 업스트림 브로커 클라이언트를 감싸고, 조회 실패 시 해당 호출만
//! 합성 데이터로 대체합니다. 실패는 호출 단위로만 처리하며
//! "degraded" 같은 상태 플래그를 남기지 않습니다. 다음 호출은 다시
//! 업스트림부터 시도합니다.

use chrono::{Duration, Utc};
use dash_core::{
    ExchangeCode, HistoricalSeries, HistoryPeriod, Instrument, MarketQuote, OptionChain,
    PcrSnapshot, PortfolioSlice, SessionTokens,
};
use tokio::sync::RwLock;
use tracing::warn;

use crate::smartapi::index_token;
use crate::{BrokerClient, BrokerCredentials, BrokerError, BrokerResult, MarketDataGenerator};

/// 업스트림 + 합성 대체 데이터 소스.
///
/// 업스트림 세션 토큰은 마지막으로 성공한 로그인의 것을 보관하며,
/// 모든 데이터 조회가 공유합니다.
pub struct SyntheticFallback<C> {
    inner: Option<C>,
    generator: MarketDataGenerator,
    tokens: RwLock<Option<SessionTokens>>,
}

impl<C: BrokerClient> SyntheticFallback<C> {
    /// 업스트림 클라이언트가 있는 대체 계층을 생성합니다.
    pub fn new(inner: C) -> Self {
        Self {
            inner: Some(inner),
            generator: MarketDataGenerator::new(),
            tokens: RwLock::new(None),
        }
    }

    /// 업스트림 없이 합성 데이터만 사용하는 대체 계층을 생성합니다.
    pub fn synthetic_only() -> Self {
        Self {
            inner: None,
            generator: MarketDataGenerator::new(),
            tokens: RwLock::new(None),
        }
    }

    /// 합성 생성기 참조.
    pub fn generator(&self) -> &MarketDataGenerator {
        &self.generator
    }

    /// 업스트림 세션 보유 여부.
    pub async fn is_connected(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    /// 업스트림 로그인. 합성 대체가 없는 유일한 경로입니다.
    ///
    /// 성공하면 토큰을 이후의 모든 데이터 조회가 쓰도록 보관합니다.
    pub async fn login(&self, credentials: &BrokerCredentials) -> BrokerResult<SessionTokens> {
        let inner = self
            .inner
            .as_ref()
            .ok_or(BrokerError::Unsupported("upstream login"))?;

        let tokens = inner.login(credentials).await.map_err(|e| e.into_auth())?;
        *self.tokens.write().await = Some(tokens.clone());
        Ok(tokens)
    }

    /// 업스트림 세션을 폐기합니다.
    pub async fn disconnect(&self) {
        *self.tokens.write().await = None;
    }

    async fn upstream_tokens(&self) -> Option<SessionTokens> {
        self.tokens.read().await.clone()
    }

    /// 심볼 시세. 업스트림 실패 시 합성.
    pub async fn quote(&self, symbol: &str) -> MarketQuote {
        if let (Some(inner), Some(tokens)) = (self.inner.as_ref(), self.upstream_tokens().await) {
            let token = index_token(symbol).unwrap_or(symbol);
            match inner.quote(&tokens, ExchangeCode::Nse, symbol, token).await {
                Ok(quote) => return quote,
                Err(e) => warn!(symbol = %symbol, error = %e, "Upstream quote failed, using synthetic"),
            }
        }
        self.generator.realtime_quote(symbol)
    }

    /// 옵션 체인. 업스트림이 지원하지 않으므로 사실상 항상 합성.
    pub async fn option_chain(&self, symbol: &str, expiry: &str) -> OptionChain {
        if let (Some(inner), Some(tokens)) = (self.inner.as_ref(), self.upstream_tokens().await) {
            match inner.option_chain(&tokens, symbol, expiry).await {
                Ok(chain) => return chain,
                Err(BrokerError::Unsupported(_)) => {}
                Err(e) => warn!(symbol = %symbol, error = %e, "Upstream option chain failed, using synthetic"),
            }
        }
        self.generator.option_chain(symbol, expiry, 15)
    }

    /// 옵션 체인에서 PCR 계산.
    pub fn put_call_ratio(&self, chain: &OptionChain) -> PcrSnapshot {
        self.generator.put_call_ratio(chain)
    }

    /// 포트폴리오. 업스트림 실패 시 데모 포트폴리오.
    pub async fn portfolio(&self) -> PortfolioSlice {
        if let (Some(inner), Some(tokens)) = (self.inner.as_ref(), self.upstream_tokens().await) {
            let holdings = inner.holdings(&tokens).await;
            let positions = inner.positions(&tokens).await;
            match (holdings, positions) {
                (Ok(holdings), Ok(positions)) => {
                    return PortfolioSlice {
                        holdings,
                        positions,
                    }
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "Upstream portfolio failed, using demo portfolio")
                }
            }
        }
        self.generator.portfolio()
    }

    /// 과거 데이터. 업스트림 실패 시 합성.
    pub async fn history(&self, symbol: &str, period: HistoryPeriod) -> HistoricalSeries {
        if let (Some(inner), Some(tokens)) = (self.inner.as_ref(), self.upstream_tokens().await) {
            if let Some(token) = index_token(symbol) {
                let (count, interval) = period.points();
                let to = Utc::now();
                let from = match interval {
                    dash_core::HistoryInterval::Hourly => to - Duration::hours(count as i64),
                    dash_core::HistoryInterval::Daily => to - Duration::days(count as i64),
                };

                match inner
                    .candles(&tokens, ExchangeCode::Nse, token, interval, from, to)
                    .await
                {
                    Ok(candles) => {
                        let labels = candles.iter().map(|c| c.timestamp.to_rfc3339()).collect();
                        return HistoricalSeries {
                            symbol: symbol.to_string(),
                            period,
                            labels,
                            candles,
                        };
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Upstream history failed, using synthetic")
                    }
                }
            }
        }
        self.generator.historical_series(symbol, period)
    }

    /// 종목 검색. 업스트림이 없으면 알려진 지수만 필터링합니다.
    pub async fn search(&self, exchange: ExchangeCode, text: &str) -> Vec<Instrument> {
        if let (Some(inner), Some(tokens)) = (self.inner.as_ref(), self.upstream_tokens().await) {
            match inner.search(&tokens, exchange, text).await {
                Ok(results) => return results,
                Err(e) => warn!(error = %e, "Upstream search failed, using index list"),
            }
        }

        let needle = text.to_uppercase();
        ["NIFTY", "BANKNIFTY", "FINNIFTY", "MIDCPNIFTY"]
            .iter()
            .filter(|s| s.contains(&needle))
            .filter_map(|s| {
                index_token(s).map(|token| Instrument {
                    token: token.to_string(),
                    symbol: (*s).to_string(),
                    name: (*s).to_string(),
                    exchange: ExchangeCode::Nse,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use dash_core::{Candle, Holding, HistoryInterval, Position};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 호출 횟수를 세면서 처음 N번은 실패하는 스텁 클라이언트.
    struct FlakyBroker {
        login_failures: usize,
        login_calls: AtomicUsize,
        quote_calls: AtomicUsize,
    }

    impl FlakyBroker {
        fn failing_logins(n: usize) -> Self {
            Self {
                login_failures: n,
                login_calls: AtomicUsize::new(0),
                quote_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BrokerClient for FlakyBroker {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn login(&self, _credentials: &BrokerCredentials) -> BrokerResult<SessionTokens> {
            let call = self.login_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.login_failures {
                return Err(BrokerError::Auth("invalid totp".to_string()));
            }
            Ok(SessionTokens {
                jwt: format!("jwt-{}", call),
                refresh: "refresh".to_string(),
                feed: "feed".to_string(),
            })
        }

        async fn quote(
            &self,
            _tokens: &SessionTokens,
            _exchange: ExchangeCode,
            _symbol: &str,
            _token: &str,
        ) -> BrokerResult<MarketQuote> {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            Err(BrokerError::Fetch("HTTP 502".to_string()))
        }

        async fn holdings(&self, _tokens: &SessionTokens) -> BrokerResult<Vec<Holding>> {
            Err(BrokerError::Fetch("HTTP 502".to_string()))
        }

        async fn positions(&self, _tokens: &SessionTokens) -> BrokerResult<Vec<Position>> {
            Ok(vec![])
        }

        async fn search(
            &self,
            _tokens: &SessionTokens,
            _exchange: ExchangeCode,
            _text: &str,
        ) -> BrokerResult<Vec<Instrument>> {
            Err(BrokerError::Fetch("HTTP 502".to_string()))
        }

        async fn candles(
            &self,
            _tokens: &SessionTokens,
            _exchange: ExchangeCode,
            _token: &str,
            _interval: HistoryInterval,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> BrokerResult<Vec<Candle>> {
            Err(BrokerError::Fetch("HTTP 502".to_string()))
        }

        async fn option_chain(
            &self,
            _tokens: &SessionTokens,
            _symbol: &str,
            _expiry: &str,
        ) -> BrokerResult<OptionChain> {
            Err(BrokerError::Unsupported("option chain"))
        }
    }

    fn credentials() -> BrokerCredentials {
        BrokerCredentials {
            api_key: "key".into(),
            client_code: "C123".to_string(),
            mpin: "0000".into(),
            totp: "123456".into(),
        }
    }

    #[tokio::test]
    async fn test_login_fails_then_succeeds() {
        let fallback = SyntheticFallback::new(FlakyBroker::failing_logins(2));

        assert!(fallback.login(&credentials()).await.is_err());
        assert!(!fallback.is_connected().await);

        assert!(fallback.login(&credentials()).await.is_err());
        assert!(!fallback.is_connected().await);

        let tokens = fallback.login(&credentials()).await.unwrap();
        assert_eq!(tokens.jwt, "jwt-2");
        assert!(fallback.is_connected().await);
    }

    #[tokio::test]
    async fn test_quote_degrades_per_call() {
        let fallback = SyntheticFallback::new(FlakyBroker::failing_logins(0));
        fallback.login(&credentials()).await.unwrap();

        // 업스트림을 매번 시도하고, 실패하면 그 호출만 합성으로 대체
        let first = fallback.quote("NIFTY").await;
        let second = fallback.quote("NIFTY").await;
        assert_eq!(first.symbol, "NIFTY");
        assert_eq!(second.symbol, "NIFTY");
        assert_eq!(
            fallback.inner.as_ref().unwrap().quote_calls.load(Ordering::SeqCst),
            2
        );
    }

    #[tokio::test]
    async fn test_synthetic_only_quote() {
        let fallback = SyntheticFallback::<FlakyBroker>::synthetic_only();
        let quote = fallback.quote("BANKNIFTY").await;
        assert_eq!(quote.symbol, "BANKNIFTY");
        assert!(quote.volume > 0);
    }

    #[tokio::test]
    async fn test_option_chain_always_synthesized() {
        let fallback = SyntheticFallback::new(FlakyBroker::failing_logins(0));
        fallback.login(&credentials()).await.unwrap();

        let chain = fallback.option_chain("NIFTY", "2026-09-03").await;
        assert_eq!(chain.rows.len(), 31);
    }

    #[tokio::test]
    async fn test_portfolio_demo_when_upstream_fails() {
        let fallback = SyntheticFallback::new(FlakyBroker::failing_logins(0));
        fallback.login(&credentials()).await.unwrap();

        let slice = fallback.portfolio().await;
        assert_eq!(slice.holdings.len(), 5);
    }

    #[tokio::test]
    async fn test_search_filters_indices_without_upstream() {
        let fallback = SyntheticFallback::<FlakyBroker>::synthetic_only();
        let results = fallback.search(ExchangeCode::Nse, "nifty").await;
        assert_eq!(results.len(), 4);

        let results = fallback.search(ExchangeCode::Nse, "BANK").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol, "BANKNIFTY");
    }
}
