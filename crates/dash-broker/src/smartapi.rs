//! SmartAPI REST 클라이언트.
//!
//! Angel One SmartAPI를 통해 시세/포트폴리오/과거 데이터를 조회하는
//! REST 클라이언트입니다.
//!
//! # 지원 기능
//!
//! - 세션 생성 (MPIN + TOTP)
//! - LTP 시세 조회
//! - 보유 종목 / 포지션 조회
//! - 종목 검색
//! - 과거 캔들 조회
//!
//! 옵션 체인은 업스트림이 직접 제공하지 않으므로 `Unsupported`를
//! 반환하며, 호출자가 합성 데이터로 대체합니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dash_core::{
    Candle, ExchangeCode, HistoryInterval, Holding, Instrument, MarketQuote, OptionChain,
    Position, SessionTokens,
};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error};

use crate::{BrokerClient, BrokerCredentials, BrokerError, BrokerResult};

/// 주요 지수의 심볼 토큰.
pub fn index_token(symbol: &str) -> Option<&'static str> {
    match symbol {
        "NIFTY" => Some("99926000"),
        "BANKNIFTY" => Some("99926009"),
        "FINNIFTY" => Some("99926037"),
        "MIDCPNIFTY" => Some("99926074"),
        _ => None,
    }
}

/// SmartAPI REST 클라이언트.
pub struct SmartApiClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

/// SmartAPI 응답 봉투. 모든 엔드포인트가 같은 모양을 사용합니다.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
struct Envelope<T> {
    status: bool,
    message: String,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(rename = "jwtToken")]
    jwt_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    #[serde(rename = "feedToken")]
    feed_token: String,
}

#[derive(Debug, Deserialize)]
struct LtpData {
    tradingsymbol: String,
    close: Decimal,
    ltp: Decimal,
}

#[derive(Debug, Deserialize)]
struct HoldingRow {
    tradingsymbol: String,
    quantity: i64,
    averageprice: Decimal,
    ltp: Decimal,
}

#[derive(Debug, Deserialize)]
struct PositionRow {
    tradingsymbol: String,
    netqty: i64,
    avgnetprice: Decimal,
    ltp: Decimal,
    #[serde(default)]
    pnl: Decimal,
}

#[derive(Debug, Deserialize)]
struct ScripRow {
    exchange: String,
    tradingsymbol: String,
    symboltoken: String,
}

impl SmartApiClient {
    /// 새 SmartAPI 클라이언트를 생성합니다.
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> BrokerResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| BrokerError::Fetch(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 모든 요청에 공통으로 붙는 SmartAPI 헤더.
    fn common_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("X-UserType", "USER")
            .header("X-SourceID", "WEB")
            .header("X-ClientLocalIP", "127.0.0.1")
            .header("X-ClientPublicIP", "127.0.0.1")
            .header("X-MACAddress", "00:00:00:00:00:00")
            .header("X-PrivateKey", self.api_key.expose_secret())
    }

    /// 인증된 요청을 보내고 봉투를 풉니다.
    async fn send_authed<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        tokens: &SessionTokens,
        what: &str,
    ) -> BrokerResult<T> {
        let response = self
            .common_headers(builder)
            .header("Authorization", format!("Bearer {}", tokens.jwt))
            .send()
            .await
            .map_err(|e| BrokerError::Fetch(format!("{}: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BrokerError::Fetch(format!("{}: {}", what, e)))?;

        if !status.is_success() {
            error!("SmartAPI {} failed: {} - {}", what, status, body);
            return Err(BrokerError::Fetch(format!("{}: HTTP {}", what, status)));
        }

        debug!("SmartAPI {} response: {}", what, body);

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| BrokerError::Parse(format!("{}: {}", what, e)))?;

        if !envelope.status {
            return Err(BrokerError::Fetch(format!("{}: {}", what, envelope.message)));
        }

        envelope
            .data
            .ok_or_else(|| BrokerError::Parse(format!("{}: empty data", what)))
    }
}

#[async_trait]
impl BrokerClient for SmartApiClient {
    fn name(&self) -> &str {
        "smartapi"
    }

    async fn login(&self, credentials: &BrokerCredentials) -> BrokerResult<SessionTokens> {
        let url = self.endpoint("/rest/auth/angelbroking/user/v1/loginByPassword");
        let body = serde_json::json!({
            "clientcode": credentials.client_code,
            "password": credentials.mpin.expose_secret(),
            "totp": credentials.totp.expose_secret(),
        });

        let response = self
            .common_headers(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|_| BrokerError::Auth("network".to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|_| BrokerError::Auth("network".to_string()))?;

        if !status.is_success() {
            return Err(BrokerError::Auth(format!("HTTP {}", status)));
        }

        let envelope: Envelope<LoginData> = serde_json::from_str(&text)
            .map_err(|e| BrokerError::Parse(format!("login: {}", e)))?;

        if !envelope.status {
            return Err(BrokerError::Auth(envelope.message));
        }

        let data = envelope
            .data
            .ok_or_else(|| BrokerError::Parse("login: empty data".to_string()))?;

        Ok(SessionTokens {
            jwt: data.jwt_token,
            refresh: data.refresh_token,
            feed: data.feed_token,
        })
    }

    async fn quote(
        &self,
        tokens: &SessionTokens,
        exchange: ExchangeCode,
        symbol: &str,
        token: &str,
    ) -> BrokerResult<MarketQuote> {
        let url = self.endpoint("/rest/secure/angelbroking/order/v1/getLtpData");
        let body = serde_json::json!({
            "exchange": exchange.as_str(),
            "tradingsymbol": symbol,
            "symboltoken": token,
        });

        let data: LtpData = self
            .send_authed(self.client.post(&url).json(&body), tokens, "quote")
            .await?;

        let change = data.ltp - data.close;
        let change_percent = if data.close.is_zero() {
            Decimal::ZERO
        } else {
            (change / data.close * Decimal::from(100)).round_dp(2)
        };

        Ok(MarketQuote {
            symbol: data.tradingsymbol,
            price: data.ltp,
            change,
            change_percent,
            // LTP 응답에는 거래량이 없음
            volume: 0,
            timestamp: Utc::now(),
        })
    }

    async fn holdings(&self, tokens: &SessionTokens) -> BrokerResult<Vec<Holding>> {
        let url = self.endpoint("/rest/secure/angelbroking/portfolio/v1/getHolding");
        let rows: Vec<HoldingRow> = self
            .send_authed(self.client.get(&url), tokens, "holdings")
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| Holding {
                symbol: r.tradingsymbol,
                quantity: r.quantity,
                avg_price: r.averageprice,
                ltp: r.ltp,
            })
            .collect())
    }

    async fn positions(&self, tokens: &SessionTokens) -> BrokerResult<Vec<Position>> {
        let url = self.endpoint("/rest/secure/angelbroking/order/v1/getPosition");
        let rows: Vec<PositionRow> = self
            .send_authed(self.client.get(&url), tokens, "positions")
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| Position {
                symbol: r.tradingsymbol,
                net_quantity: r.netqty,
                avg_price: r.avgnetprice,
                ltp: r.ltp,
                pnl: r.pnl,
            })
            .collect())
    }

    async fn search(
        &self,
        tokens: &SessionTokens,
        exchange: ExchangeCode,
        text: &str,
    ) -> BrokerResult<Vec<Instrument>> {
        let url = self.endpoint("/rest/secure/angelbroking/order/v1/searchScrip");
        let body = serde_json::json!({
            "exchange": exchange.as_str(),
            "searchscrip": text,
        });

        let rows: Vec<ScripRow> = self
            .send_authed(self.client.post(&url).json(&body), tokens, "search")
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let exchange = r.exchange.parse().unwrap_or(ExchangeCode::Nse);
                Instrument {
                    token: r.symboltoken,
                    name: r.tradingsymbol.clone(),
                    symbol: r.tradingsymbol,
                    exchange,
                }
            })
            .collect())
    }

    async fn candles(
        &self,
        tokens: &SessionTokens,
        exchange: ExchangeCode,
        token: &str,
        interval: HistoryInterval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BrokerResult<Vec<Candle>> {
        let url = self.endpoint("/rest/secure/angelbroking/historical/v1/getCandleData");
        let interval = match interval {
            HistoryInterval::Hourly => "ONE_HOUR",
            HistoryInterval::Daily => "ONE_DAY",
        };
        let body = serde_json::json!({
            "exchange": exchange.as_str(),
            "symboltoken": token,
            "interval": interval,
            "fromdate": from.format("%Y-%m-%d %H:%M").to_string(),
            "todate": to.format("%Y-%m-%d %H:%M").to_string(),
        });

        // 캔들은 [timestamp, open, high, low, close, volume] 배열로 옴
        let rows: Vec<(String, Decimal, Decimal, Decimal, Decimal, i64)> = self
            .send_authed(self.client.post(&url).json(&body), tokens, "candles")
            .await?;

        rows.into_iter()
            .map(|(ts, open, high, low, close, volume)| {
                let timestamp = DateTime::parse_from_rfc3339(&ts)
                    .map_err(|e| BrokerError::Parse(format!("candles: {}", e)))?
                    .with_timezone(&Utc);
                Ok(Candle {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume,
                })
            })
            .collect()
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
