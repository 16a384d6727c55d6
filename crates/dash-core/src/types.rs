//! 시장 데이터 및 포트폴리오 도메인 타입.
//!
//! 이 모듈은 대시보드 전반에서 사용되는 타입을 정의합니다:
//! - `MarketQuote` - 실시간 시세 데이터
//! - `OptionChain` / `StrikeRow` - 옵션 체인 스냅샷
//! - `PcrSnapshot` / `Sentiment` - Put-Call Ratio 분석
//! - `Candle` / `HistoricalSeries` - 과거 데이터
//! - `Holding` / `Position` / `PortfolioSlice` - 포트폴리오
//! - `SessionTokens` - 업스트림 브로커 세션 토큰

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 거래소 코드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExchangeCode {
    /// National Stock Exchange (현물)
    Nse,
    /// NSE Futures & Options (파생)
    Nfo,
    /// Bombay Stock Exchange
    Bse,
}

impl ExchangeCode {
    /// 거래소 코드를 업스트림 API 문자열로 변환.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeCode::Nse => "NSE",
            ExchangeCode::Nfo => "NFO",
            ExchangeCode::Bse => "BSE",
        }
    }
}

impl std::str::FromStr for ExchangeCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NSE" => Ok(ExchangeCode::Nse),
            "NFO" => Ok(ExchangeCode::Nfo),
            "BSE" => Ok(ExchangeCode::Bse),
            _ => Err(format!("Unknown exchange: {}", s)),
        }
    }
}

impl std::fmt::Display for ExchangeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 실시간 시세 데이터.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    /// 심볼 (예: "NIFTY")
    pub symbol: String,
    /// 현재가
    pub price: Decimal,
    /// 전일 대비 변동
    pub change: Decimal,
    /// 변동률(%)
    pub change_percent: Decimal,
    /// 거래량
    pub volume: i64,
    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
}

/// 옵션 체인의 단일 행사가 행.
///
/// 같은 행사가의 콜/풋 레그를 한 행으로 묶습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeRow {
    /// 행사가
    pub strike: Decimal,
    /// 콜 최종 체결가
    pub call_ltp: Decimal,
    /// 콜 미결제약정
    pub call_oi: i64,
    /// 콜 거래량
    pub call_volume: i64,
    /// 콜 내재변동성(%)
    pub call_iv: Decimal,
    /// 풋 최종 체결가
    pub put_ltp: Decimal,
    /// 풋 미결제약정
    pub put_oi: i64,
    /// 풋 거래량
    pub put_volume: i64,
    /// 풋 내재변동성(%)
    pub put_iv: Decimal,
}

/// 옵션 체인 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChain {
    /// 기초자산 심볼
    pub symbol: String,
    /// 만기일 (YYYY-MM-DD)
    pub expiry: String,
    /// 행사가별 행
    pub rows: Vec<StrikeRow>,
    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
}

impl OptionChain {
    /// 체인 전체의 콜 미결제약정 합계.
    pub fn total_call_oi(&self) -> i64 {
        self.rows.iter().map(|r| r.call_oi).sum()
    }

    /// 체인 전체의 풋 미결제약정 합계.
    pub fn total_put_oi(&self) -> i64 {
        self.rows.iter().map(|r| r.put_oi).sum()
    }
}

/// 시장 심리.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    /// 강세 (PCR < 0.8)
    Bullish,
    /// 약세 (PCR > 1.2)
    Bearish,
    /// 중립
    Neutral,
}

impl Sentiment {
    /// PCR 값에서 심리를 분류합니다.
    ///
    /// `None`은 콜 미결제약정이 0이어서 비율이 정의되지 않는 경우이며,
    /// 무한대 비율로 간주하여 약세로 분류합니다.
    pub fn from_ratio(ratio: Option<Decimal>) -> Self {
        use rust_decimal_macros::dec;
        match ratio {
            None => Sentiment::Bearish,
            Some(r) if r < dec!(0.8) => Sentiment::Bullish,
            Some(r) if r > dec!(1.2) => Sentiment::Bearish,
            Some(_) => Sentiment::Neutral,
        }
    }
}

/// Put-Call Ratio 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcrSnapshot {
    /// PCR 비율. 콜 미결제약정 합계가 0이면 정의되지 않음 (null).
    pub ratio: Option<Decimal>,
    /// 콜 미결제약정 합계
    pub total_call_oi: i64,
    /// 풋 미결제약정 합계
    pub total_put_oi: i64,
    /// 분류된 심리
    pub sentiment: Sentiment,
    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
}

/// OHLCV 캔들 데이터.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시각
    pub timestamp: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: i64,
}

/// 과거 데이터 조회 기간.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryPeriod {
    /// 1일 (시간봉 24개)
    #[serde(rename = "1D")]
    OneDay,
    /// 1주 (일봉 7개)
    #[serde(rename = "1W")]
    OneWeek,
    /// 1개월 (일봉 30개)
    #[serde(rename = "1M")]
    OneMonth,
    /// 3개월 (일봉 90개)
    #[serde(rename = "3M")]
    ThreeMonths,
    /// 1년 (일봉 365개)
    #[serde(rename = "1Y")]
    OneYear,
}

/// 기간별 데이터 간격.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryInterval {
    /// 시간봉
    Hourly,
    /// 일봉
    Daily,
}

impl HistoryPeriod {
    /// 기간의 데이터 포인트 수와 간격을 반환합니다.
    pub fn points(&self) -> (usize, HistoryInterval) {
        match self {
            HistoryPeriod::OneDay => (24, HistoryInterval::Hourly),
            HistoryPeriod::OneWeek => (7, HistoryInterval::Daily),
            HistoryPeriod::OneMonth => (30, HistoryInterval::Daily),
            HistoryPeriod::ThreeMonths => (90, HistoryInterval::Daily),
            HistoryPeriod::OneYear => (365, HistoryInterval::Daily),
        }
    }

    /// 기간 문자열 표현 (캐시 키 등).
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPeriod::OneDay => "1D",
            HistoryPeriod::OneWeek => "1W",
            HistoryPeriod::OneMonth => "1M",
            HistoryPeriod::ThreeMonths => "3M",
            HistoryPeriod::OneYear => "1Y",
        }
    }
}

impl std::str::FromStr for HistoryPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1D" => Ok(HistoryPeriod::OneDay),
            "1W" => Ok(HistoryPeriod::OneWeek),
            "1M" => Ok(HistoryPeriod::OneMonth),
            "3M" => Ok(HistoryPeriod::ThreeMonths),
            "1Y" => Ok(HistoryPeriod::OneYear),
            _ => Err(format!("Unknown history period: {}", s)),
        }
    }
}

/// 과거 데이터 시리즈.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalSeries {
    /// 심볼
    pub symbol: String,
    /// 조회 기간
    pub period: HistoryPeriod,
    /// 각 포인트의 시각 라벨 (ISO 8601)
    pub labels: Vec<String>,
    /// 캔들 데이터
    pub candles: Vec<Candle>,
}

/// 종목 검색 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// 종목 토큰
    pub token: String,
    /// 거래 심볼
    pub symbol: String,
    /// 종목명
    pub name: String,
    /// 거래소
    pub exchange: ExchangeCode,
}

/// 보유 종목.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    /// 심볼
    pub symbol: String,
    /// 보유 수량
    pub quantity: i64,
    /// 평균 단가
    pub avg_price: Decimal,
    /// 최종 체결가
    pub ltp: Decimal,
}

impl Holding {
    /// 평가 금액.
    pub fn value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.ltp
    }

    /// 투자 원금.
    pub fn invested(&self) -> Decimal {
        Decimal::from(self.quantity) * self.avg_price
    }

    /// 평가 손익.
    pub fn pnl(&self) -> Decimal {
        self.value() - self.invested()
    }
}

/// 미결제 포지션.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// 심볼
    pub symbol: String,
    /// 순 수량 (매도는 음수)
    pub net_quantity: i64,
    /// 평균 단가
    pub avg_price: Decimal,
    /// 최종 체결가
    pub ltp: Decimal,
    /// 평가 손익
    pub pnl: Decimal,
}

/// 보유 종목 + 포지션 묶음.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioSlice {
    /// 보유 종목
    pub holdings: Vec<Holding>,
    /// 미결제 포지션
    pub positions: Vec<Position>,
}

/// 포트폴리오 요약.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// 총 평가 금액
    pub total_value: Decimal,
    /// 총 투자 원금
    pub total_invested: Decimal,
    /// 총 평가 손익
    pub total_pnl: Decimal,
    /// 당일 변동 추정치
    pub day_change: Decimal,
    /// 보유 종목 수
    pub holdings_count: usize,
}

impl PortfolioSummary {
    /// 보유 종목 목록에서 요약을 계산합니다.
    pub fn from_holdings(holdings: &[Holding]) -> Self {
        use rust_decimal_macros::dec;

        let total_value: Decimal = holdings.iter().map(Holding::value).sum();
        let total_invested: Decimal = holdings.iter().map(Holding::invested).sum();
        let total_pnl = total_value - total_invested;

        Self {
            total_value,
            total_invested,
            total_pnl,
            day_change: total_pnl * dec!(0.1),
            holdings_count: holdings.len(),
        }
    }
}

/// 업스트림 브로커 세션 토큰.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    /// 인증 토큰 (JWT)
    pub jwt: String,
    /// 갱신 토큰
    pub refresh: String,
    /// 실시간 피드 토큰
    pub feed: String,
}
