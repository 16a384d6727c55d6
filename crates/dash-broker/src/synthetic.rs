//! 합성 시장 데이터 생성기.
//!
//! 업스트림 브로커가 없거나 조회가 실패했을 때 사용하는 현실적인
//! 시뮬레이션 데이터를 생성합니다. 지수별 기준가 주변에서 랜덤
//! 변동을 만들어 시세, 옵션 체인, PCR, 과거 데이터를 합성합니다.

use chrono::{Datelike, Duration, Utc, Weekday};
use dash_core::{
    Candle, Holding, HistoricalSeries, HistoryInterval, HistoryPeriod, MarketQuote, OptionChain,
    PcrSnapshot, PortfolioSlice, Sentiment, StrikeRow,
};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// 시세 변동성 (기준가 대비 ±1%).
const QUOTE_VOLATILITY: f64 = 0.02;

/// 옵션 프리미엄 최저가.
const PREMIUM_FLOOR: f64 = 0.05;

/// 지수별 기준가와 기준 거래량.
fn base_for(symbol: &str) -> (f64, i64) {
    match symbol {
        "BANKNIFTY" => (46_850.00, 98_000_000),
        "FINNIFTY" => (20_150.00, 42_000_000),
        "MIDCPNIFTY" => (10_450.00, 28_000_000),
        // 알 수 없는 심볼은 NIFTY 기준
        _ => (21_725.00, 145_000_000),
    }
}

fn dec2(v: f64) -> Decimal {
    Decimal::try_from(v).unwrap_or_default().round_dp(2)
}

/// 다음 주간 만기일 (다음 목요일, YYYY-MM-DD).
pub fn next_expiry() -> String {
    let today = Utc::now().date_naive();
    let days_ahead = (Weekday::Thu.num_days_from_monday() + 7
        - today.weekday().num_days_from_monday())
        % 7;
    let days_ahead = if days_ahead == 0 { 7 } else { days_ahead };
    (today + Duration::days(days_ahead as i64))
        .format("%Y-%m-%d")
        .to_string()
}

/// 합성 시장 데이터 생성기.
#[derive(Debug, Clone, Default)]
pub struct MarketDataGenerator;

impl MarketDataGenerator {
    /// 새 생성기를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// 실시간 시세를 합성합니다.
    ///
    /// 가격은 기준가 ±1% 안에서, 거래량은 기준 거래량 ±15% 안에서
    /// 움직입니다.
    pub fn realtime_quote(&self, symbol: &str) -> MarketQuote {
        let (base, base_volume) = base_for(symbol);
        let mut rng = rand::thread_rng();

        let change = (rng.gen::<f64>() - 0.5) * QUOTE_VOLATILITY * base;
        let price = base + change;
        let change_percent = change / base * 100.0;
        let volume = (base_volume as f64 * (1.0 + (rng.gen::<f64>() - 0.5) * 0.3)) as i64;

        MarketQuote {
            symbol: symbol.to_string(),
            price: dec2(price),
            change: dec2(change),
            change_percent: dec2(change_percent),
            volume,
            timestamp: Utc::now(),
        }
    }

    /// 옵션 체인을 합성합니다.
    ///
    /// ATM(기준가를 100 단위로 반올림) 중심으로 `strike_count`개씩
    /// 상하 행사가를 만들고, 각 레그의 프리미엄을
    /// 내재가치 + 시간가치 + 노이즈로 계산합니다.
    pub fn option_chain(&self, symbol: &str, expiry: &str, strike_count: i64) -> OptionChain {
        let (base, _) = base_for(symbol);
        let mut rng = rand::thread_rng();

        let atm = (base / 100.0).round() * 100.0;
        let mut rows = Vec::with_capacity((strike_count * 2 + 1) as usize);

        for i in -strike_count..=strike_count {
            let strike = atm + (i * 100) as f64;
            let dist = (strike - base).abs();
            let time_value = (50.0 - dist / 20.0).max(5.0);

            let call_intrinsic = (base - strike).max(0.0);
            let put_intrinsic = (strike - base).max(0.0);

            let call_ltp =
                (call_intrinsic + time_value + (rng.gen::<f64>() - 0.5) * 20.0).max(PREMIUM_FLOOR);
            let put_ltp =
                (put_intrinsic + time_value + (rng.gen::<f64>() - 0.5) * 20.0).max(PREMIUM_FLOOR);

            rows.push(StrikeRow {
                strike: dec2(strike),
                call_ltp: dec2(call_ltp),
                call_oi: rng.gen_range(10_000..60_000),
                call_volume: rng.gen_range(1_000..11_000),
                call_iv: dec2(rng.gen_range(15.0..45.0)),
                put_ltp: dec2(put_ltp),
                put_oi: rng.gen_range(10_000..60_000),
                put_volume: rng.gen_range(1_000..11_000),
                put_iv: dec2(rng.gen_range(15.0..45.0)),
            });
        }

        OptionChain {
            symbol: symbol.to_string(),
            expiry: expiry.to_string(),
            rows,
            timestamp: Utc::now(),
        }
    }

    /// 옵션 체인에서 Put-Call Ratio를 계산합니다.
    ///
    /// 콜 미결제약정 합계가 0이면 비율이 정의되지 않으므로 (`None`)
    /// 무한대 비율로 간주하여 약세로 분류합니다.
    pub fn put_call_ratio(&self, chain: &OptionChain) -> PcrSnapshot {
        let total_call_oi = chain.total_call_oi();
        let total_put_oi = chain.total_put_oi();

        let ratio = if total_call_oi == 0 {
            None
        } else {
            Some((Decimal::from(total_put_oi) / Decimal::from(total_call_oi)).round_dp(4))
        };

        PcrSnapshot {
            ratio,
            total_call_oi,
            total_put_oi,
            sentiment: Sentiment::from_ratio(ratio),
            timestamp: Utc::now(),
        }
    }

    /// 과거 데이터 시리즈를 합성합니다.
    ///
    /// 기준가에서 출발하는 누적 랜덤 워크로 종가를 만들고,
    /// 시가/고가/저가는 종가의 고정 배율로 둡니다.
    pub fn historical_series(&self, symbol: &str, period: HistoryPeriod) -> HistoricalSeries {
        let (base, _) = base_for(symbol);
        let mut rng = rand::thread_rng();

        let (count, interval) = period.points();
        let step = match interval {
            HistoryInterval::Hourly => Duration::hours(1),
            HistoryInterval::Daily => Duration::days(1),
        };

        let now = Utc::now();
        let mut close = base;
        let mut labels = Vec::with_capacity(count);
        let mut candles = Vec::with_capacity(count);

        for i in 0..count {
            close *= 1.0 + (rng.gen::<f64>() - 0.5) * QUOTE_VOLATILITY;
            let timestamp = now - step * (count - 1 - i) as i32;

            labels.push(timestamp.to_rfc3339());
            candles.push(Candle {
                timestamp,
                open: dec2(close * 0.999),
                high: dec2(close * 1.002),
                low: dec2(close * 0.998),
                close: dec2(close),
                volume: rng.gen_range(100_000..1_100_000),
            });
        }

        HistoricalSeries {
            symbol: symbol.to_string(),
            period,
            labels,
            candles,
        }
    }

    /// 데모 포트폴리오.
    ///
    /// 업스트림 포트폴리오 조회가 불가능할 때 사용합니다.
    pub fn portfolio(&self) -> PortfolioSlice {
        let holding = |symbol: &str, quantity, avg_price, ltp| Holding {
            symbol: symbol.to_string(),
            quantity,
            avg_price,
            ltp,
        };

        PortfolioSlice {
            holdings: vec![
                holding("RELIANCE", 50, dec!(2485.50), dec!(2542.30)),
                holding("TCS", 30, dec!(3650.00), dec!(3720.15)),
                holding("HDFCBANK", 65, dec!(1520.30), dec!(1485.75)),
                holding("INFY", 55, dec!(1680.20), dec!(1724.80)),
                holding("ICICIBANK", 80, dec!(980.50), dec!(1025.30)),
            ],
            positions: vec![],
        }
    }
}
