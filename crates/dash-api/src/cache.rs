//! 만료형 데이터 캐시.
//!
//! 모든 캐시 공간은 키별 last-write-wins로 동작하며, 항목마다 기록
//! 시각을 남겨 TTL(기본 24시간) 기반 정리를 지원합니다. 세션
//! 저장소와는 완전히 독립적입니다.

use chrono::{DateTime, Duration, Utc};
use dash_core::{HistoricalSeries, HistoryPeriod, MarketQuote, OptionChain, PcrSnapshot, Sentiment};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// 캐시 항목.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    written_at: DateTime<Utc>,
}

/// TTL 기반으로 정리되는 제네릭 캐시.
pub struct ExpiringCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> ExpiringCache<T> {
    /// 빈 캐시를 생성합니다.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 값을 저장합니다. 같은 키의 기존 값은 덮어씁니다.
    pub async fn put(&self, key: impl Into<String>, value: T) {
        let entry = CacheEntry {
            value,
            written_at: Utc::now(),
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    /// 값을 조회합니다. TTL이 지나지 않았어도 정리 전이라면 반환됩니다.
    pub async fn get(&self, key: &str) -> Option<T> {
        self.entries.read().await.get(key).map(|e| e.value.clone())
    }

    /// TTL이 지난 항목을 제거하고 제거된 수를 반환합니다.
    pub async fn sweep(&self, ttl: Duration) -> usize {
        self.sweep_at(Utc::now(), ttl).await
    }

    /// 주어진 시각 기준으로 정리합니다.
    pub async fn sweep_at(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| now - e.written_at <= ttl);
        before - entries.len()
    }

    /// 항목 수.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// 비어있는지 확인.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<T: Clone> Default for ExpiringCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 도메인별 캐시 공간 묶음.
#[derive(Default)]
pub struct DataCaches {
    /// 심볼별 최신 시세
    pub market: ExpiringCache<MarketQuote>,
    /// 옵션 체인 (키: `SYMBOL_EXPIRY`)
    pub option_chain: ExpiringCache<OptionChain>,
    /// 심볼별 PCR 스냅샷
    pub pcr: ExpiringCache<PcrSnapshot>,
    /// 심볼별 시장 심리
    pub sentiment: ExpiringCache<Sentiment>,
    /// 과거 데이터 (키: `SYMBOL:PERIOD`)
    pub historical: ExpiringCache<HistoricalSeries>,
}

impl DataCaches {
    /// 새 캐시 묶음을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 옵션 체인 캐시 키.
    pub fn chain_key(symbol: &str, expiry: &str) -> String {
        format!("{}_{}", symbol, expiry)
    }

    /// 과거 데이터 캐시 키.
    pub fn history_key(symbol: &str, period: HistoryPeriod) -> String {
        format!("{}:{}", symbol, period.as_str())
    }

    /// 모든 캐시 공간을 정리하고 제거된 총 항목 수를 반환합니다.
    pub async fn sweep_all(&self, ttl: Duration) -> usize {
        self.sweep_all_at(Utc::now(), ttl).await
    }

    /// 주어진 시각 기준으로 모든 공간을 정리합니다.
    pub async fn sweep_all_at(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        self.market.sweep_at(now, ttl).await
            + self.option_chain.sweep_at(now, ttl).await
            + self.pcr.sweep_at(now, ttl).await
            + self.sentiment.sweep_at(now, ttl).await
            + self.historical.sweep_at(now, ttl).await
    }
}
