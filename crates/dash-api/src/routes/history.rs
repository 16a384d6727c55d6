//! 과거 데이터 API 라우트.
//!
//! # 엔드포인트
//!
//! - `GET /api/history/{symbol}/{period}` - 기간별 과거 데이터 조회

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use dash_core::{HistoricalSeries, HistoryPeriod};
use std::sync::Arc;
use tracing::debug;

use crate::cache::DataCaches;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// GET /api/history/{symbol}/{period} - 과거 데이터 조회.
///
/// 기간은 `1D`, `1W`, `1M`, `3M`, `1Y` 중 하나입니다. 같은 심볼과
/// 기간의 캐시 항목이 있으면 재사용합니다.
async fn get_history(
    State(state): State<Arc<AppState>>,
    Path((symbol, period)): Path<(String, String)>,
) -> ApiResult<Json<HistoricalSeries>> {
    let symbol = symbol.to_uppercase();
    let period: HistoryPeriod = period.parse().map_err(|e: String| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiErrorResponse::new("INVALID_PERIOD", e)),
        )
    })?;
    debug!(symbol = %symbol, period = %period.as_str(), "History requested");

    let key = DataCaches::history_key(&symbol, period);
    if let Some(series) = state.caches.historical.get(&key).await {
        return Ok(Json(series));
    }

    let series = state.broker.history(&symbol, period).await;
    state.caches.historical.put(key, series.clone()).await;

    Ok(Json(series))
}

/// 과거 데이터 라우터 생성.
pub fn history_router() -> Router<Arc<AppState>> {
    Router::new().route("/{symbol}/{period}", get(get_history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .nest("/api/history", history_router())
            .with_state(state)
    }

    #[tokio::test]
    async fn test_one_day_history_has_24_hourly_points() {
        let state = Arc::new(create_test_state());
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/history/NIFTY/1D")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let series: HistoricalSeries = serde_json::from_slice(&body).unwrap();

        assert_eq!(series.candles.len(), 24);
        assert_eq!(series.labels.len(), 24);
        assert_eq!(series.period, HistoryPeriod::OneDay);
    }

    #[tokio::test]
    async fn test_unknown_period_is_bad_request() {
        let state = Arc::new(create_test_state());
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/history/NIFTY/2Y")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_served_from_cache_on_second_request() {
        let state = Arc::new(create_test_state());
        let app = app(state.clone());

        let request = || {
            Request::builder()
                .uri("/api/history/NIFTY/1W")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        let second = app.oneshot(request()).await.unwrap();

        let first: HistoricalSeries = serde_json::from_slice(
            &axum::body::to_bytes(first.into_body(), usize::MAX).await.unwrap(),
        )
        .unwrap();
        let second: HistoricalSeries = serde_json::from_slice(
            &axum::body::to_bytes(second.into_body(), usize::MAX).await.unwrap(),
        )
        .unwrap();

        // 랜덤 워크 데이터이므로 캐시가 쓰였다면 완전히 같음
        assert_eq!(first.labels, second.labels);
    }
}
