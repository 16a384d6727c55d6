//! 종목 검색 API 라우트.
//!
//! # 엔드포인트
//!
//! - `GET /api/search?q=...&exchange=NSE` - 종목 검색

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use dash_core::{ExchangeCode, Instrument};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 검색 쿼리.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// 검색어
    pub q: String,
    /// 거래소 (기본 NSE)
    #[serde(default)]
    pub exchange: Option<String>,
}

/// 검색 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    /// 검색 결과
    pub results: Vec<Instrument>,
    /// 결과 수
    pub count: usize,
}

/// GET /api/search - 종목 검색.
///
/// 업스트림이 없으면 알려진 지수 목록에서만 검색됩니다.
async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    if query.q.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiErrorResponse::new("INVALID_INPUT", "q가 비어 있습니다")),
        ));
    }

    let exchange: ExchangeCode = match query.exchange.as_deref() {
        None => ExchangeCode::Nse,
        Some(raw) => raw.parse().map_err(|e: String| {
            (
                StatusCode::BAD_REQUEST,
                Json(ApiErrorResponse::new("INVALID_EXCHANGE", e)),
            )
        })?,
    };
    debug!(q = %query.q, exchange = %exchange.as_str(), "Search requested");

    let results = state.broker.search(exchange, query.q.trim()).await;
    let count = results.len();

    Ok(Json(SearchResponse { results, count }))
}

/// 검색 라우터 생성.
pub fn search_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(search))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .nest("/api/search", search_router())
            .with_state(Arc::new(create_test_state()))
    }

    #[tokio::test]
    async fn test_search_filters_known_indices() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/search?q=bank")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let result: SearchResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(result.count, 1);
        assert_eq!(result.results[0].symbol, "BANKNIFTY");
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/search?q=%20")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_rejects_unknown_exchange() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/search?q=nifty&exchange=XYZ")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
