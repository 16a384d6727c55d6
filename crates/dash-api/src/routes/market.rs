//! 시세 API 라우트.
//!
//! # 엔드포인트
//!
//! - `GET /api/market/{symbol}` - 단일 심볼 시세
//! - `POST /api/market/batch` - 여러 심볼 시세 일괄 조회

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use dash_core::MarketQuote;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 일괄 조회 요청.
#[derive(Debug, Deserialize)]
pub struct BatchQuoteRequest {
    /// 조회할 심볼 목록
    pub symbols: Vec<String>,
}

/// 일괄 조회 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchQuoteResponse {
    /// 심볼별 시세
    pub data: HashMap<String, MarketQuote>,
}

/// GET /api/market/{symbol} - 단일 심볼 시세.
///
/// 조회 결과는 캐시에도 기록됩니다.
async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<MarketQuote>> {
    let symbol = symbol.to_uppercase();
    debug!(symbol = %symbol, "Quote requested");

    let quote = state.broker.quote(&symbol).await;
    state.caches.market.put(symbol, quote.clone()).await;

    Ok(Json(quote))
}

/// POST /api/market/batch - 여러 심볼 시세 일괄 조회.
async fn batch_quotes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchQuoteRequest>,
) -> ApiResult<Json<BatchQuoteResponse>> {
    if request.symbols.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiErrorResponse::new(
                "INVALID_INPUT",
                "symbols가 비어 있습니다",
            )),
        ));
    }

    let mut data = HashMap::new();
    for symbol in request.symbols {
        let symbol = symbol.to_uppercase();
        let quote = state.broker.quote(&symbol).await;
        state.caches.market.put(symbol.clone(), quote.clone()).await;
        data.insert(symbol, quote);
    }

    Ok(Json(BatchQuoteResponse { data }))
}

/// 시세 라우터 생성.
pub fn market_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/batch", post(batch_quotes))
        .route("/{symbol}", get(get_quote))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_get_quote_returns_symbol_and_caches() {
        let state = Arc::new(create_test_state());
        let app = Router::new()
            .nest("/api/market", market_router())
            .with_state(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/market/nifty")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let quote: MarketQuote = serde_json::from_slice(&body).unwrap();
        assert_eq!(quote.symbol, "NIFTY");

        // 대문자 심볼로 캐시됨
        assert!(state.caches.market.get("NIFTY").await.is_some());
    }

    #[tokio::test]
    async fn test_batch_quotes() {
        let state = Arc::new(create_test_state());
        let app = Router::new()
            .nest("/api/market", market_router())
            .with_state(state);

        let body = serde_json::json!({"symbols": ["NIFTY", "BANKNIFTY"]});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/market/batch")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let batch: BatchQuoteResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(batch.data.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_rejects_empty_symbols() {
        let state = Arc::new(create_test_state());
        let app = Router::new()
            .nest("/api/market", market_router())
            .with_state(state);

        let body = serde_json::json!({"symbols": []});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/market/batch")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
