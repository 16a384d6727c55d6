//! 포트폴리오 API 라우트 (세션 보호).
//!
//! # 엔드포인트
//!
//! - `GET /api/portfolio` - 보유 종목, 포지션, 요약 조회

use axum::{extract::State, routing::get, Extension, Json, Router};
use dash_core::{Holding, PortfolioSummary, Position};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiResult;
use crate::session::SessionEntry;
use crate::state::AppState;

/// 포트폴리오 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct PortfolioResponse {
    /// 보유 종목
    pub holdings: Vec<Holding>,
    /// 미결제 포지션
    pub positions: Vec<Position>,
    /// 요약
    pub summary: PortfolioSummary,
}

/// GET /api/portfolio - 포트폴리오 조회.
///
/// 업스트림 조회에 실패하면 데모 포트폴리오가 반환됩니다.
async fn get_portfolio(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionEntry>,
) -> ApiResult<Json<PortfolioResponse>> {
    debug!(client_id = %session.client_id, "Portfolio requested");

    let slice = state.broker.portfolio().await;
    let summary = PortfolioSummary::from_holdings(&slice.holdings);

    Ok(Json(PortfolioResponse {
        holdings: slice.holdings,
        positions: slice.positions,
        summary,
    }))
}

/// 포트폴리오 라우터 생성.
///
/// 세션 미들웨어는 라우터 조립 시 적용됩니다.
pub fn portfolio_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_portfolio))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::require_session;
    use crate::state::create_test_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
    };
    use dash_core::SessionTokens;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    fn protected_app(state: Arc<AppState>) -> Router {
        Router::new()
            .nest(
                "/api/portfolio",
                portfolio_router().layer(middleware::from_fn_with_state(
                    state.clone(),
                    require_session,
                )),
            )
            .with_state(state)
    }

    async fn session_id(state: &AppState) -> String {
        state
            .sessions
            .create(
                SessionTokens {
                    jwt: "jwt".to_string(),
                    refresh: "refresh".to_string(),
                    feed: "feed".to_string(),
                },
                "C123",
                None,
            )
            .await
    }

    #[tokio::test]
    async fn test_portfolio_requires_session() {
        let state = Arc::new(create_test_state());
        let response = protected_app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/portfolio")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_portfolio_returns_demo_holdings_with_summary() {
        let state = Arc::new(create_test_state());
        let id = session_id(&state).await;

        let response = protected_app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/portfolio")
                    .header("X-Session-Id", id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let portfolio: PortfolioResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(portfolio.holdings.len(), 5);
        assert_eq!(portfolio.summary.holdings_count, 5);
        // 당일 변동 추정치는 총 손익의 10%
        assert_eq!(
            portfolio.summary.day_change,
            portfolio.summary.total_pnl * dec!(0.1)
        );
    }
}
