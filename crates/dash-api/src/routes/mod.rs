//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/auth` - 로그인/로그아웃
//! - `/api/market` - 시세 (단일/일괄)
//! - `/api/optionchain` - 옵션 체인
//! - `/api/pcr` - Put-Call Ratio
//! - `/api/portfolio` - 포트폴리오 (세션 보호)
//! - `/api/history` - 과거 데이터
//! - `/api/search` - 종목 검색
//! - `/api/watchlist` - 관심목록 (세션 보호)

pub mod auth;
pub mod health;
pub mod history;
pub mod market;
pub mod optionchain;
pub mod pcr;
pub mod portfolio;
pub mod search;
pub mod watchlist;

use axum::{middleware, Router};
use std::sync::Arc;

use crate::middleware::require_session;
use crate::state::AppState;

pub use auth::{auth_router, LoginRequest, LoginResponse};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use history::history_router;
pub use market::{market_router, BatchQuoteRequest, BatchQuoteResponse};
pub use optionchain::optionchain_router;
pub use pcr::pcr_router;
pub use portfolio::{portfolio_router, PortfolioResponse};
pub use search::{search_router, SearchResponse};
pub use watchlist::{watchlist_router, WatchlistListResponse};

/// 전체 API 라우터 생성.
///
/// 포트폴리오와 관심목록은 세션 미들웨어 뒤에 둡니다.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .nest("/portfolio", portfolio_router())
        .nest("/watchlist", watchlist_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let api = Router::new()
        .nest("/auth", auth_router())
        .nest("/market", market_router())
        .nest("/optionchain", optionchain_router())
        .nest("/pcr", pcr_router())
        .nest("/history", history_router())
        .nest("/search", search_router())
        .merge(protected);

    Router::new()
        .nest("/health", health_router())
        .nest("/api", api)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_api_router_serves_health_and_market() {
        let state = Arc::new(create_test_state());
        let app = create_api_router(state);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/market/NIFTY")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_reject_without_session() {
        let state = Arc::new(create_test_state());
        let app = create_api_router(state);

        for uri in ["/api/portfolio", "/api/watchlist"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}
