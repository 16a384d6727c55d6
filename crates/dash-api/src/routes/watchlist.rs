//! 관심목록 API 라우트 (세션 보호).
//!
//! # 엔드포인트
//!
//! - `GET /api/watchlist` - 내 목록 전체 조회
//! - `POST /api/watchlist` - 새 목록 생성
//! - `GET /api/watchlist/{id}` - 목록 상세 조회
//! - `PUT /api/watchlist/{id}` - 이름 변경 / 항목 교체
//! - `DELETE /api/watchlist/{id}` - 목록 삭제
//! - `POST /api/watchlist/{id}/items` - 항목 추가
//! - `DELETE /api/watchlist/{id}/items/{token}` - 항목 삭제

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{api_error, ApiErrorResponse, ApiResult};
use crate::session::SessionEntry;
use crate::state::AppState;
use crate::store::{Watchlist, WatchlistItem};

/// 목록 조회 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct WatchlistListResponse {
    /// 목록
    pub watchlists: Vec<Watchlist>,
    /// 총 개수
    pub total: usize,
}

/// 목록 생성 요청.
#[derive(Debug, Deserialize)]
pub struct CreateWatchlistRequest {
    /// 목록 이름
    pub name: String,
    /// 초기 항목 (선택적)
    #[serde(default)]
    pub items: Vec<WatchlistItem>,
}

/// 목록 수정 요청. 두 필드 모두 선택적입니다.
#[derive(Debug, Deserialize)]
pub struct UpdateWatchlistRequest {
    /// 새 이름
    pub name: Option<String>,
    /// 항목 전체 교체
    pub items: Option<Vec<WatchlistItem>>,
}

/// 항목 추가 요청.
#[derive(Debug, Deserialize)]
pub struct AddItemsRequest {
    /// 추가할 항목
    pub items: Vec<WatchlistItem>,
}

/// 성공 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

/// GET /api/watchlist - 내 목록 전체 조회.
async fn list_watchlists(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionEntry>,
) -> ApiResult<Json<WatchlistListResponse>> {
    debug!(client_id = %session.client_id, "Watchlists requested");

    let watchlists = state.watchlists.list(&session.client_id).await;
    let total = watchlists.len();

    Ok(Json(WatchlistListResponse { watchlists, total }))
}

/// POST /api/watchlist - 새 목록 생성.
async fn create_watchlist(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionEntry>,
    Json(request): Json<CreateWatchlistRequest>,
) -> ApiResult<(StatusCode, Json<Watchlist>)> {
    if request.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiErrorResponse::new(
                "INVALID_INPUT",
                "name이 비어 있습니다",
            )),
        ));
    }

    info!(client_id = %session.client_id, name = %request.name, "Creating watchlist");

    let watchlist = state
        .watchlists
        .create(&session.client_id, request.name.trim(), request.items)
        .await;

    Ok((StatusCode::CREATED, Json(watchlist)))
}

/// GET /api/watchlist/{id} - 목록 상세 조회.
async fn get_watchlist(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionEntry>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Watchlist>> {
    let watchlist = state
        .watchlists
        .get(&session.client_id, id)
        .await
        .map_err(api_error)?;

    Ok(Json(watchlist))
}

/// PUT /api/watchlist/{id} - 이름 변경 / 항목 교체.
async fn update_watchlist(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionEntry>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateWatchlistRequest>,
) -> ApiResult<Json<Watchlist>> {
    let mut watchlist = state
        .watchlists
        .get(&session.client_id, id)
        .await
        .map_err(api_error)?;

    if let Some(name) = request.name {
        watchlist = state
            .watchlists
            .rename(&session.client_id, id, name)
            .await
            .map_err(api_error)?;
    }

    if let Some(items) = request.items {
        watchlist = state
            .watchlists
            .replace_items(&session.client_id, id, items)
            .await
            .map_err(api_error)?;
    }

    Ok(Json(watchlist))
}

/// DELETE /api/watchlist/{id} - 목록 삭제.
async fn delete_watchlist(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionEntry>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    info!(client_id = %session.client_id, id = %id, "Deleting watchlist");

    state
        .watchlists
        .delete(&session.client_id, id)
        .await
        .map_err(api_error)?;

    Ok(Json(SuccessResponse {
        success: true,
        message: "목록이 삭제되었습니다".to_string(),
    }))
}

/// POST /api/watchlist/{id}/items - 항목 추가.
async fn add_items(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionEntry>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddItemsRequest>,
) -> ApiResult<Json<Watchlist>> {
    let watchlist = state
        .watchlists
        .add_items(&session.client_id, id, request.items)
        .await
        .map_err(api_error)?;

    Ok(Json(watchlist))
}

/// DELETE /api/watchlist/{id}/items/{token} - 항목 삭제.
async fn remove_item(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionEntry>,
    Path((id, token)): Path<(Uuid, String)>,
) -> ApiResult<Json<Watchlist>> {
    let watchlist = state
        .watchlists
        .remove_item(&session.client_id, id, &token)
        .await
        .map_err(api_error)?;

    Ok(Json(watchlist))
}

/// 관심목록 라우터 생성.
///
/// 세션 미들웨어는 라우터 조립 시 적용됩니다.
pub fn watchlist_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_watchlists).post(create_watchlist))
        .route(
            "/{id}",
            get(get_watchlist)
                .put(update_watchlist)
                .delete(delete_watchlist),
        )
        .route("/{id}/items", post(add_items))
        .route("/{id}/items/{token}", delete(remove_item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::require_session;
    use crate::state::create_test_state;
    use axum::{body::Body, http::Request, middleware};
    use dash_core::SessionTokens;
    use tower::ServiceExt;

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .nest(
                "/api/watchlist",
                watchlist_router().layer(middleware::from_fn_with_state(
                    state.clone(),
                    require_session,
                )),
            )
            .with_state(state)
    }

    async fn session_for(state: &AppState, client_id: &str) -> String {
        state
            .sessions
            .create(
                SessionTokens {
                    jwt: "jwt".to_string(),
                    refresh: "refresh".to_string(),
                    feed: "feed".to_string(),
                },
                client_id,
                None,
            )
            .await
    }

    #[tokio::test]
    async fn test_watchlist_requires_session() {
        let state = Arc::new(create_test_state());
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/watchlist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let state = Arc::new(create_test_state());
        let id = session_for(&state, "C1").await;
        let app = app(state);

        let body = serde_json::json!({"name": "Indices"});
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/watchlist")
                    .header("X-Session-Id", &id)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/watchlist")
                    .header("X-Session-Id", &id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let list: WatchlistListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.watchlists[0].name, "Indices");
    }

    #[tokio::test]
    async fn test_other_clients_list_is_invisible() {
        let state = Arc::new(create_test_state());
        state.watchlists.create("C1", "Mine", vec![]).await;
        let other = session_for(&state, "C2").await;

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/watchlist")
                    .header("X-Session-Id", other)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let list: WatchlistListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(list.total, 0);
    }

    #[tokio::test]
    async fn test_get_unknown_watchlist_is_not_found() {
        let state = Arc::new(create_test_state());
        let id = session_for(&state, "C1").await;

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/api/watchlist/{}", Uuid::new_v4()))
                    .header("X-Session-Id", id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let state = Arc::new(create_test_state());
        let id = session_for(&state, "C1").await;

        let body = serde_json::json!({"name": "  "});
        let response = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/watchlist")
                    .header("X-Session-Id", id)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
