//! 옵션 체인 API 라우트.
//!
//! # 엔드포인트
//!
//! - `GET /api/optionchain/{symbol}?expiry=YYYY-MM-DD` - 옵션 체인 조회

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use dash_broker::next_expiry;
use dash_core::OptionChain;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::cache::DataCaches;
use crate::error::ApiResult;
use crate::state::AppState;

/// 옵션 체인 조회 쿼리.
#[derive(Debug, Deserialize)]
pub struct ChainQuery {
    /// 만기일 (생략 시 다음 목요일)
    pub expiry: Option<String>,
}

/// GET /api/optionchain/{symbol} - 옵션 체인 조회.
///
/// 같은 심볼+만기의 캐시 항목이 있으면 재사용합니다.
async fn get_option_chain(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<ChainQuery>,
) -> ApiResult<Json<OptionChain>> {
    let symbol = symbol.to_uppercase();
    let expiry = query.expiry.unwrap_or_else(next_expiry);
    debug!(symbol = %symbol, expiry = %expiry, "Option chain requested");

    let key = DataCaches::chain_key(&symbol, &expiry);
    if let Some(chain) = state.caches.option_chain.get(&key).await {
        return Ok(Json(chain));
    }

    let chain = state.broker.option_chain(&symbol, &expiry).await;
    state.caches.option_chain.put(key, chain.clone()).await;

    Ok(Json(chain))
}

/// 옵션 체인 라우터 생성.
pub fn optionchain_router() -> Router<Arc<AppState>> {
    Router::new().route("/{symbol}", get(get_option_chain))
}
