//! Put-Call Ratio API 라우트.
//!
//! # 엔드포인트
//!
//! - `GET /api/pcr/{symbol}` - 심볼의 PCR 스냅샷 조회

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use dash_broker::next_expiry;
use dash_core::PcrSnapshot;
use std::sync::Arc;
use tracing::debug;

use crate::cache::DataCaches;
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/pcr/{symbol} - PCR 스냅샷 조회.
///
/// 옵션 체인은 캐시를 재사용하고, 계산 결과는 PCR/심리 캐시에
/// 기록됩니다.
async fn get_pcr(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<PcrSnapshot>> {
    let symbol = symbol.to_uppercase();
    debug!(symbol = %symbol, "PCR requested");

    let expiry = next_expiry();
    let key = DataCaches::chain_key(&symbol, &expiry);
    let chain = match state.caches.option_chain.get(&key).await {
        Some(chain) => chain,
        None => {
            let chain = state.broker.option_chain(&symbol, &expiry).await;
            state.caches.option_chain.put(key, chain.clone()).await;
            chain
        }
    };

    let snapshot = state.broker.put_call_ratio(&chain);
    state.caches.pcr.put(symbol.clone(), snapshot.clone()).await;
    state
        .caches
        .sentiment
        .put(symbol, snapshot.sentiment.clone())
        .await;

    Ok(Json(snapshot))
}

/// PCR 라우터 생성.
pub fn pcr_router() -> Router<Arc<AppState>> {
    Router::new().route("/{symbol}", get(get_pcr))
}
