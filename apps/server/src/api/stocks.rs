use std::sync::Arc;

use crate::{auth::RequireAdmin, error::ApiResult, main_lib::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use quotedesk_core::{CacheStatus, EnrichedStock, NewStock, StockRecord};
use quotedesk_market_data::{HistoricalPoint, DEFAULT_HISTORY_DAYS};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ListResponse<T> {
    success: bool,
    count: usize,
    data: Vec<T>,
}

impl<T> ListResponse<T> {
    fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

#[derive(Deserialize)]
struct HistoryQuery {
    days: Option<u32>,
}

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: &'static str,
}

async fn list_stocks(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ListResponse<EnrichedStock>>> {
    let stocks = state.stock_service.list_stocks().await?;
    Ok(Json(ListResponse::new(stocks)))
}

async fn get_stock(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<EnrichedStock>> {
    let stock = state.stock_service.get_stock(&symbol).await?;
    Ok(Json(stock))
}

async fn get_history(
    Path(symbol): Path<String>,
    Query(q): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ListResponse<HistoricalPoint>>> {
    let days = q.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    let points = state.stock_service.get_history(&symbol, days).await?;
    Ok(Json(ListResponse::new(points)))
}

async fn create_stock(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Json(new_stock): Json<NewStock>,
) -> ApiResult<(StatusCode, Json<StockRecord>)> {
    let created = state.stock_service.create_stock(new_stock).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn cache_status(State(state): State<Arc<AppState>>) -> Json<CacheStatus> {
    Json(state.stock_service.cache_status())
}

async fn clear_cache(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Json<MessageResponse> {
    state.stock_service.clear_cache();
    tracing::info!("Quote cache cleared by admin request");
    Json(MessageResponse {
        success: true,
        message: "Cache cleared",
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stocks", get(list_stocks).post(create_stock))
        .route("/stocks/cache/status", get(cache_status))
        .route("/stocks/cache/clear", post(clear_cache))
        .route("/stocks/{symbol}", get(get_stock))
        .route("/stocks/{symbol}/history", get(get_history))
}
