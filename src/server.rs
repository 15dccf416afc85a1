//! HTTP surface: health, metrics, book views and cost quotes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::costs::{CostQuote, OrderRequest};
use crate::error::SimulatorError;
use crate::orderbook::{BookSummary, PriceLevel};
use crate::AppState;

/// Levels returned by `/books/:symbol/levels` when no depth is given
const DEFAULT_LEVEL_DEPTH: usize = 10;

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/books", get(list_books))
        .route("/books/:symbol", get(book_summary))
        .route("/books/:symbol/levels", get(book_levels))
        .route("/books/:symbol/quote", get(quote))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until the listener fails
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.http_addr.clone();
    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Error body `{"error": "..."}` with a status derived from the error kind
#[derive(Debug)]
pub struct ApiError(pub SimulatorError);

impl From<SimulatorError> for ApiError {
    fn from(err: SimulatorError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SimulatorError::UnknownSymbol(_) => StatusCode::NOT_FOUND,
            SimulatorError::InvalidOrder(_) => StatusCode::BAD_REQUEST,
            SimulatorError::InsufficientData(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (self.status(), body).into_response()
    }
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "component": "l2-cost-simulator",
        "symbols": state.books.symbols(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    Ok(state.metrics.encode()?)
}

pub async fn list_books(State(state): State<Arc<AppState>>) -> Json<Vec<BookSummary>> {
    Json(state.books.summaries(state.config.volatility_window).await)
}

pub async fn book_summary(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<BookSummary>, ApiError> {
    let handle = state.books.get(&symbol)?;
    Ok(Json(handle.summary(state.config.volatility_window).await))
}

#[derive(Debug, Default, Deserialize)]
pub struct LevelsParams {
    pub depth: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LevelsResponse {
    pub symbol: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

pub async fn book_levels(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<LevelsParams>,
) -> Result<Json<LevelsResponse>, ApiError> {
    let handle = state.books.get(&symbol)?;
    let (bids, asks) = handle
        .top_levels(params.depth.unwrap_or(DEFAULT_LEVEL_DEPTH))
        .await;

    Ok(Json(LevelsResponse {
        symbol: handle.symbol().to_string(),
        bids,
        asks,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteParams {
    pub quantity_usd: f64,
    /// Fractional volatility; the book's realized volatility when omitted
    pub volatility: Option<f64>,
    /// Lowest configured tier when omitted
    pub fee_tier: Option<String>,
}

pub async fn quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<CostQuote>, ApiError> {
    let volatility = match params.volatility {
        Some(v) => v,
        None => state.default_volatility(&symbol).await?,
    };
    let fee_tier = params
        .fee_tier
        .unwrap_or_else(|| state.default_fee_tier());

    let request = OrderRequest {
        quantity_usd: params.quantity_usd,
        volatility,
        fee_tier,
    };

    Ok(Json(state.quote(&symbol, &request).await?))
}
