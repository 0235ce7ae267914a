//! Alpha Scanner - stock scan dashboard backed by Google Sheets
//!
//! Reads scan results that an upstream job writes into a spreadsheet,
//! groups the rows into signal tabs and serves them as a web dashboard.
//!
//! # Architecture
//! - HTTP server (axum) serves the page and a small JSON API
//! - Data loader reads worksheets through the Sheets API, cached with a TTL
//! - Partition rules split each table into tabs (categorical, label, expression)
//! - Presenter formats rows into cards; selection drives the chart widget
//!
//! # Features
//! - Several worksheets (scan variants) behind one page
//! - Missing columns and empty sheets degrade to notices, never to errors
//! - Manual refresh that bypasses the cache

// Clippy configuration for scanner code patterns
#![allow(clippy::doc_markdown)] // Doc style flexibility
#![allow(clippy::unused_async)] // axum handlers are async by signature
#![allow(clippy::map_unwrap_or)] // Explicit fallback preference

mod auth;
mod board;
mod cache;
mod client;
mod config;
mod dashboard;
mod error;
mod expr;
mod loader;
mod presenter;
mod rules;
mod selection;
mod sheets;
mod types;

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use auth::ServiceAccountAuth;
pub use board::ScanBoard;
pub use client::GoogleSheetsClient;
pub use config::{Config, Credentials};
pub use error::{Result, ScanError};
pub use expr::{Comparison, Expr, Predicate};
pub use loader::DataLoader;
pub use presenter::CardLayout;
pub use rules::{BLANK_BUCKET, Bucket, NamedPredicate, PartitionRule};
pub use selection::{ChartWidget, Selection};
pub use sheets::{Records, Spreadsheet, SpreadsheetService, Worksheet};
pub use types::*;

/// Shared state for request handlers
pub struct AppState {
    pub board: ScanBoard,
    pub environment: String,
    pub page_title: String,
}

/// Query for the board endpoint
#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    pub sheet: Option<String>,
    pub symbol: Option<String>,
}

/// Query for the chart endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub symbol: Option<String>,
}

/// Build the HTTP router
pub fn router(state: Arc<AppState>) -> Router {
    // Cross-origin reads only; refresh stays same-origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health))
        // Dashboard UI
        .route("/", get(dashboard_page))
        .route("/dashboard", get(dashboard_page))
        // Board for one worksheet
        .route("/api/board", get(board))
        // Chart URL for a symbol
        .route("/api/chart", get(chart))
        // Configured worksheets
        .route("/api/sheets", get(sheets))
        // Manual refresh
        .route("/api/refresh", post(refresh))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.environment.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn dashboard_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(dashboard::dashboard_html(&state.page_title))
}

/// Always 200: failures are reported as notices inside the board
async fn board(State(state): State<Arc<AppState>>, Query(query): Query<BoardQuery>) -> Json<BoardResponse> {
    let selection = Selection::from_query(query.symbol.as_deref());
    Json(state.board.render(query.sheet.as_deref(), &selection).await)
}

async fn chart(State(state): State<Arc<AppState>>, Query(query): Query<ChartQuery>) -> Response {
    match state.board.chart(query.symbol.as_deref().unwrap_or_default()) {
        Some(chart) => Json(chart).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "symbol is required"
            })),
        )
            .into_response(),
    }
}

async fn sheets(State(state): State<Arc<AppState>>) -> Json<SheetsResponse> {
    Json(state.board.sheets())
}

async fn refresh(State(state): State<Arc<AppState>>) -> Response {
    let result = state.board.refresh();
    if result.throttled {
        return (StatusCode::TOO_MANY_REQUESTS, Json(result)).into_response();
    }
    info!("Manual refresh cleared {} worksheet(s)", result.cleared);
    Json(result).into_response()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::sheets::memory::MemorySheets;

    fn state() -> Arc<AppState> {
        let source = Arc::new(MemorySheets::new("Stock_Scan_Result"));
        source.put(
            "Data_Scan",
            &["name", "signals", "close"],
            vec![vec![
                Cell::Text("AAA".into()),
                Cell::Text("SMC".into()),
                Cell::Number(12.0),
            ]],
        );
        let config = Config::from_lookup(|key| match key {
            "GCP_SERVICE_ACCOUNT_JSON" => Some("{}".to_string()),
            "ENVIRONMENT" => Some("development".to_string()),
            _ => None,
        })
        .unwrap();
        let loader = DataLoader::new(source, &config.spreadsheet_title, Duration::seconds(600));

        Arc::new(AppState {
            board: ScanBoard::new(loader, &config),
            environment: config.environment.clone(),
            page_title: config.page_title.clone(),
        })
    }

    #[tokio::test]
    async fn test_health() {
        let Json(response) = health(State(state())).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.environment, "development");
    }

    #[tokio::test]
    async fn test_board_handler() {
        let query = BoardQuery {
            sheet: None,
            symbol: Some("AAA".into()),
        };
        let Json(response) = board(State(state()), Query(query)).await;

        assert_eq!(response.sheet, "Data_Scan");
        assert_eq!(response.selected.as_deref(), Some("AAA"));
        let smc = response.buckets.iter().find(|b| b.name == "SMC").unwrap();
        assert_eq!(smc.cards[0].price, "12.00");
    }

    #[tokio::test]
    async fn test_chart_handler_requires_symbol() {
        let response = chart(State(state()), Query(ChartQuery::default())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = chart(State(state()), Query(ChartQuery { symbol: Some("AAA".into()) })).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dashboard_uses_page_title() {
        let Html(page) = dashboard_page(State(state())).await;
        assert!(page.contains("<title>Alpha Quant Scanner</title>"));
    }

    #[tokio::test]
    async fn test_refresh_handler_throttles() {
        let state = state();
        let response = refresh(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = refresh(State(state)).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_router_builds() {
        let _router = router(state());
    }
}
