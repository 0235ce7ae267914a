//! Alpha Scanner server entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use alpha_scanner::{AppState, Config, DataLoader, GoogleSheetsClient, ScanBoard, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Loading configuration")?;

    // RUST_LOG wins over LOG_LEVEL
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    config.validate().context("Invalid configuration")?;

    info!(
        "Starting alpha-scanner {} ({})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );
    info!(
        "Spreadsheet '{}', worksheets {:?}, rule '{}', cache {}s",
        config.spreadsheet_title, config.worksheets, config.partition_rule, config.cache_ttl_seconds
    );

    let credentials = config.credentials().context("Loading service-account credentials")?;
    let client = GoogleSheetsClient::new(&credentials, Duration::from_secs(config.http_timeout_seconds))
        .context("Creating Sheets client")?;

    let loader = DataLoader::new(
        Arc::new(client),
        &config.spreadsheet_title,
        chrono::Duration::seconds(config.cache_ttl_seconds),
    );

    let state = Arc::new(AppState {
        board: ScanBoard::new(loader, &config),
        environment: config.environment.clone(),
        page_title: config.page_title.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
