//! Ledger HTTP server binary

use account_ledger::{
    api::{self, AppState},
    config::LogFormat,
    Config, Ledger,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting ledger server"
    );

    let addr = config.http_listen_addr.clone();
    let ledger = Arc::new(Ledger::open(config)?);
    let shutdown = CancellationToken::new();
    let app = api::router(AppState::new(ledger.clone(), shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Ledger listening on: {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    ledger.shutdown().await?;
    tracing::info!(entries = ledger.transactions().len(), "Ledger server stopped");
    Ok(())
}
