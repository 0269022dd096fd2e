//! WsHub Server: real-time WebSocket connection hub.
//!
//! Main entry point that wires the crates together and starts the server.

use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt};

use wshub_api::AppState;
use wshub_core::config::AppConfig;
use wshub_core::error::AppError;
use wshub_realtime::{ClientMessage, Hub};

#[tokio::main]
async fn main() {
    let env = std::env::var("WSHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!("Loaded configuration (env: {})", env);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting WsHub v{}", env!("CARGO_PKG_VERSION"));

    let hub = Hub::new(config.hub.clone());
    hub.on_message(|message: ClientMessage| {
        tracing::debug!(
            client_id = %message.client_id,
            bytes = message.payload.len(),
            "Message received"
        );
    });

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = AppState::new(config, hub.clone());
    wshub_api::serve(listener, state, shutdown_signal()).await?;

    tracing::info!("HTTP server stopped, closing connection hub");
    match tokio::time::timeout(grace, hub.close()).await {
        Ok(Ok(())) => tracing::info!("Connection hub closed"),
        Ok(Err(e)) => tracing::error!("Connection hub closed with errors: {}", e),
        Err(_) => tracing::warn!("Connection hub did not close within {:?}", grace),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
