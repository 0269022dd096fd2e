//! Application builder and server entry point.

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;

use wshub_core::{AppError, AppResult};

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Serves the application on `listener` until `shutdown` resolves.
///
/// Upgraded WebSockets are owned by the hub and are not waited on here;
/// close the hub after this returns.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::internal(format!("Failed to read listener address: {e}")))?;
    tracing::info!("WsHub listening on {}", addr);

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))
}
