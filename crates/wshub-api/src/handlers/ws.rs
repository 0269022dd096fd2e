//! WebSocket upgrade handler.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use wshub_core::AppError;

use crate::state::AppState;
use crate::transport::AxumTransport;

/// Query parameters for the WebSocket endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Client identifier; a random one is assigned when absent.
    pub client_id: Option<String>,
}

/// GET /ws?client_id={id}: WebSocket upgrade
///
/// The pool slot is reserved before upgrading so a full pool or duplicate
/// id is refused with a plain HTTP error instead of an accepted-then-closed
/// socket.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    uri: Uri,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let client_id = query
        .client_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let admission = match state.hub.admit(client_id) {
        Ok(admission) => admission,
        Err(e) => {
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
            return state.reporter.report(&uri, status, &AppError::from(e));
        }
    };

    // Dropping the admission on a rejected upgrade frees its slot.
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let config = state.hub.config();
    ws.read_buffer_size(config.read_buffer_size)
        .write_buffer_size(config.write_buffer_size)
        .max_message_size(config.max_message_size)
        .on_failed_upgrade(|e| tracing::warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| async move {
            let client_id = admission.client_id().to_string();
            if let Err(e) = admission.register(AxumTransport::new(socket)) {
                tracing::warn!(client_id = %client_id, error = %e, "Failed to register WebSocket");
            }
        })
}
