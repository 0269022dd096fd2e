//! Connection introspection handlers.

use axum::Json;
use axum::extract::{Path, State};

use wshub_realtime::ConnectionInfo;

use crate::dto::response::{ApiResponse, DisconnectResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/connections
pub async fn list_connections(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<ConnectionInfo>>> {
    Json(ApiResponse::ok(state.hub.connections().await))
}

/// DELETE /api/connections/{client_id}
pub async fn disconnect(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<ApiResponse<DisconnectResponse>>, ApiError> {
    state.hub.unregister(&client_id).await?;
    Ok(Json(ApiResponse::ok(DisconnectResponse { client_id })))
}
