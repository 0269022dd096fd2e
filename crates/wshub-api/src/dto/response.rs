//! Response DTOs.

use serde::{Deserialize, Serialize};

use wshub_realtime::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` while the hub accepts connections, `"closed"` after shutdown.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
    /// Registered connections.
    pub connections: usize,
    /// Pool capacity.
    pub capacity: usize,
    /// Hub counters.
    pub metrics: MetricsSnapshot,
}

/// Result of a forced disconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectResponse {
    /// Client that was disconnected.
    pub client_id: String,
}
