//! Connection metrics helpers.

use std::sync::atomic::Ordering;

use super::HubMetrics;

/// Record a new registration
pub fn record_connect(metrics: &HubMetrics) {
    metrics.connections_total.fetch_add(1, Ordering::Relaxed);
    metrics.connections_active.fetch_add(1, Ordering::Relaxed);
}

/// Record a removal from the registry
pub fn record_disconnect(metrics: &HubMetrics) {
    metrics.connections_active.fetch_sub(1, Ordering::Relaxed);
}

/// Record a registration refused for capacity
pub fn record_rejected(metrics: &HubMetrics) {
    metrics.connections_rejected.fetch_add(1, Ordering::Relaxed);
}

/// Record a connection dropped by the heartbeat
pub fn record_heartbeat_eviction(metrics: &HubMetrics) {
    metrics.heartbeat_evictions.fetch_add(1, Ordering::Relaxed);
}
