//! Message metrics helpers.

use std::sync::atomic::Ordering;

use super::HubMetrics;

/// Record a message written to a client
pub fn record_sent(metrics: &HubMetrics) {
    metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
}

/// Record a message received from a client
pub fn record_received(metrics: &HubMetrics) {
    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
}

/// Record a directed message for an unknown client
pub fn record_dropped(metrics: &HubMetrics) {
    metrics.messages_dropped.fetch_add(1, Ordering::Relaxed);
}

/// Record a processed broadcast
pub fn record_broadcast(metrics: &HubMetrics) {
    metrics.broadcasts.fetch_add(1, Ordering::Relaxed);
}

/// Record a frame that could not be queued or written
pub fn record_write_failure(metrics: &HubMetrics) {
    metrics.write_failures.fetch_add(1, Ordering::Relaxed);
}
