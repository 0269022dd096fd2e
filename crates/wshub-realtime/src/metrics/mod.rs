//! Hub metrics.

pub mod connections;
pub mod messages;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Hub-level metrics counters.
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Connections ever registered
    pub connections_total: AtomicU64,
    /// Connections currently registered
    pub connections_active: AtomicU64,
    /// Registrations refused (pool full)
    pub connections_rejected: AtomicU64,
    /// Application messages received from clients
    pub messages_received: AtomicU64,
    /// Application messages written to clients
    pub messages_sent: AtomicU64,
    /// Directed messages addressed to unknown clients
    pub messages_dropped: AtomicU64,
    /// Broadcast requests processed
    pub broadcasts: AtomicU64,
    /// Frames that could not be queued or written
    pub write_failures: AtomicU64,
    /// Connections removed because a heartbeat could not be queued
    pub heartbeat_evictions: AtomicU64,
}

impl HubMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            heartbeat_evictions: self.heartbeat_evictions.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever registered
    pub connections_total: u64,
    /// Connections currently registered
    pub connections_active: u64,
    /// Registrations refused (pool full)
    pub connections_rejected: u64,
    /// Application messages received from clients
    pub messages_received: u64,
    /// Application messages written to clients
    pub messages_sent: u64,
    /// Directed messages addressed to unknown clients
    pub messages_dropped: u64,
    /// Broadcast requests processed
    pub broadcasts: u64,
    /// Frames that could not be queued or written
    pub write_failures: u64,
    /// Connections removed because a heartbeat could not be queued
    pub heartbeat_evictions: u64,
}
