//! Periodic ping to every registered connection.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::pool::ConnectionPool;
use crate::metrics::{HubMetrics, connections};
use crate::transport::Frame;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// How long a ping may wait for room in a connection's queue
    pub write_wait: Duration,
}

/// Run the heartbeat until `cancel` fires.
///
/// Each tick queues a ping on every registered connection. A connection that
/// cannot take the ping within the write deadline is evicted. Pings that are
/// queued but never written are caught by the writer's own deadline.
pub(crate) async fn run_heartbeat(
    pool: Arc<ConnectionPool>,
    metrics: Arc<HubMetrics>,
    config: HeartbeatConfig,
    cancel: CancellationToken,
) {
    tracing::debug!("Heartbeat started, interval {:?}", config.ping_interval);

    let mut interval = time::interval_at(Instant::now() + config.ping_interval, config.ping_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => ping_all(&pool, &metrics, config.write_wait).await,
        }
    }

    tracing::debug!("Heartbeat stopped");
}

async fn ping_all(pool: &ConnectionPool, metrics: &HubMetrics, write_wait: Duration) {
    for handle in pool.all_connections() {
        if let Err(e) = handle.enqueue(Frame::Ping(Bytes::new()), write_wait).await {
            tracing::warn!("Failed to ping client '{}': {}", handle.client_id, e);
            if pool.evict(&handle.client_id, handle.id) {
                connections::record_heartbeat_eviction(metrics);
            }
        }
    }
}
