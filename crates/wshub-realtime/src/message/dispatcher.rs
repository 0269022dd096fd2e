//! Outbound dispatch: intake queues and the workers that drain them.
//!
//! Directed and broadcast requests are accepted on two bounded intake
//! queues. One worker per queue resolves recipients against the pool at
//! delivery time and hands the payload to each connection's writer queue.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use super::types::{BroadcastMessage, ClientMessage};
use crate::connection::handle::ConnectionHandle;
use crate::connection::pool::ConnectionPool;
use crate::error::HubError;
use crate::metrics::{HubMetrics, messages};
use crate::transport::Frame;

/// Producer side of the intake queues.
#[derive(Debug)]
pub struct Dispatcher {
    directed: Mutex<Option<mpsc::Sender<ClientMessage>>>,
    broadcast: Mutex<Option<mpsc::Sender<BroadcastMessage>>>,
}

/// Consumer side of the intake queues, owned by the dispatch workers.
#[derive(Debug)]
pub(crate) struct IntakeQueues {
    pub directed: mpsc::Receiver<ClientMessage>,
    pub broadcast: mpsc::Receiver<BroadcastMessage>,
}

impl Dispatcher {
    pub(crate) fn new(buffer: usize) -> (Self, IntakeQueues) {
        let (directed_tx, directed_rx) = mpsc::channel(buffer);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(buffer);
        (
            Self {
                directed: Mutex::new(Some(directed_tx)),
                broadcast: Mutex::new(Some(broadcast_tx)),
            },
            IntakeQueues {
                directed: directed_rx,
                broadcast: broadcast_rx,
            },
        )
    }

    /// Queue a directed message, waiting for room in the intake queue.
    pub async fn send(&self, message: ClientMessage) -> Result<(), HubError> {
        let sender = self
            .directed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(HubError::Closed)?;
        sender.send(message).await.map_err(|_| HubError::Closed)
    }

    /// Queue a broadcast, waiting for room in the intake queue.
    pub async fn broadcast(&self, message: BroadcastMessage) -> Result<(), HubError> {
        let sender = self
            .broadcast
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(HubError::Closed)?;
        sender.send(message).await.map_err(|_| HubError::Closed)
    }

    /// Stop accepting requests. Queued requests are still drained by the
    /// workers unless they are cancelled first.
    pub(crate) fn close(&self) {
        self.directed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.broadcast
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Shared state for the dispatch workers.
#[derive(Debug, Clone)]
pub(crate) struct DeliveryContext {
    pub pool: Arc<ConnectionPool>,
    pub metrics: Arc<HubMetrics>,
    pub write_wait: Duration,
}

/// Deliver directed messages until the intake queue closes.
pub(crate) async fn run_directed(mut queue: mpsc::Receiver<ClientMessage>, ctx: DeliveryContext) {
    tracing::debug!("Directed message worker started");
    while let Some(message) = queue.recv().await {
        let Some(handle) = ctx.pool.get(&message.client_id) else {
            tracing::debug!("Dropping message for unknown client '{}'", message.client_id);
            messages::record_dropped(&ctx.metrics);
            continue;
        };
        deliver(&ctx, &handle, message.payload).await;
    }
    tracing::debug!("Directed message worker stopped");
}

/// Deliver broadcasts until the intake queue closes.
pub(crate) async fn run_broadcast(
    mut queue: mpsc::Receiver<BroadcastMessage>,
    ctx: DeliveryContext,
) {
    tracing::debug!("Broadcast worker started");
    while let Some(message) = queue.recv().await {
        let recipients = ctx.pool.all_connections();
        messages::record_broadcast(&ctx.metrics);
        tracing::debug!("Broadcasting to {} client(s)", recipients.len());
        for handle in &recipients {
            deliver(&ctx, handle, message.payload.clone()).await;
        }
    }
    tracing::debug!("Broadcast worker stopped");
}

/// Queue one payload on a connection, evicting it if the queue stays full
/// past the write deadline or is already closed.
async fn deliver(ctx: &DeliveryContext, handle: &ConnectionHandle, payload: Bytes) {
    if let Err(e) = handle.enqueue(Frame::Message(payload), ctx.write_wait).await {
        tracing::error!("Failed to send message to client '{}': {}", handle.client_id, e);
        messages::record_write_failure(&ctx.metrics);
        ctx.pool.evict(&handle.client_id, handle.id);
    }
}
