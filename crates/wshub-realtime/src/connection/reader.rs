//! Per-connection read loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use super::handle::ConnectionHandle;
use super::pool::ConnectionPool;
use crate::message::handler::HandlerSet;
use crate::message::types::ClientMessage;
use crate::metrics::{HubMetrics, messages};
use crate::transport::{Frame, TransportReader};

/// Shared state the read loop needs.
#[derive(Debug, Clone)]
pub(crate) struct ReaderContext {
    pub pool: Arc<ConnectionPool>,
    pub handlers: Arc<HandlerSet>,
    pub metrics: Arc<HubMetrics>,
    pub read_wait: Duration,
}

/// Evicts the connection however the read loop exits, including a panic in
/// a message handler.
struct EvictOnExit<'a> {
    pool: &'a ConnectionPool,
    handle: &'a ConnectionHandle,
}

impl Drop for EvictOnExit<'_> {
    fn drop(&mut self) {
        self.pool.evict(&self.handle.client_id, self.handle.id);
    }
}

/// Read frames until the peer goes away, the read deadline passes, or the
/// connection is cancelled. Any exit removes the connection from the pool if
/// it is still the registered one.
pub(crate) async fn run_reader<R: TransportReader>(
    mut reader: R,
    handle: Arc<ConnectionHandle>,
    ctx: ReaderContext,
) {
    let _evict = EvictOnExit {
        pool: &ctx.pool,
        handle: &handle,
    };
    let client_id = handle.client_id.as_str();

    loop {
        if !ctx.pool.is_current(client_id, handle.id) {
            tracing::debug!("Connection {} is no longer registered", handle.id);
            break;
        }

        let next = tokio::select! {
            biased;
            () = handle.cancelled() => break,
            next = time::timeout(ctx.read_wait, reader.read_frame()) => next,
        };

        let frame = match next {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) if e.is_clean_close() => {
                tracing::debug!("Client '{}' disconnected", client_id);
                break;
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to receive message from client '{}': {}", client_id, e);
                break;
            }
            Err(_) => {
                tracing::warn!(
                    "Client '{}' sent nothing for {:?}, dropping connection",
                    client_id,
                    ctx.read_wait
                );
                break;
            }
        };

        handle.touch().await;

        match frame {
            Frame::Message(payload) => {
                messages::record_received(&ctx.metrics);
                ctx.handlers
                    .dispatch(&ClientMessage::new(client_id, payload));
            }
            Frame::Ping(data) => {
                tracing::trace!("Ping from client '{}'", client_id);
                if let Err(e) = handle.try_enqueue(Frame::Pong(data)) {
                    tracing::debug!("Dropped pong for client '{}': {}", client_id, e);
                }
            }
            Frame::Pong(_) => {
                tracing::trace!("Pong from client '{}'", client_id);
            }
            Frame::Close(close) => {
                match close {
                    Some(frame) if !frame.is_clean() => tracing::warn!(
                        "Client '{}' closed the connection with code {}: {}",
                        client_id,
                        frame.code,
                        frame.reason
                    ),
                    _ => tracing::debug!("Client '{}' closed the connection", client_id),
                }
                break;
            }
        }
    }
}
