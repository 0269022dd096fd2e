//! Per-connection writer task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::handle::ConnectionId;
use super::pool::ConnectionPool;
use crate::metrics::{HubMetrics, messages};
use crate::transport::{Frame, TransportError, TransportWriter};

/// Shared state the writer task needs.
#[derive(Debug, Clone)]
pub(crate) struct WriterContext {
    pub pool: Arc<ConnectionPool>,
    pub metrics: Arc<HubMetrics>,
    pub write_wait: Duration,
}

/// Drain the outbound queue into the transport until cancelled, the queue
/// closes, or a write fails. Closes the transport exactly once on the way out
/// and returns the close result.
pub(crate) async fn run_writer<W: TransportWriter>(
    mut writer: W,
    mut queue: mpsc::Receiver<Frame>,
    client_id: String,
    conn_id: ConnectionId,
    cancel: CancellationToken,
    ctx: WriterContext,
) -> Result<(), TransportError> {
    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = queue.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let is_message = matches!(frame, Frame::Message(_));
        let written = match time::timeout(ctx.write_wait, writer.write_frame(frame)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        };

        match written {
            Ok(()) if is_message => messages::record_sent(&ctx.metrics),
            Ok(()) => {}
            Err(e) => {
                tracing::warn!("Failed to write to client '{}': {}", client_id, e);
                messages::record_write_failure(&ctx.metrics);
                ctx.pool.evict(&client_id, conn_id);
                break;
            }
        }
    }

    cancel.cancel();
    let closed = match time::timeout(ctx.write_wait, writer.close()).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout),
    };
    if let Err(e) = &closed {
        tracing::debug!("Closing transport for client '{}' failed: {}", client_id, e);
    }
    tracing::debug!("Writer for connection {} stopped", conn_id);
    closed
}
