//! Individual connection handle.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

use crate::transport::{Frame, TransportError};

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// A handle to a single registered connection.
///
/// Holds the queue feeding the connection's writer task and the token that
/// stops both of its tasks. Every frame destined for the client goes through
/// the queue, so the writer task is the only code that touches the
/// transport's outbound half.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID, distinguishes successive connections that
    /// reuse a client id
    pub id: ConnectionId,
    /// Client id this connection is registered under
    pub client_id: String,
    /// When the connection was registered
    pub connected_at: DateTime<Utc>,
    outbound: mpsc::Sender<Frame>,
    cancel: CancellationToken,
    last_activity: tokio::sync::RwLock<DateTime<Utc>>,
    writer: Mutex<Option<JoinHandle<Result<(), TransportError>>>>,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(
        client_id: impl Into<String>,
        outbound: mpsc::Sender<Frame>,
        cancel: CancellationToken,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id: client_id.into(),
            connected_at: now,
            outbound,
            cancel,
            last_activity: tokio::sync::RwLock::new(now),
            writer: Mutex::new(None),
        }
    }

    /// Queue a frame for the writer, waiting at most `wait` for room.
    pub async fn enqueue(&self, frame: Frame, wait: Duration) -> Result<(), TransportError> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send_timeout(frame, wait)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => TransportError::Timeout,
                SendTimeoutError::Closed(_) => TransportError::Closed,
            })
    }

    /// Queue a frame only if there is room right now.
    pub fn try_enqueue(&self, frame: Frame) -> Result<(), TransportError> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Closed);
        }
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Timeout,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    /// Whether the connection's tasks are still running
    #[cfg(test)]
    pub(crate) fn is_alive(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Update last activity
    pub async fn touch(&self) {
        *self.last_activity.write().await = Utc::now();
    }

    /// Last time anything was read from the client
    pub async fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.read().await
    }

    /// Serializable summary
    pub async fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            connection_id: self.id,
            client_id: self.client_id.clone(),
            connected_at: self.connected_at,
            last_activity: self.last_activity().await,
        }
    }

    pub(crate) fn attach_writer(&self, task: JoinHandle<Result<(), TransportError>>) {
        *self.writer.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
    }

    /// Signal both connection tasks to stop without waiting for them.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Stop the connection and wait for the writer to close the transport.
    ///
    /// Only the first caller observes the close result; later calls find no
    /// writer to wait on and return `Ok`.
    pub(crate) async fn close(&self) -> Result<(), TransportError> {
        self.cancel.cancel();
        let writer = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match writer {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) => Err(TransportError::Task(e.to_string())),
            },
            None => Ok(()),
        }
    }
}

/// Connection summary exposed to operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub connection_id: ConnectionId,
    /// Client ID
    pub client_id: String,
    /// Registration time
    pub connected_at: DateTime<Utc>,
    /// Last inbound activity
    pub last_activity: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn handle(buffer: usize) -> (ConnectionHandle, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(buffer);
        (ConnectionHandle::new("c1", tx, CancellationToken::new()), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_times_out_when_queue_is_full() {
        let (handle, _rx) = handle(1);
        handle
            .enqueue(Frame::Ping(Bytes::new()), Duration::from_secs(1))
            .await
            .unwrap();

        let err = handle
            .enqueue(Frame::Ping(Bytes::new()), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout);
    }

    #[tokio::test]
    async fn cancelled_handle_refuses_frames() {
        let (handle, _rx) = handle(4);
        handle.cancel();

        assert!(!handle.is_alive());
        assert_eq!(
            handle.try_enqueue(Frame::Pong(Bytes::new())).unwrap_err(),
            TransportError::Closed
        );
    }

    #[tokio::test]
    async fn close_reports_writer_result_once() {
        let (handle, _rx) = handle(4);
        handle.attach_writer(tokio::spawn(async { Err(TransportError::Timeout) }));

        assert_eq!(handle.close().await, Err(TransportError::Timeout));
        assert_eq!(handle.close().await, Ok(()));
    }

    #[tokio::test]
    async fn info_reflects_identity() {
        let (handle, _rx) = handle(4);
        handle.touch().await;
        let info = handle.info().await;
        assert_eq!(info.client_id, "c1");
        assert_eq!(info.connection_id, handle.id);
        assert!(info.last_activity >= info.connected_at);
    }
}
