//! In-process duplex transport backed by bounded channels.
//!
//! Used by the hub's own tests and by embedders that want to drive the hub
//! without a network. The [`MemoryPeer`] plays the remote client and can
//! inject write failures, stalls and close failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::{CloseFrame, Frame, Transport, TransportError, TransportReader, TransportWriter};

#[derive(Debug, Default)]
struct Shared {
    fail_writes: AtomicBool,
    stall_writes: AtomicBool,
    fail_close: AtomicBool,
    close_calls: AtomicUsize,
}

/// Create a connected transport/peer pair. `buffer` bounds each direction.
pub fn pair(buffer: usize) -> (MemoryTransport, MemoryPeer) {
    let (to_peer, from_hub) = mpsc::channel(buffer);
    let (to_hub, from_peer) = mpsc::channel(buffer);
    let shared = Arc::new(Shared::default());

    let transport = MemoryTransport {
        outbound: to_peer,
        inbound: from_peer,
        shared: Arc::clone(&shared),
    };
    let peer = MemoryPeer {
        outbound: Some(to_hub),
        inbound: from_hub,
        shared,
    };
    (transport, peer)
}

/// Hub side of an in-process connection.
#[derive(Debug)]
pub struct MemoryTransport {
    outbound: mpsc::Sender<Frame>,
    inbound: mpsc::Receiver<Frame>,
    shared: Arc<Shared>,
}

impl Transport for MemoryTransport {
    type Writer = MemoryWriter;
    type Reader = MemoryReader;

    fn split(self) -> (MemoryWriter, MemoryReader) {
        (
            MemoryWriter {
                outbound: Some(self.outbound),
                shared: self.shared,
            },
            MemoryReader {
                inbound: self.inbound,
            },
        )
    }
}

/// Outbound half of a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryWriter {
    outbound: Option<mpsc::Sender<Frame>>,
    shared: Arc<Shared>,
}

#[async_trait]
impl TransportWriter for MemoryWriter {
    async fn write_frame(&mut self, frame: Frame) -> Result<(), TransportError> {
        if self.shared.stall_writes.load(Ordering::Acquire) {
            futures::future::pending::<()>().await;
        }
        if self.shared.fail_writes.load(Ordering::Acquire) {
            return Err(TransportError::Io("induced write failure".into()));
        }
        let Some(outbound) = &self.outbound else {
            return Err(TransportError::Closed);
        };
        outbound
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.shared.close_calls.fetch_add(1, Ordering::AcqRel);
        if let Some(outbound) = self.outbound.take() {
            // Best effort: a full or dropped peer simply misses the notice.
            let _ = outbound.try_send(Frame::Close(Some(CloseFrame::normal())));
        }
        if self.shared.fail_close.load(Ordering::Acquire) {
            return Err(TransportError::Io("induced close failure".into()));
        }
        Ok(())
    }
}

/// Inbound half of a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryReader {
    inbound: mpsc::Receiver<Frame>,
}

#[async_trait]
impl TransportReader for MemoryReader {
    async fn read_frame(&mut self) -> Result<Frame, TransportError> {
        self.inbound.recv().await.ok_or(TransportError::Closed)
    }
}

/// Remote end of an in-process connection.
#[derive(Debug)]
pub struct MemoryPeer {
    outbound: Option<mpsc::Sender<Frame>>,
    inbound: mpsc::Receiver<Frame>,
    shared: Arc<Shared>,
}

impl MemoryPeer {
    /// Send an application message to the hub.
    pub async fn send(&self, payload: impl Into<Bytes>) -> Result<(), TransportError> {
        self.send_frame(Frame::Message(payload.into())).await
    }

    /// Send an arbitrary frame to the hub.
    pub async fn send_frame(&self, frame: Frame) -> Result<(), TransportError> {
        let Some(outbound) = &self.outbound else {
            return Err(TransportError::Closed);
        };
        outbound
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Next frame written by the hub, or `None` once the hub side is gone.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.inbound.recv().await
    }

    /// Next application payload, skipping control frames. `None` once the
    /// hub has closed the connection.
    pub async fn recv_message(&mut self) -> Option<Bytes> {
        loop {
            match self.inbound.recv().await? {
                Frame::Message(payload) => return Some(payload),
                Frame::Close(_) => return None,
                Frame::Ping(_) | Frame::Pong(_) => {}
            }
        }
    }

    /// Send a close frame with `code` and stop sending.
    pub async fn close(&mut self, code: u16) {
        if let Some(outbound) = self.outbound.take() {
            let _ = outbound
                .send(Frame::Close(Some(CloseFrame {
                    code,
                    reason: String::new(),
                })))
                .await;
        }
    }

    /// Stop sending without a close frame, like a dropped TCP stream.
    pub fn disconnect(&mut self) {
        self.outbound = None;
    }

    /// Make every subsequent hub write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::Release);
    }

    /// Make every subsequent hub write hang until its deadline.
    pub fn stall_writes(&self, stall: bool) {
        self.shared.stall_writes.store(stall, Ordering::Release);
    }

    /// Make the hub's close of this transport report an error.
    pub fn fail_close(&self, fail: bool) {
        self.shared.fail_close.store(fail, Ordering::Release);
    }

    /// How many times the hub has closed this transport.
    pub fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_cross_in_both_directions() {
        let (transport, mut peer) = pair(4);
        let (mut writer, mut reader) = transport.split();

        peer.send("hello").await.unwrap();
        assert_eq!(
            reader.read_frame().await.unwrap(),
            Frame::Message(Bytes::from_static(b"hello"))
        );

        writer
            .write_frame(Frame::Message(Bytes::from_static(b"world")))
            .await
            .unwrap();
        assert_eq!(peer.recv_message().await.unwrap(), "world");
    }

    #[tokio::test]
    async fn close_notifies_peer_and_counts() {
        let (transport, mut peer) = pair(4);
        let (mut writer, _reader) = transport.split();

        writer.close().await.unwrap();
        assert_eq!(peer.recv().await, Some(Frame::Close(Some(CloseFrame::normal()))));
        assert_eq!(peer.recv().await, None);
        assert_eq!(peer.close_calls(), 1);

        let err = writer
            .write_frame(Frame::Ping(Bytes::new()))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Closed);
    }

    #[tokio::test]
    async fn disconnect_ends_the_read_stream() {
        let (transport, mut peer) = pair(4);
        let (_writer, mut reader) = transport.split();

        peer.disconnect();
        assert_eq!(reader.read_frame().await.unwrap_err(), TransportError::Closed);
    }

    #[tokio::test]
    async fn induced_failures_surface_as_io_errors() {
        let (transport, peer) = pair(4);
        let (mut writer, _reader) = transport.split();

        peer.fail_writes(true);
        peer.fail_close(true);
        assert!(matches!(
            writer.write_frame(Frame::Ping(Bytes::new())).await,
            Err(TransportError::Io(_))
        ));
        assert!(matches!(writer.close().await, Err(TransportError::Io(_))));
    }
}
