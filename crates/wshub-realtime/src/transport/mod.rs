//! Transport seam between the hub and an established bidirectional stream.
//!
//! The hub never talks to a socket directly. Anything that can be split into
//! a [`TransportWriter`] and a [`TransportReader`] can be registered, which
//! is how the HTTP layer plugs in upgraded WebSockets and how the tests plug
//! in the in-process [`memory`] transport.

pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Close code for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// Close code sent when an endpoint is going away.
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Close frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// Close status code.
    pub code: u16,
    /// Human-readable reason.
    pub reason: String,
}

impl CloseFrame {
    /// A normal-closure frame with an empty reason.
    pub fn normal() -> Self {
        Self {
            code: CLOSE_NORMAL,
            reason: String::new(),
        }
    }

    /// Whether the code denotes a normal or going-away closure.
    pub fn is_clean(&self) -> bool {
        matches!(self.code, CLOSE_NORMAL | CLOSE_GOING_AWAY)
    }
}

/// A single unit exchanged over a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Application payload.
    Message(Bytes),
    /// Liveness probe.
    Ping(Bytes),
    /// Liveness response.
    Pong(Bytes),
    /// Closure notice from the sending side.
    Close(Option<CloseFrame>),
}

/// Transport-level failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The stream has ended or the connection is already closed.
    #[error("connection closed")]
    Closed,

    /// A read or write exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(String),

    /// The peer violated the framing protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A connection task panicked or was aborted.
    #[error("connection task failed: {0}")]
    Task(String),
}

impl TransportError {
    /// End-of-stream, as opposed to a failure worth logging loudly.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Outbound half of a transport.
#[async_trait]
pub trait TransportWriter: Send + 'static {
    /// Write one frame.
    async fn write_frame(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Send a closing handshake where the protocol has one and release the
    /// stream. Called exactly once per registered connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Inbound half of a transport.
#[async_trait]
pub trait TransportReader: Send + 'static {
    /// Read the next frame. Returns [`TransportError::Closed`] once the
    /// stream has ended.
    async fn read_frame(&mut self) -> Result<Frame, TransportError>;
}

/// An established bidirectional stream that can be registered with the hub.
pub trait Transport: Send + 'static {
    /// Outbound half.
    type Writer: TransportWriter;
    /// Inbound half.
    type Reader: TransportReader;

    /// Split into independently owned halves.
    fn split(self) -> (Self::Writer, Self::Reader);
}
