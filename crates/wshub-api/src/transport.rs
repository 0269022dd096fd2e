//! [`Transport`] over an upgraded axum WebSocket.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::extract::ws::{self, Message, Utf8Bytes, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use wshub_realtime::transport::{
    CLOSE_NORMAL, CloseFrame, Frame, Transport, TransportError, TransportReader,
    TransportWriter,
};

/// An upgraded WebSocket ready to be registered with the hub.
#[derive(Debug)]
pub struct AxumTransport {
    socket: WebSocket,
}

impl AxumTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

impl Transport for AxumTransport {
    type Writer = WsWriter;
    type Reader = WsReader;

    fn split(self) -> (WsWriter, WsReader) {
        let (sink, stream) = self.socket.split();
        let peer_closed = Arc::new(AtomicBool::new(false));
        (
            WsWriter {
                sink,
                peer_closed: Arc::clone(&peer_closed),
            },
            WsReader {
                stream,
                peer_closed,
            },
        )
    }
}

/// Outbound half of an [`AxumTransport`].
#[derive(Debug)]
pub struct WsWriter {
    sink: SplitSink<WebSocket, Message>,
    peer_closed: Arc<AtomicBool>,
}

#[async_trait]
impl TransportWriter for WsWriter {
    async fn write_frame(&mut self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            // Payloads that are valid UTF-8 go out as text frames.
            Frame::Message(payload) => match std::str::from_utf8(&payload) {
                Ok(text) => Message::Text(Utf8Bytes::from(text)),
                Err(_) => Message::Binary(payload),
            },
            Frame::Ping(data) => Message::Ping(data),
            Frame::Pong(data) => Message::Pong(data),
            Frame::Close(close) => Message::Close(close.map(into_ws_close)),
        };
        self.sink.send(message).await.map_err(io_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let close = ws::CloseFrame {
            code: CLOSE_NORMAL,
            reason: Utf8Bytes::from_static(""),
        };
        let sent = self.sink.send(Message::Close(Some(close))).await;
        settle_close(&self.peer_closed, sent)
    }
}

/// Inbound half of an [`AxumTransport`].
#[derive(Debug)]
pub struct WsReader {
    stream: SplitStream<WebSocket>,
    peer_closed: Arc<AtomicBool>,
}

#[async_trait]
impl TransportReader for WsReader {
    async fn read_frame(&mut self) -> Result<Frame, TransportError> {
        let message = match self.stream.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => return Err(io_error(e)),
            None => {
                self.peer_closed.store(true, Ordering::Release);
                return Err(TransportError::Closed);
            }
        };
        if matches!(message, Message::Close(_)) {
            self.peer_closed.store(true, Ordering::Release);
        }

        Ok(match message {
            Message::Text(text) => Frame::Message(Bytes::copy_from_slice(text.as_bytes())),
            Message::Binary(data) => Frame::Message(data),
            Message::Ping(data) => Frame::Ping(data),
            Message::Pong(data) => Frame::Pong(data),
            Message::Close(close) => Frame::Close(close.map(|frame| CloseFrame {
                code: frame.code,
                reason: frame.reason.to_string(),
            })),
        })
    }
}

/// Once the peer has started the close handshake the socket already answered
/// it, so a refused close frame means the connection is closed, not broken.
fn settle_close(
    peer_closed: &AtomicBool,
    sent: Result<(), axum::Error>,
) -> Result<(), TransportError> {
    match sent {
        Ok(()) => Ok(()),
        Err(_) if peer_closed.load(Ordering::Acquire) => Ok(()),
        Err(e) => Err(io_error(e)),
    }
}

fn into_ws_close(frame: CloseFrame) -> ws::CloseFrame {
    ws::CloseFrame {
        code: frame.code,
        reason: Utf8Bytes::from(frame.reason),
    }
}

fn io_error(err: axum::Error) -> TransportError {
    TransportError::Io(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_error() -> axum::Error {
        axum::Error::new(std::io::Error::other("Sending after closing is not allowed"))
    }

    #[test]
    fn refused_close_after_peer_close_is_clean() {
        let peer_closed = AtomicBool::new(true);
        assert_eq!(settle_close(&peer_closed, Err(send_error())), Ok(()));
    }

    #[test]
    fn refused_close_on_open_socket_is_an_error() {
        let peer_closed = AtomicBool::new(false);
        assert!(matches!(
            settle_close(&peer_closed, Err(send_error())),
            Err(TransportError::Io(_))
        ));
        assert_eq!(settle_close(&peer_closed, Ok(())), Ok(()));
    }
}
