//! Message types flowing through the hub.

use bytes::Bytes;

/// A payload tagged with the client it came from or is addressed to.
///
/// Inbound messages carry the sender's id; directed outbound messages carry
/// the recipient's id. The payload is opaque to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessage {
    /// Sender (inbound) or recipient (outbound)
    pub client_id: String,
    /// Opaque payload
    pub payload: Bytes,
}

impl ClientMessage {
    /// Create a new client message
    pub fn new(client_id: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            client_id: client_id.into(),
            payload: payload.into(),
        }
    }

    /// Payload as UTF-8 text, if it is valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// A payload for every registered client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastMessage {
    /// Opaque payload
    pub payload: Bytes,
}

impl BroadcastMessage {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}
