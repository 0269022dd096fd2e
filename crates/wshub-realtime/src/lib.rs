//! # wshub-realtime
//!
//! Connection hub for WsHub. Provides:
//!
//! - A capacity-bounded pool of client connections keyed by client id
//! - A single writer task per connection fed by a bounded queue
//! - Periodic heartbeat pings and read deadlines for liveness
//! - Directed and broadcast delivery through bounded intake queues
//! - Inbound message handlers
//! - Coordinated shutdown
//!
//! The hub is transport-agnostic: anything implementing
//! [`transport::Transport`] can be registered.

pub mod connection;
pub mod error;
pub mod hub;
pub mod lifecycle;
pub mod message;
pub mod metrics;
pub mod transport;

pub use connection::{ConnectionInfo, ConnectionPool};
pub use error::{CloseFailure, HubError};
pub use hub::{Admission, Hub};
pub use message::{ClientMessage, MessageHandler};
pub use metrics::MetricsSnapshot;
pub use transport::{CloseFrame, Frame, Transport, TransportError, TransportReader, TransportWriter};
