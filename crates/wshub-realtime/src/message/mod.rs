//! Message types, inbound handlers and outbound dispatch.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::Dispatcher;
pub use handler::{HandlerSet, MessageHandler};
pub use types::{BroadcastMessage, ClientMessage};
