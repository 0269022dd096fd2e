//! Connection management: handles, the pool, and per-connection tasks.

pub mod handle;
pub mod heartbeat;
pub mod pool;
pub(crate) mod reader;
pub(crate) mod writer;

pub use handle::{ConnectionHandle, ConnectionId, ConnectionInfo};
pub use heartbeat::HeartbeatConfig;
pub use pool::{ConnectionPool, SlotGuard};
