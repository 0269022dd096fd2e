//! Connection hub configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Connection hub (WebSocket pool) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Maximum number of simultaneously registered clients.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Interval between heartbeat pings in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Deadline for a single write (message or ping) in seconds.
    #[serde(default = "default_write_wait")]
    pub write_wait_seconds: u64,
    /// Deadline for the next inbound frame in seconds.
    #[serde(default = "default_read_wait")]
    pub read_wait_seconds: u64,
    /// Per-connection outbound queue size.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Capacity of the directed and broadcast intake queues.
    #[serde(default = "default_intake_buffer")]
    pub intake_buffer_size: usize,
    /// Read buffer size used for the WebSocket upgrade.
    #[serde(default = "default_io_buffer")]
    pub read_buffer_size: usize,
    /// Write buffer size used for the WebSocket upgrade.
    #[serde(default = "default_io_buffer")]
    pub write_buffer_size: usize,
    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl HubConfig {
    /// Heartbeat period.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Per-write deadline.
    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_seconds)
    }

    /// Per-read deadline.
    pub fn read_wait(&self) -> Duration {
        Duration::from_secs(self.read_wait_seconds)
    }

    /// Rejects values the hub cannot operate with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.capacity == 0 {
            return Err(AppError::configuration("hub.capacity must be greater than 0"));
        }
        if self.ping_interval_seconds == 0 {
            return Err(AppError::configuration(
                "hub.ping_interval_seconds must be greater than 0",
            ));
        }
        if self.write_wait_seconds == 0 || self.read_wait_seconds == 0 {
            return Err(AppError::configuration(
                "hub.write_wait_seconds and hub.read_wait_seconds must be greater than 0",
            ));
        }
        if self.outbound_buffer_size == 0 || self.intake_buffer_size == 0 {
            return Err(AppError::configuration("hub buffer sizes must be greater than 0"));
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ping_interval_seconds: default_ping_interval(),
            write_wait_seconds: default_write_wait(),
            read_wait_seconds: default_read_wait(),
            outbound_buffer_size: default_outbound_buffer(),
            intake_buffer_size: default_intake_buffer(),
            read_buffer_size: default_io_buffer(),
            write_buffer_size: default_io_buffer(),
            max_message_size: default_max_message_size(),
        }
    }
}

fn default_capacity() -> usize {
    1024
}

fn default_ping_interval() -> u64 {
    30
}

fn default_write_wait() -> u64 {
    60
}

fn default_read_wait() -> u64 {
    60
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_intake_buffer() -> usize {
    1
}

fn default_io_buffer() -> usize {
    1024
}

fn default_max_message_size() -> usize {
    16 * 1024 * 1024
}
