//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use wshub_core::config::AppConfig;
use wshub_realtime::Hub;

use crate::reporter::{ErrorReporter, JsonErrorReporter};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Connection hub
    pub hub: Hub,
    /// Response builder for refused upgrades
    pub reporter: Arc<dyn ErrorReporter>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// State with the default JSON error reporter.
    pub fn new(config: AppConfig, hub: Hub) -> Self {
        Self::with_reporter(config, hub, Arc::new(JsonErrorReporter))
    }

    /// State with a custom error reporter.
    pub fn with_reporter(config: AppConfig, hub: Hub, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            config: Arc::new(config),
            hub,
            reporter,
            started_at: Instant::now(),
        }
    }
}
