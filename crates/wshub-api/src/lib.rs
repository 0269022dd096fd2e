//! # wshub-api
//!
//! HTTP layer for WsHub built on Axum.
//!
//! Provides the WebSocket upgrade endpoint that feeds the connection hub,
//! the injectable error reporter for refused upgrades, and health and
//! connection introspection routes.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod reporter;
pub mod router;
pub mod state;
pub mod transport;

pub use app::{build_app, serve};
pub use error::{ApiError, ApiErrorResponse};
pub use reporter::{ErrorReporter, JsonErrorReporter};
pub use state::AppState;
pub use transport::AxumTransport;
