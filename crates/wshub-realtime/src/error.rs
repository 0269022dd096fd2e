//! Errors produced by the connection hub.

use std::fmt;

use thiserror::Error;
use wshub_core::AppError;

use crate::transport::TransportError;

/// A connection that could not be closed cleanly during shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFailure {
    /// Client whose transport failed to close.
    pub client_id: String,
    /// The underlying transport error.
    pub error: TransportError,
}

impl fmt::Display for CloseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.client_id, self.error)
    }
}

/// Hub operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HubError {
    /// Registration refused because the pool is at capacity.
    #[error("pool is full")]
    PoolFull,

    /// No connection is registered under the given client id.
    #[error("client not found")]
    ClientNotFound,

    /// A live connection already owns this client id.
    #[error("client '{0}' is already registered")]
    AlreadyRegistered(String),

    /// The hub has been shut down.
    #[error("hub is closed")]
    Closed,

    /// Closing a single transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// One or more connections failed to close during shutdown.
    #[error("failed to close {} connection(s): {}", .0.len(), join_failures(.0))]
    Shutdown(Vec<CloseFailure>),
}

impl HubError {
    /// HTTP status code that best describes this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PoolFull | Self::Closed => 503,
            Self::ClientNotFound => 404,
            Self::AlreadyRegistered(_) => 409,
            Self::Transport(_) => 502,
            Self::Shutdown(_) => 500,
        }
    }
}

fn join_failures(failures: &[CloseFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<HubError> for AppError {
    fn from(err: HubError) -> Self {
        let message = err.to_string();
        match err {
            HubError::PoolFull | HubError::Closed => AppError::service_unavailable(message),
            HubError::ClientNotFound => AppError::not_found(message),
            HubError::AlreadyRegistered(_) => AppError::conflict(message),
            HubError::Transport(e) => AppError::with_source(
                wshub_core::error::ErrorKind::Transport,
                message,
                e,
            ),
            HubError::Shutdown(_) => AppError::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use wshub_core::error::ErrorKind;

    use super::*;

    #[test]
    fn pool_full_maps_to_service_unavailable() {
        let err = HubError::PoolFull;
        assert_eq!(err.to_string(), "pool is full");
        assert_eq!(err.status_code(), 503);

        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::ServiceUnavailable);
    }

    #[test]
    fn shutdown_lists_every_failure() {
        let err = HubError::Shutdown(vec![
            CloseFailure {
                client_id: "a".into(),
                error: TransportError::Timeout,
            },
            CloseFailure {
                client_id: "b".into(),
                error: TransportError::Io("broken pipe".into()),
            },
        ]);
        let text = err.to_string();
        assert!(text.starts_with("failed to close 2 connection(s)"));
        assert!(text.contains("a: operation timed out"));
        assert!(text.contains("b: i/o error: broken pipe"));
    }

    #[test]
    fn duplicate_registration_is_a_conflict() {
        let app: AppError = HubError::AlreadyRegistered("c1".into()).into();
        assert_eq!(app.kind, ErrorKind::Conflict);
        assert!(app.message.contains("c1"));
    }
}
