//! Convenience result type alias for WsHub.

use crate::error::AppError;

/// A specialized `Result` type for WsHub operations.
pub type AppResult<T> = Result<T, AppError>;
