//! Error reporting for refused WebSocket upgrades.

use std::fmt;

use axum::Json;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use wshub_core::AppError;

use crate::error::ApiErrorResponse;

/// Turns a refused upgrade into the response sent to the client.
///
/// Injected into [`crate::AppState`] so embedders can control the body
/// format without touching the upgrade handler.
pub trait ErrorReporter: Send + Sync + fmt::Debug + 'static {
    fn report(&self, uri: &Uri, status: StatusCode, error: &AppError) -> Response;
}

/// Default reporter: logs the refusal and answers with an
/// [`ApiErrorResponse`] JSON body.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonErrorReporter;

impl ErrorReporter for JsonErrorReporter {
    fn report(&self, uri: &Uri, status: StatusCode, error: &AppError) -> Response {
        tracing::warn!(
            path = %uri.path(),
            status = status.as_u16(),
            error = %error,
            "Refused WebSocket connection"
        );
        let body = ApiErrorResponse::new(status, error, Some(uri.path().to_string()));
        (status, Json(body)).into_response()
    }
}
