//! End-to-end tests: a real axum server with tokio-tungstenite clients.

mod helpers;
mod ws_test;
