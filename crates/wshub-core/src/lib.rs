//! # wshub-core
//!
//! Core crate for WsHub. Contains configuration schemas and the unified
//! error system shared by the hub, the HTTP surface and the server binary.
//!
//! This crate has **no** internal dependencies on other WsHub crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
