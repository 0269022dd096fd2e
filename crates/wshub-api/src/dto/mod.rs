//! Data transfer objects returned by the HTTP routes.

pub mod response;
