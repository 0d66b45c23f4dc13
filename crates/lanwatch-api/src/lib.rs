//! HTTP surface for lanwatch scans.
//!
//! Thin axum layer over [`lanwatch_discover::ScanCoordinator`]: handlers
//! translate requests into coordinator calls and [`error::ApiError`] maps the
//! synchronous error taxonomy onto status codes.

pub mod config;
pub mod error;
pub mod routes;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::{router, AppState};
