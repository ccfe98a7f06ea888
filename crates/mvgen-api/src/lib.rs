//! Axum HTTP API server.
//!
//! This crate provides:
//! - JSON endpoints for each pipeline stage and for a full run
//! - Project status lookup
//! - Static serving of generated artifacts
//! - Per-IP rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
