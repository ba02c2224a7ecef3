//! Middleware for the Butler service.
//!
//! - `auth` - Bearer token check for protected routes
//! - `http_metrics` - HTTP request metrics

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, AuthState};
pub use http_metrics::http_metrics_middleware;
