//! Butler Service Library
//!
//! Backend for the Butler food management app:
//!
//! - Menu and menu item CRUD backed by Postgres
//! - Signup, signin and account confirmation through Amazon Cognito
//! - Bearer token verification against the user pool's JWKS
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs | repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Key set cache and token verification
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and HTTP metrics middleware
//! - `models` - Records, request bodies and validation
//! - `observability` - Prometheus metrics
//! - `repositories` - Database access layer
//! - `routes` - Axum router setup
//! - `services` - Identity provider clients

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
