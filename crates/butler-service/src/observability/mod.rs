//! Observability for the Butler service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
