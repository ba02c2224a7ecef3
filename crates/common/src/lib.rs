//! Common utilities and types shared across Butler components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (header inspection, iat validation, constants)
pub mod jwt;
