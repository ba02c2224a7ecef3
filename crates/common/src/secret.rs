//! Secret types for values that must never reach a log line.
//!
//! Re-exports [`secrecy`] so every Butler crate names secrets the same way.
//! `SecretString` redacts itself in `Debug`, so a struct that derives `Debug`
//! and holds one stays safe to trace.
//!
//! # What counts as a secret here
//!
//! - The Cognito app client secret (used to compute the `SecretHash`)
//! - User passwords on signup and signin requests
//!
//! Tokens issued at signin are returned to the caller verbatim and are not
//! wrapped.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct SignInRequest {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let json = r#"{"username": "waiter01", "password": "correct-horse"}"#;
//! let req: SignInRequest = serde_json::from_str(json).unwrap();
//!
//! assert!(!format!("{req:?}").contains("correct-horse"));
//! assert_eq!(req.password.expose_secret(), "correct-horse");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
