//! Token authentication.
//!
//! - `claims` - Claims carried by verified tokens
//! - `key_set` - Process-wide cache of the identity provider's signing keys
//! - `verifier` - Signature and claim verification against the cache

pub mod claims;
pub mod key_set;
pub mod verifier;

pub use claims::Claims;
pub use key_set::{KeySet, KeySetCache, KeySetError};
pub use verifier::TokenVerifier;
