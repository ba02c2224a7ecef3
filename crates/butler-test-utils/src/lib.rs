//! # Butler Test Utilities
//!
//! Shared test utilities for the Butler service.
//!
//! This crate provides:
//! - Fixed RSA signing keys and their JWKS descriptors
//! - Test token builder (`TestTokenBuilder`)
//! - Server test harness (`TestButlerServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use butler_test_utils::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_example(pool: PgPool) -> Result<()> {
//!     let server = TestButlerServer::spawn(pool).await?;
//!     let token = TestTokenBuilder::new().sign(&TEST_KEY_1)?;
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/protected/secret", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
