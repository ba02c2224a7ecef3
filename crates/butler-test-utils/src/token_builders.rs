//! Builder patterns for test data construction
//!
//! Provides a fluent API for minting signed Cognito-style tokens.

use crate::crypto_fixtures::{FixtureError, TestKey};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use serde_json::json;

/// User pool id used by the test server configuration.
pub const TEST_USER_POOL_ID: &str = "us-east-2_ButlerTest";

/// Issuer derived from [`TEST_USER_POOL_ID`].
pub const TEST_ISSUER: &str = "https://cognito-idp.us-east-2.amazonaws.com/us-east-2_ButlerTest";

/// Builder for signed test tokens.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("chef_anna")
///     .expires_in(-60)
///     .sign(&TEST_KEY_1)?;
/// ```
pub struct TestTokenBuilder {
    sub: String,
    username: String,
    issuer: String,
    token_use: String,
    kid: Option<String>,
    exp: i64,
    iat: i64,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults: a valid access token for
    /// `test_user`, issued now, expiring in one hour.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "3f1c7a52-0d4e-4b0e-9a43-6c1d2f0e8b11".to_string(),
            username: "test_user".to_string(),
            issuer: TEST_ISSUER.to_string(),
            token_use: "access".to_string(),
            kid: None,
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Set the username.
    pub fn for_user(mut self, username: &str) -> Self {
        self.username = username.to_string();
        self
    }

    /// Set the issuer.
    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.issuer = issuer.to_string();
        self
    }

    /// Override the header `kid` (defaults to the signing key's).
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Set expiration in seconds from now (negative for an expired token).
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp.
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value.
    pub fn claims(&self) -> serde_json::Value {
        json!({
            "sub": self.sub,
            "username": self.username,
            "iss": self.issuer,
            "token_use": self.token_use,
            "exp": self.exp,
            "iat": self.iat,
        })
    }

    /// Sign with RS256 using `key`.
    pub fn sign(self, key: &TestKey) -> Result<String, FixtureError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone().unwrap_or_else(|| key.kid.to_string()));

        encode(&header, &self.claims(), &key.encoding_key()?)
            .map_err(|e| FixtureError::Crypto(format!("Failed to sign test token: {}", e)))
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of `token` with one byte of the signature altered.
///
/// The header and payload are untouched, so the token still parses.
pub fn flip_signature_byte(token: &str) -> String {
    let (signed, signature) = token.rsplit_once('.').expect("token has three segments");
    let mut bytes = URL_SAFE_NO_PAD.decode(signature).expect("signature is base64url");
    bytes[0] ^= 0x01;
    format!("{}.{}", signed, URL_SAFE_NO_PAD.encode(bytes))
}
