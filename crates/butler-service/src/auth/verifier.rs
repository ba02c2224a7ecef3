//! Bearer token verification.
//!
//! Verifies identity-provider JWTs against the keys held in the
//! [`KeySetCache`]. No network I/O happens here.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (via `common::jwt`)
//! - Only RSA-family algorithms are accepted, and a key that declares an
//!   `alg` only verifies tokens using that algorithm
//! - `exp` is always checked, `iss` when an issuer is configured, and `iat`
//!   against the configured clock skew
//! - Every rejection yields the same generic 401; the reason is logged at
//!   debug level

use crate::auth::claims::Claims;
use crate::auth::key_set::KeySetCache;
use crate::errors::ButlerError;
use crate::observability::metrics::record_token_verification;
use common::jwt::{decode_unverified_header, ensure_rsa_algorithm, validate_iat};
use jsonwebtoken::{decode, Validation};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Client-facing message for every rejected token.
pub const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

fn deny() -> ButlerError {
    ButlerError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
}

/// Verifies bearer tokens against a key-set cache.
pub struct TokenVerifier {
    key_set: Arc<KeySetCache>,

    /// Expected `iss`; `None` skips the issuer check.
    issuer: Option<String>,

    clock_skew: Duration,
}

impl TokenVerifier {
    pub fn new(key_set: Arc<KeySetCache>, issuer: Option<String>, clock_skew_seconds: i64) -> Self {
        Self {
            key_set,
            issuer,
            clock_skew: Duration::from_secs(clock_skew_seconds.unsigned_abs()),
        }
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `ButlerError::InvalidToken` with a generic message for every
    /// failure: malformed token, unknown `kid`, algorithm mismatch, bad
    /// signature, expired, wrong issuer or `iat` too far in the future.
    #[instrument(skip_all, name = "butler.auth.verify")]
    pub fn verify(&self, token: &str) -> Result<Claims, ButlerError> {
        let start = Instant::now();
        let result = self.verify_inner(token);

        match &result {
            Ok(_) => record_token_verification("success", "none", start.elapsed()),
            Err(reason) => record_token_verification("rejected", reason, start.elapsed()),
        }

        result.map_err(|_| deny())
    }

    /// Returns a bounded rejection reason label on failure.
    fn verify_inner(&self, token: &str) -> Result<Claims, &'static str> {
        let header = decode_unverified_header(token).map_err(|e| {
            tracing::debug!(target: "butler.auth.verify", error = ?e, "Token header rejected");
            "malformed"
        })?;

        ensure_rsa_algorithm(header.alg).map_err(|_| "algorithm")?;

        let key = self.key_set.get(&header.kid).ok_or_else(|| {
            tracing::debug!(target: "butler.auth.verify", kid = %header.kid, "Token kid not in key set");
            "unknown_kid"
        })?;

        if let Some(expected) = key.alg {
            if expected != header.alg {
                tracing::debug!(
                    target: "butler.auth.verify",
                    kid = %header.kid,
                    token_alg = ?header.alg,
                    key_alg = ?expected,
                    "Token algorithm does not match key"
                );
                return Err("algorithm");
            }
        }

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = true;
        // id tokens carry `aud` (the client id); access tokens do not
        validation.validate_aud = false;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data = decode::<Claims>(token, &key.decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "butler.auth.verify", error = %e, "Token verification failed");
            "signature_or_claims"
        })?;

        validate_iat(token_data.claims.iat, self.clock_skew).map_err(|e| {
            tracing::debug!(target: "butler.auth.verify", error = ?e, "Token iat validation failed");
            "iat"
        })?;

        tracing::debug!(target: "butler.auth.verify", kid = %header.kid, "Token verified");
        Ok(token_data.claims)
    }
}
