//! JWT utilities shared across Butler services.
//!
//! This module provides the pieces of token handling that do not need a key:
//! - Size limits for DoS prevention
//! - Clock skew constants for iat validation
//! - Unverified header inspection (key id and declared algorithm)
//! - iat validation logic
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Header inspection never verifies anything; the result is only good for
//!   picking a key out of a trusted key set
//! - Only RSA-family algorithms are accepted for identity-provider tokens
//! - Error messages are generic; the variant carries the detail for logs
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_unverified_header, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! let header = decode_unverified_header(token)?;
//! let key = key_set.get(&header.kid).ok_or(...)?;
//! // verify signature with `key` and `header.alg`, then:
//! validate_iat(claims.iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use jsonwebtoken::Algorithm;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Cognito access and id tokens are 1-2KB. Anything past 8KB is rejected
/// before base64 decoding or signature work is attempted.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default JWT clock skew tolerance (5 minutes).
///
/// Tokens with `iat` more than this far in the future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Algorithms a JWKS-published RSA key may be used with.
pub const RSA_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT before verification.
///
/// Every variant displays the same generic message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,

    /// Token declares an algorithm outside [`RSA_ALGORITHMS`].
    #[error("The access token is invalid or expired")]
    UnsupportedAlgorithm,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Header inspection
// =============================================================================

/// The parts of a JWT header needed to pick a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedHeader {
    /// Key identifier the token claims it was signed with.
    pub kid: String,

    /// Algorithm the token declares.
    pub alg: Algorithm,
}

/// Decode a JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - Nothing returned here is trusted; the token MUST still be verified with
///   the key looked up by `kid`
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Not three dot-separated parts, bad base64, bad JSON,
///   or an algorithm name `jsonwebtoken` does not know (including `none`)
/// - `MissingKid` - Header has no `kid`, or `kid` is empty
pub fn decode_unverified_header(token: &str) -> Result<UnverifiedHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts = token.split('.').count();
    if parts != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts,
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header = jsonwebtoken::decode_header(token).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header");
        JwtValidationError::MalformedToken
    })?;

    let kid = header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or(JwtValidationError::MissingKid)?;

    Ok(UnverifiedHeader {
        kid,
        alg: header.alg,
    })
}

/// Reject algorithms that cannot be verified with an RSA public key.
///
/// # Errors
///
/// Returns `UnsupportedAlgorithm` for HMAC and elliptic-curve algorithms.
pub fn ensure_rsa_algorithm(alg: Algorithm) -> Result<(), JwtValidationError> {
    if RSA_ALGORITHMS.contains(&alg) {
        Ok(())
    } else {
        tracing::debug!(target: "common.jwt", alg = ?alg, "Token rejected: non-RSA algorithm");
        Err(JwtValidationError::UnsupportedAlgorithm)
    }
}

// =============================================================================
// Claim checks
// =============================================================================

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the iat timestamp is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // clock_skew is bounded to MAX_CLOCK_SKEW by config validation
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_wrap)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    fn token_with_header(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        format!("{header_b64}.payload.signature")
    }

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_clock_skew_bounds() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::from_secs(300));
        assert_eq!(MAX_CLOCK_SKEW, Duration::from_secs(600));
    }

    // -------------------------------------------------------------------------
    // decode_unverified_header
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_header_cognito_shape() {
        let token = token_with_header(r#"{"kid":"abcdEFGH1234=","alg":"RS256"}"#);

        let header = decode_unverified_header(&token).unwrap();
        assert_eq!(header.kid, "abcdEFGH1234=");
        assert_eq!(header.alg, Algorithm::RS256);
    }

    #[test]
    fn test_decode_header_missing_kid() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT"}"#);
        assert!(matches!(
            decode_unverified_header(&token),
            Err(JwtValidationError::MissingKid)
        ));
    }

    #[test]
    fn test_decode_header_empty_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":""}"#);
        assert!(matches!(
            decode_unverified_header(&token),
            Err(JwtValidationError::MissingKid)
        ));
    }

    #[test]
    fn test_decode_header_wrong_part_count() {
        for token in ["", "single", "only.two", "not.a.valid.jwt.format"] {
            assert!(
                matches!(
                    decode_unverified_header(token),
                    Err(JwtValidationError::MalformedToken)
                ),
                "expected MalformedToken for {token:?}"
            );
        }
    }

    #[test]
    fn test_decode_header_invalid_base64() {
        assert!(matches!(
            decode_unverified_header("!!!invalid!!!.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        ));
    }

    #[test]
    fn test_decode_header_invalid_json() {
        let token = token_with_header("not-json");
        assert!(matches!(
            decode_unverified_header(&token),
            Err(JwtValidationError::MalformedToken)
        ));
    }

    #[test]
    fn test_decode_header_alg_none_is_malformed() {
        let token = token_with_header(r#"{"alg":"none","kid":"k1"}"#);
        assert!(matches!(
            decode_unverified_header(&token),
            Err(JwtValidationError::MalformedToken)
        ));
    }

    #[test]
    fn test_decode_header_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert!(matches!(
            decode_unverified_header(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        ));
    }

    // -------------------------------------------------------------------------
    // ensure_rsa_algorithm
    // -------------------------------------------------------------------------

    #[test]
    fn test_rsa_algorithms_accepted() {
        for alg in RSA_ALGORITHMS {
            assert!(ensure_rsa_algorithm(*alg).is_ok());
        }
    }

    #[test]
    fn test_hmac_and_ec_algorithms_rejected() {
        for alg in [Algorithm::HS256, Algorithm::ES256, Algorithm::EdDSA] {
            assert_eq!(
                ensure_rsa_algorithm(alg),
                Err(JwtValidationError::UnsupportedAlgorithm)
            );
        }
    }

    // -------------------------------------------------------------------------
    // validate_iat
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_iat_past_time() {
        let past = chrono::Utc::now().timestamp() - 3600;
        assert!(validate_iat(past, DEFAULT_CLOCK_SKEW).is_ok());
    }

    #[test]
    fn test_validate_iat_far_future() {
        let far_future = chrono::Utc::now().timestamp() + 86400;
        assert!(matches!(
            validate_iat(far_future, DEFAULT_CLOCK_SKEW),
            Err(JwtValidationError::IatTooFarInFuture)
        ));
    }

    #[test]
    fn test_validate_iat_at_boundary_exact() {
        let now = 1_700_000_000_i64;

        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());
        assert!(matches!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        ));
    }
}
