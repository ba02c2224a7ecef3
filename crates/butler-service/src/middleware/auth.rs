//! Authentication middleware for protected routes.
//!
//! The bearer token is taken from the `Authorization: Bearer <token>` header
//! when present, otherwise from the `token` field of a JSON request body.
//! A buffered body is handed to the handler unchanged. Verified claims are
//! inserted into the request extensions.

use crate::auth::verifier::INVALID_TOKEN_MESSAGE;
use crate::auth::TokenVerifier;
use crate::errors::ButlerError;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Largest request body buffered while looking for a `token` field.
pub const MAX_TOKEN_BODY_BYTES: usize = 64 * 1024;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<TokenVerifier>,
}

fn deny() -> ButlerError {
    ButlerError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
}

/// Token from the Authorization header.
///
/// `Ok(None)` when the header is absent. A header with any other scheme is
/// an error rather than a fall-through to the body.
fn bearer_from_headers(headers: &HeaderMap) -> Result<Option<String>, ButlerError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| {
        tracing::debug!(target: "butler.middleware.auth", "Authorization header is not valid ASCII");
        deny()
    })?;

    value
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim().to_string()))
        .ok_or_else(|| {
            tracing::debug!(target: "butler.middleware.auth", "Invalid Authorization header format");
            deny()
        })
}

/// Token from the `token` field of a JSON body.
fn token_from_body(bytes: &Bytes) -> Option<String> {
    let body: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    body.get("token")?
        .as_str()
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
}

/// Reject the request with 401 unless it carries a valid token.
#[instrument(skip_all, name = "butler.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    req: Request,
    next: Next,
) -> Result<Response, ButlerError> {
    let (token, mut req) = match bearer_from_headers(req.headers())? {
        Some(token) => (token, req),
        None => {
            let (parts, body) = req.into_parts();
            let bytes = axum::body::to_bytes(body, MAX_TOKEN_BODY_BYTES)
                .await
                .map_err(|e| {
                    tracing::debug!(target: "butler.middleware.auth", error = %e, "Failed to buffer request body");
                    deny()
                })?;

            let token = token_from_body(&bytes).ok_or_else(|| {
                tracing::debug!(target: "butler.middleware.auth", "No bearer token supplied");
                deny()
            })?;

            (token, Request::from_parts(parts, Body::from(bytes)))
        }
    };

    let claims = state.verifier.verify(&token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
