//! Authentication handlers.
//!
//! Thin wrappers over the configured [`IdentityProvider`]. Bodies are
//! validated first so malformed requests never reach the provider.
//!
//! [`IdentityProvider`]: crate::services::IdentityProvider

use super::json_body;
use crate::errors::ButlerError;
use crate::models::{
    MessageResponse, SignInRequest, SignInResponse, SignUpRequest, VerifyAccountRequest,
};
use crate::routes::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /auth/signup
#[instrument(skip_all, name = "butler.auth.sign_up")]
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ButlerError> {
    let input = json_body(payload)?.validate()?;
    let outcome = state.identity_provider.sign_up(&input).await?;

    tracing::info!(
        target: "butler.auth",
        user_confirmed = outcome.user_confirmed,
        "User signed up"
    );

    let message = if outcome.user_confirmed {
        "User registered"
    } else {
        "User registered, check your email for the confirmation code"
    };
    Ok(Json(MessageResponse::new(message)))
}

/// Handler for POST /auth/signin
#[instrument(skip_all, name = "butler.auth.sign_in")]
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<SignInResponse>, ButlerError> {
    let input = json_body(payload)?.validate()?;
    let tokens = state.identity_provider.sign_in(&input).await?;

    tracing::info!(target: "butler.auth", "User signed in");
    Ok(Json(tokens.into()))
}

/// Handler for POST /auth/verify-account
#[instrument(skip_all, name = "butler.auth.verify_account")]
pub async fn verify_account(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyAccountRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ButlerError> {
    let input = json_body(payload)?.validate()?;
    state.identity_provider.confirm_sign_up(&input).await?;

    tracing::info!(target: "butler.auth", "Account verified");
    Ok(Json(MessageResponse::new("Account verified")))
}
