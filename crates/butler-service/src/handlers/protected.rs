//! Example route behind token authentication.

use crate::auth::Claims;
use axum::Extension;
use tracing::instrument;

/// Handler for GET /protected/secret
///
/// Only reachable through `require_auth`, which inserts the claims.
#[instrument(skip_all, name = "butler.protected.secret")]
pub async fn secret(Extension(claims): Extension<Claims>) -> &'static str {
    tracing::debug!(
        target: "butler.handlers.protected",
        username = claims.username.as_deref().unwrap_or("<unknown>"),
        token_use = claims.token_use.as_deref().unwrap_or("<unknown>"),
        "Secret viewed"
    );
    "you can view secret"
}
