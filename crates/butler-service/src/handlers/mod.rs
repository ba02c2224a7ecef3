//! HTTP request handlers for the Butler service.

pub mod auth;
pub mod health;
pub mod home;
pub mod menu_items;
pub mod menus;
pub mod metrics;
pub mod protected;

pub use auth::{sign_in, sign_up, verify_account};
pub use health::{health_check, readiness_check};
pub use home::home;
pub use menu_items::{
    create_menu_item, delete_menu_item, get_menu_item, list_menu_items, update_menu_item,
};
pub use menus::{create_menu, delete_menu, get_menu, list_menus, update_menu};
pub use metrics::metrics_handler;
pub use protected::secret;

use crate::errors::ButlerError;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use uuid::Uuid;

/// Unwrap a JSON body, turning extractor rejections into 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ButlerError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(target: "butler.handlers", error = %rejection.body_text(), "Rejected request body");
        ButlerError::BadRequest("Request body must be a valid JSON object".to_string())
    })
}

/// Parse a path id. A malformed id cannot exist, so it is a 404.
pub(crate) fn parse_id(raw: &str, resource: &str) -> Result<Uuid, ButlerError> {
    Uuid::parse_str(raw).map_err(|_| ButlerError::NotFound(format!("{resource} not found")))
}
