//! Menu item handlers.
//!
//! Same shape as the menu handlers, with a validated `price`.

use super::{json_body, parse_id};
use crate::errors::ButlerError;
use crate::models::{MenuItem, MenuItemRequest};
use crate::repositories::MenuItemsRepository;
use crate::routes::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

const RESOURCE: &str = "Menu item";

fn not_found() -> ButlerError {
    ButlerError::NotFound(format!("{RESOURCE} not found"))
}

/// Handler for GET /menu-item
#[instrument(skip_all, name = "butler.menu_items.list")]
pub async fn list_menu_items(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MenuItem>>, ButlerError> {
    let items = MenuItemsRepository::list(&state.pool).await?;
    Ok(Json(items))
}

/// Handler for GET /menu-item/:id
#[instrument(skip_all, name = "butler.menu_items.get", fields(menu_item_id = %id))]
pub async fn get_menu_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MenuItem>, ButlerError> {
    let id = parse_id(&id, RESOURCE)?;
    MenuItemsRepository::get(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// Handler for POST /menu-item
#[instrument(skip_all, name = "butler.menu_items.create")]
pub async fn create_menu_item(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MenuItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MenuItem>), ButlerError> {
    let input = json_body(payload)?.validate()?;
    let item = MenuItemsRepository::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for PUT /menu-item/:id
#[instrument(skip_all, name = "butler.menu_items.update", fields(menu_item_id = %id))]
pub async fn update_menu_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<MenuItemRequest>, JsonRejection>,
) -> Result<Json<MenuItem>, ButlerError> {
    let input = json_body(payload)?.validate()?;
    let id = parse_id(&id, RESOURCE)?;
    MenuItemsRepository::update(&state.pool, id, &input)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// Handler for DELETE /menu-item/:id
#[instrument(skip_all, name = "butler.menu_items.delete", fields(menu_item_id = %id))]
pub async fn delete_menu_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ButlerError> {
    let id = parse_id(&id, RESOURCE)?;
    if MenuItemsRepository::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}
