//! Menu handlers.
//!
//! | Route | Success |
//! |---|---|
//! | `GET /menu` | 200, oldest first |
//! | `GET /menu/:id` | 200 |
//! | `POST /menu` | 201 |
//! | `PUT /menu/:id` | 200 |
//! | `DELETE /menu/:id` | 204 |
//!
//! Bodies are validated before any database work; an unknown or malformed
//! id is a 404.

use super::{json_body, parse_id};
use crate::errors::ButlerError;
use crate::models::{Menu, MenuRequest};
use crate::repositories::MenusRepository;
use crate::routes::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

const RESOURCE: &str = "Menu";

fn not_found() -> ButlerError {
    ButlerError::NotFound(format!("{RESOURCE} not found"))
}

/// Handler for GET /menu
#[instrument(skip_all, name = "butler.menus.list")]
pub async fn list_menus(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Menu>>, ButlerError> {
    let menus = MenusRepository::list(&state.pool).await?;
    Ok(Json(menus))
}

/// Handler for GET /menu/:id
#[instrument(skip_all, name = "butler.menus.get", fields(menu_id = %id))]
pub async fn get_menu(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Menu>, ButlerError> {
    let id = parse_id(&id, RESOURCE)?;
    MenusRepository::get(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// Handler for POST /menu
#[instrument(skip_all, name = "butler.menus.create")]
pub async fn create_menu(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MenuRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Menu>), ButlerError> {
    let input = json_body(payload)?.validate()?;
    let menu = MenusRepository::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

/// Handler for PUT /menu/:id
#[instrument(skip_all, name = "butler.menus.update", fields(menu_id = %id))]
pub async fn update_menu(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<MenuRequest>, JsonRejection>,
) -> Result<Json<Menu>, ButlerError> {
    let input = json_body(payload)?.validate()?;
    let id = parse_id(&id, RESOURCE)?;
    MenusRepository::update(&state.pool, id, &input)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// Handler for DELETE /menu/:id
#[instrument(skip_all, name = "butler.menus.delete", fields(menu_id = %id))]
pub async fn delete_menu(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ButlerError> {
    let id = parse_id(&id, RESOURCE)?;
    if MenusRepository::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}
