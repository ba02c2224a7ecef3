//! Menus repository.

use super::{query_status, MAX_PAGE_SIZE};
use crate::errors::ButlerError;
use crate::models::{Menu, MenuInput};
use crate::observability::metrics::record_db_query;
use sqlx::PgPool;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Repository for menu records.
pub struct MenusRepository;

impl MenusRepository {
    /// Oldest first, at most [`MAX_PAGE_SIZE`] records.
    #[instrument(skip_all)]
    pub async fn list(pool: &PgPool) -> Result<Vec<Menu>, ButlerError> {
        let start = Instant::now();
        let result: Result<Vec<Menu>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM menus
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(MAX_PAGE_SIZE)
        .fetch_all(pool)
        .await;
        record_db_query("list_menus", query_status(&result), start.elapsed());

        Ok(result?)
    }

    #[instrument(skip_all, fields(menu_id = %id))]
    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Menu>, ButlerError> {
        let start = Instant::now();
        let result: Result<Option<Menu>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM menus
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await;
        record_db_query("get_menu", query_status(&result), start.elapsed());

        Ok(result?)
    }

    #[instrument(skip_all)]
    pub async fn create(pool: &PgPool, input: &MenuInput) -> Result<Menu, ButlerError> {
        let start = Instant::now();
        let result: Result<Menu, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO menus (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(pool)
        .await;
        record_db_query("insert_menu", query_status(&result), start.elapsed());

        let menu = result?;
        tracing::info!(target: "butler.repository.menus", menu_id = %menu.id, "Menu created");
        Ok(menu)
    }

    /// Replace name and description. `None` when no menu has this id.
    #[instrument(skip_all, fields(menu_id = %id))]
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        input: &MenuInput,
    ) -> Result<Option<Menu>, ButlerError> {
        let start = Instant::now();
        let result: Result<Option<Menu>, sqlx::Error> = sqlx::query_as(
            r#"
            UPDATE menus
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .fetch_optional(pool)
        .await;
        record_db_query("update_menu", query_status(&result), start.elapsed());

        Ok(result?)
    }

    /// Returns whether a menu was deleted.
    #[instrument(skip_all, fields(menu_id = %id))]
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, ButlerError> {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await;
        record_db_query("delete_menu", query_status(&result), start.elapsed());

        let deleted = result?.rows_affected() > 0;
        if deleted {
            tracing::info!(target: "butler.repository.menus", menu_id = %id, "Menu deleted");
        }
        Ok(deleted)
    }
}
