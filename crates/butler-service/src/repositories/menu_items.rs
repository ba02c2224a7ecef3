//! Menu items repository.
//!
//! Prices are stored as integer cents (`price_cents BIGINT`) and converted
//! to a decimal number on the way out.

use super::{query_status, MAX_PAGE_SIZE};
use crate::errors::ButlerError;
use crate::models::validation::cents_to_decimal;
use crate::models::{MenuItem, MenuItemInput};
use crate::observability::metrics::record_db_query;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct MenuItemRow {
    id: Uuid,
    name: String,
    description: String,
    price_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: cents_to_decimal(row.price_cents),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for menu item records.
pub struct MenuItemsRepository;

impl MenuItemsRepository {
    /// Oldest first, at most [`MAX_PAGE_SIZE`] records.
    #[instrument(skip_all)]
    pub async fn list(pool: &PgPool) -> Result<Vec<MenuItem>, ButlerError> {
        let start = Instant::now();
        let result: Result<Vec<MenuItemRow>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT id, name, description, price_cents, created_at, updated_at
            FROM menu_items
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(MAX_PAGE_SIZE)
        .fetch_all(pool)
        .await;
        record_db_query("list_menu_items", query_status(&result), start.elapsed());

        Ok(result?.into_iter().map(MenuItem::from).collect())
    }

    #[instrument(skip_all, fields(menu_item_id = %id))]
    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<MenuItem>, ButlerError> {
        let start = Instant::now();
        let result: Result<Option<MenuItemRow>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT id, name, description, price_cents, created_at, updated_at
            FROM menu_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await;
        record_db_query("get_menu_item", query_status(&result), start.elapsed());

        Ok(result?.map(MenuItem::from))
    }

    #[instrument(skip_all)]
    pub async fn create(pool: &PgPool, input: &MenuItemInput) -> Result<MenuItem, ButlerError> {
        let start = Instant::now();
        let result: Result<MenuItemRow, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO menu_items (name, description, price_cents)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, price_cents, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .fetch_one(pool)
        .await;
        record_db_query("insert_menu_item", query_status(&result), start.elapsed());

        let item = MenuItem::from(result?);
        tracing::info!(target: "butler.repository.menu_items", menu_item_id = %item.id, "Menu item created");
        Ok(item)
    }

    /// Replace all fields. `None` when no item has this id.
    #[instrument(skip_all, fields(menu_item_id = %id))]
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        input: &MenuItemInput,
    ) -> Result<Option<MenuItem>, ButlerError> {
        let start = Instant::now();
        let result: Result<Option<MenuItemRow>, sqlx::Error> = sqlx::query_as(
            r#"
            UPDATE menu_items
            SET name = $2, description = $3, price_cents = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, price_cents, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .fetch_optional(pool)
        .await;
        record_db_query("update_menu_item", query_status(&result), start.elapsed());

        Ok(result?.map(MenuItem::from))
    }

    /// Returns whether an item was deleted.
    #[instrument(skip_all, fields(menu_item_id = %id))]
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, ButlerError> {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await;
        record_db_query("delete_menu_item", query_status(&result), start.elapsed());

        let deleted = result?.rows_affected() > 0;
        if deleted {
            tracing::info!(target: "butler.repository.menu_items", menu_item_id = %id, "Menu item deleted");
        }
        Ok(deleted)
    }
}
