//! Repository layer for the Butler service.
//!
//! Repositories are unit structs with associated async functions taking a
//! `&PgPool`. Every query is parameterized and records a DB query metric.

pub mod menu_items;
pub mod menus;

pub use menu_items::MenuItemsRepository;
pub use menus::MenusRepository;

/// Largest number of records a list query returns.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Metric status label for a query result.
fn query_status<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}
