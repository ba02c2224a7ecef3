//! Landing route.

/// Handler for GET /
pub async fn home() -> &'static str {
    "Butler's Food Management App!"
}
