//! HTTP routes for the Butler service.
//!
//! Defines the Axum router and application state.

use crate::auth::{KeySetCache, TokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::IdentityProvider;
use axum::http::HeaderValue;
use axum::{middleware, routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    /// Signing keys for bearer token verification, populated at startup.
    pub key_set: Arc<KeySetCache>,

    /// Signup, signin and account confirmation backend.
    pub identity_provider: Arc<dyn IdentityProvider>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` - Welcome text - public
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/ready` - Readiness probe (checks DB + key set) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/auth/signup`, `/auth/signin`, `/auth/verify-account` - public
/// - `/menu`, `/menu/:id`, `/menu-item`, `/menu-item/:id` - public CRUD
/// - `/protected/secret` - requires a bearer token
/// - CORS, TraceLayer, 30 second request timeout, HTTP metrics
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let verifier = Arc::new(TokenVerifier::new(
        Arc::clone(&state.key_set),
        Some(state.config.token_issuer.clone()),
        state.config.jwt_clock_skew_seconds,
    ));
    let auth_state = Arc::new(AuthState { verifier });
    let cors = cors_layer(&state.config.cors_allowed_origins);

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        // Identity provider flows
        .route("/auth/signup", post(handlers::sign_up))
        .route("/auth/signin", post(handlers::sign_in))
        .route("/auth/verify-account", post(handlers::verify_account))
        // Menus
        .route(
            "/menu",
            get(handlers::list_menus).post(handlers::create_menu),
        )
        .route(
            "/menu/:id",
            get(handlers::get_menu)
                .put(handlers::update_menu)
                .delete(handlers::delete_menu),
        )
        // Menu items
        .route(
            "/menu-item",
            get(handlers::list_menu_items).post(handlers::create_menu_item),
        )
        .route(
            "/menu-item/:id",
            get(handlers::get_menu_item)
                .put(handlers::update_menu_item)
                .delete(handlers::delete_menu_item),
        )
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/protected/secret", get(handlers::secret))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CorsLayer - Answer preflights before tracing the inner service
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Any origin when no origins are configured, otherwise exactly the listed ones.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(target: "butler.routes", origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        // Required for Axum's State extractor.
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_config_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Config>();
    }

    #[test]
    fn test_cors_layer_accepts_mixed_origins() {
        // Invalid header values are dropped rather than failing startup.
        let _ = cors_layer(&[]);
        let _ = cors_layer(&[
            "https://butler.example".to_string(),
            "bad\norigin".to_string(),
        ]);
    }
}
