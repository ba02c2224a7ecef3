//! Metrics definitions for the Butler service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `butler_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: route templates, unknown paths collapse to `/other`
//! - `status`: success, error, timeout (or a small per-metric set)
//! - `operation`: bounded by code (list_menus, insert_menu_item, etc.)
//! - `reason`: bounded by verifier rejection kinds

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle for `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("butler_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("butler_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("butler_token_verification".to_string()),
            &[0.0001, 0.0005, 0.001, 0.002, 0.005, 0.010, 0.025],
        )
        .map_err(|e| format!("Failed to set token verification buckets: {e}"))?
        // Identity provider calls leave the region, so they get wider buckets
        .set_buckets_for_metric(
            Matcher::Prefix("butler_identity_provider_request".to_string()),
            &[
                0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set identity provider buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `butler_http_requests_total`, `butler_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("butler_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("butler_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Replace ids with placeholders so every menu gets one label value.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/health" | "/ready" | "/metrics" | "/menu" | "/menu-item" | "/auth/signup"
        | "/auth/signin" | "/auth/verify-account" | "/protected/secret" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some("menu"), Some(id), None) if !id.is_empty() => "/menu/{id}".to_string(),
        (Some("menu-item"), Some(id), None) if !id.is_empty() => "/menu-item/{id}".to_string(),
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Token Verification Metrics
// ============================================================================

/// Record a bearer token verification.
///
/// Metric: `butler_token_verifications_total`, `butler_token_verification_duration_seconds`
/// Labels: `status` (success, rejected), `reason`
pub fn record_token_verification(status: &str, reason: &str, duration: Duration) {
    histogram!("butler_token_verification_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("butler_token_verifications_total",
        "status" => status.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a key-set population attempt.
///
/// Metric: `butler_key_set_refresh_total`, `butler_key_set_refresh_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_key_set_refresh(status: &str, duration: Duration) {
    histogram!("butler_key_set_refresh_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("butler_key_set_refresh_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution.
///
/// Metric: `butler_db_query_duration_seconds`, `butler_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &str, status: &str, duration: Duration) {
    histogram!("butler_db_query_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("butler_db_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Identity Provider Metrics
// ============================================================================

/// Record a call to the identity provider.
///
/// Metric: `butler_identity_provider_requests_total`,
/// `butler_identity_provider_request_duration_seconds`
/// Labels: `operation` (sign_up, sign_in, confirm_sign_up), `status`
/// (success, rejected, unavailable)
pub fn record_identity_provider_request(operation: &str, status: &str, duration: Duration) {
    histogram!("butler_identity_provider_request_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("butler_identity_provider_requests_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
