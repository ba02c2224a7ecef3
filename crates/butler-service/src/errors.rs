//! Butler service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Messages
//! returned to clients are generic; the underlying cause is logged
//! server-side.

use crate::models::validation::FieldError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Butler service error type.
///
/// Maps to HTTP status codes:
/// - Database, Internal: 500 Internal Server Error
/// - InvalidToken: 401 Unauthorized
/// - NotFound: 404 Not Found
/// - BadRequest: 400 Bad Request
/// - Validation: 422 Unprocessable Entity
/// - ServiceUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum ButlerError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl ButlerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ButlerError::Database(_) | ButlerError::Internal => 500,
            ButlerError::InvalidToken(_) => 401,
            ButlerError::NotFound(_) => 404,
            ButlerError::BadRequest(_) => 400,
            ButlerError::Validation(_) => 422,
            ButlerError::ServiceUnavailable(_) => 503,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Serialize)]
struct ValidationResponse {
    errors: Vec<FieldError>,
}

impl IntoResponse for ButlerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ButlerError::Validation(errors) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(ValidationResponse { errors }),
                )
                    .into_response();
            }
            ButlerError::Database(err) => {
                tracing::error!(target: "butler.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            ButlerError::InvalidToken(reason) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", reason)
            }
            ButlerError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource),
            ButlerError::BadRequest(reason) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason),
            ButlerError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "butler.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            ButlerError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"butler-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

impl From<sqlx::Error> for ButlerError {
    fn from(err: sqlx::Error) -> Self {
        ButlerError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ButlerError::Database("connection failed".to_string()).to_string(),
            "Database error: connection failed"
        );
        assert_eq!(
            ButlerError::NotFound("menu".to_string()).to_string(),
            "Not found: menu"
        );
        assert_eq!(ButlerError::Internal.to_string(), "Internal server error");

        let validation = ButlerError::Validation(vec![
            FieldError::new("name", "too short"),
            FieldError::new("price", "required"),
        ]);
        assert_eq!(validation.to_string(), "Validation failed: 2 field error(s)");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ButlerError::Database("test".to_string()).status_code(), 500);
        assert_eq!(
            ButlerError::InvalidToken("test".to_string()).status_code(),
            401
        );
        assert_eq!(ButlerError::NotFound("test".to_string()).status_code(), 404);
        assert_eq!(ButlerError::BadRequest("test".to_string()).status_code(), 400);
        assert_eq!(ButlerError::Validation(vec![]).status_code(), 422);
        assert_eq!(
            ButlerError::ServiceUnavailable("test".to_string()).status_code(),
            503
        );
        assert_eq!(ButlerError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_database_error_is_generic() {
        let response =
            ButlerError::Database("relation \"menus\" does not exist".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "DATABASE_ERROR");
        assert_eq!(
            body_json["error"]["message"],
            "An internal database error occurred"
        );
    }

    #[tokio::test]
    async fn test_into_response_invalid_token_sets_www_authenticate() {
        let response =
            ButlerError::InvalidToken("The access token is invalid or expired".to_string())
                .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response
            .headers()
            .get("WWW-Authenticate")
            .expect("401 must carry WWW-Authenticate")
            .to_str()
            .unwrap();
        assert!(www_auth.starts_with("Bearer"));
        assert!(www_auth.contains("error=\"invalid_token\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let response = ButlerError::NotFound("Menu not found".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "NOT_FOUND");
        assert_eq!(body_json["error"]["message"], "Menu not found");
    }

    #[tokio::test]
    async fn test_into_response_bad_request() {
        let response =
            ButlerError::BadRequest("User already exists".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "BAD_REQUEST");
        assert_eq!(body_json["error"]["message"], "User already exists");
    }

    #[tokio::test]
    async fn test_into_response_validation_lists_fields() {
        let response = ButlerError::Validation(vec![FieldError::new(
            "description",
            "must be at least 8 characters",
        )])
        .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body_json = read_body_json(response.into_body()).await;
        assert!(body_json.get("error").is_none());
        assert_eq!(body_json["errors"][0]["field"], "description");
        assert_eq!(
            body_json["errors"][0]["message"],
            "must be at least 8 characters"
        );
    }

    #[tokio::test]
    async fn test_into_response_service_unavailable_is_generic() {
        let response =
            ButlerError::ServiceUnavailable("cognito timed out".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "SERVICE_UNAVAILABLE");
        assert_eq!(
            body_json["error"]["message"],
            "Service temporarily unavailable"
        );
    }

    #[tokio::test]
    async fn test_into_response_internal() {
        let response = ButlerError::Internal.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INTERNAL_ERROR");
    }
}
