//! Butler models.
//!
//! Request payloads, validated inputs and response bodies. Request payloads
//! hold raw JSON values; each one has a `validate` that yields the typed
//! input the handlers and repositories work with.

pub mod validation;

use crate::errors::ButlerError;
use chrono::{DateTime, Utc};
use common::secret::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validation::Validator;

/// Minimum length of a menu or menu item name.
pub const MIN_NAME_LENGTH: usize = 5;

/// Minimum length of a menu or menu item description.
pub const MIN_DESCRIPTION_LENGTH: usize = 8;

/// Minimum length of a username on signup and signin.
pub const MIN_USERNAME_LENGTH: usize = 5;

/// Minimum length of a password on signup and signin.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Length of the account confirmation code.
pub const CONFIRMATION_CODE_LENGTH: usize = 6;

// ============================================================================
// Menus
// ============================================================================

/// A menu as stored and returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Menu {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /menu` and `PUT /menu/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuRequest {
    #[serde(default)]
    pub name: Option<Value>,

    #[serde(default)]
    pub description: Option<Value>,
}

/// Validated menu fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuInput {
    pub name: String,
    pub description: String,
}

impl MenuRequest {
    pub fn validate(&self) -> Result<MenuInput, ButlerError> {
        let mut v = Validator::new();
        let name = v.min_chars("name", self.name.as_ref(), MIN_NAME_LENGTH);
        let description =
            v.min_chars("description", self.description.as_ref(), MIN_DESCRIPTION_LENGTH);
        v.finish()?;

        Ok(MenuInput {
            name: name.unwrap_or_default(),
            description: description.unwrap_or_default(),
        })
    }
}

// ============================================================================
// Menu items
// ============================================================================

/// A menu item as returned to clients.
///
/// The price is stored as integer cents and rendered as a decimal number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: serde_json::Number,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /menu-item` and `PUT /menu-item/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemRequest {
    #[serde(default)]
    pub name: Option<Value>,

    #[serde(default)]
    pub description: Option<Value>,

    #[serde(default)]
    pub price: Option<Value>,
}

/// Validated menu item fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItemInput {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
}

impl MenuItemRequest {
    pub fn validate(&self) -> Result<MenuItemInput, ButlerError> {
        let mut v = Validator::new();
        let name = v.min_chars("name", self.name.as_ref(), MIN_NAME_LENGTH);
        let description =
            v.min_chars("description", self.description.as_ref(), MIN_DESCRIPTION_LENGTH);
        let price_cents = v.price_cents("price", self.price.as_ref());
        v.finish()?;

        Ok(MenuItemInput {
            name: name.unwrap_or_default(),
            description: description.unwrap_or_default(),
            price_cents: price_cents.unwrap_or_default(),
        })
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Body of `POST /auth/signup`.
#[derive(Clone, Default, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub username: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub gender: Option<Value>,
    #[serde(default)]
    pub birthdate: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub family_name: Option<Value>,
}

/// Validated signup fields.
#[derive(Debug, Clone)]
pub struct SignUpInput {
    pub username: String,
    pub password: SecretString,
    pub email: String,
    pub gender: String,
    pub birthdate: String,
    pub name: String,
    pub family_name: String,
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<SignUpInput, ButlerError> {
        let mut v = Validator::new();
        let username = v.min_chars("username", self.username.as_ref(), MIN_USERNAME_LENGTH);
        let email = v.email("email", self.email.as_ref());
        let password = v.min_chars("password", self.password.as_ref(), MIN_PASSWORD_LENGTH);
        let birthdate = v.iso_date("birthdate", self.birthdate.as_ref());
        let gender = v.non_empty("gender", self.gender.as_ref());
        let name = v.non_empty("name", self.name.as_ref());
        let family_name = v.non_empty("family_name", self.family_name.as_ref());
        v.finish()?;

        Ok(SignUpInput {
            username: username.unwrap_or_default(),
            password: SecretString::from(password.unwrap_or_default()),
            email: email.unwrap_or_default(),
            gender: gender.unwrap_or_default(),
            birthdate: birthdate.unwrap_or_default(),
            name: name.unwrap_or_default(),
            family_name: family_name.unwrap_or_default(),
        })
    }
}

/// Body of `POST /auth/signin`.
#[derive(Clone, Default, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub username: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

/// Validated signin fields.
#[derive(Debug, Clone)]
pub struct SignInInput {
    pub username: String,
    pub password: SecretString,
}

impl SignInRequest {
    pub fn validate(&self) -> Result<SignInInput, ButlerError> {
        let mut v = Validator::new();
        let username = v.min_chars("username", self.username.as_ref(), MIN_USERNAME_LENGTH);
        let password = v.min_chars("password", self.password.as_ref(), MIN_PASSWORD_LENGTH);
        v.finish()?;

        Ok(SignInInput {
            username: username.unwrap_or_default(),
            password: SecretString::from(password.unwrap_or_default()),
        })
    }
}

/// Body of `POST /auth/verify-account`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyAccountRequest {
    #[serde(default)]
    pub username: Option<Value>,
    #[serde(default)]
    pub code: Option<Value>,
}

/// Validated account confirmation fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyAccountInput {
    pub username: String,
    pub code: String,
}

impl VerifyAccountRequest {
    pub fn validate(&self) -> Result<VerifyAccountInput, ButlerError> {
        let mut v = Validator::new();
        let username = v.min_chars("username", self.username.as_ref(), MIN_USERNAME_LENGTH);
        let code = v.exact_chars("code", self.code.as_ref(), CONFIRMATION_CODE_LENGTH);
        v.finish()?;

        Ok(VerifyAccountInput {
            username: username.unwrap_or_default(),
            code: code.unwrap_or_default(),
        })
    }
}

/// Tokens issued by the identity provider on signin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInResponse {
    pub access_token: String,
    pub id_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: String,
}

/// Plain acknowledgement body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Operational
// ============================================================================

/// Readiness probe response.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_set: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;
    use serde_json::json;
    use validation::FieldError;

    fn field_errors(err: ButlerError) -> Vec<FieldError> {
        match err {
            ButlerError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_menu_request_valid() {
        let req: MenuRequest =
            serde_json::from_value(json!({"name": "Brunch", "description": "Weekend plates"}))
                .unwrap();

        let input = req.validate().unwrap();
        assert_eq!(input.name, "Brunch");
        assert_eq!(input.description, "Weekend plates");
    }

    #[test]
    fn test_menu_request_reports_every_field() {
        let req: MenuRequest = serde_json::from_value(json!({"name": "Tea"})).unwrap();

        let errors = field_errors(req.validate().unwrap_err());
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "description"]);
    }

    #[test]
    fn test_menu_item_description_boundary() {
        let short: MenuItemRequest = serde_json::from_value(json!({
            "name": "Espresso",
            "description": "1234567",
            "price": 2.5
        }))
        .unwrap();
        let errors = field_errors(short.validate().unwrap_err());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "description");

        let exact: MenuItemRequest = serde_json::from_value(json!({
            "name": "Espresso",
            "description": "12345678",
            "price": 2.5
        }))
        .unwrap();
        let input = exact.validate().unwrap();
        assert_eq!(input.price_cents, 250);
    }

    #[test]
    fn test_menu_item_requires_price() {
        let req: MenuItemRequest = serde_json::from_value(json!({
            "name": "Espresso",
            "description": "Double shot, no sugar"
        }))
        .unwrap();

        let errors = field_errors(req.validate().unwrap_err());
        assert_eq!(errors, vec![FieldError::new("price", "is required")]);
    }

    #[test]
    fn test_menu_item_serializes_price_as_number() {
        let item = MenuItem {
            id: Uuid::nil(),
            name: "Espresso".to_string(),
            description: "Double shot".to_string(),
            price: validation::cents_to_decimal(250),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["price"], json!(2.5));
    }

    #[test]
    fn test_signup_request_valid() {
        let req: SignUpRequest = serde_json::from_value(json!({
            "username": "chef_anna",
            "password": "tiramisu-2024",
            "email": "Anna@Butler.App",
            "gender": "female",
            "birthdate": "1990-04-23",
            "name": "Anna",
            "family_name": "Rossi"
        }))
        .unwrap();

        let input = req.validate().unwrap();
        assert_eq!(input.username, "chef_anna");
        assert_eq!(input.email, "anna@butler.app");
        assert_eq!(input.password.expose_secret(), "tiramisu-2024");
        assert!(!format!("{input:?}").contains("tiramisu-2024"));
    }

    #[test]
    fn test_signup_request_collects_all_errors() {
        let req: SignUpRequest = serde_json::from_value(json!({
            "username": "ann",
            "password": "short",
            "email": "not-an-email",
            "birthdate": "yesterday"
        }))
        .unwrap();

        let errors = field_errors(req.validate().unwrap_err());
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "username",
                "email",
                "password",
                "birthdate",
                "gender",
                "name",
                "family_name"
            ]
        );
    }

    #[test]
    fn test_signin_request_rejects_short_password() {
        let req: SignInRequest =
            serde_json::from_value(json!({"username": "chef_anna", "password": "1234"})).unwrap();

        let errors = field_errors(req.validate().unwrap_err());
        assert_eq!(errors[0].field, "password");
    }

    #[test]
    fn test_verify_account_code_length() {
        let ok: VerifyAccountRequest =
            serde_json::from_value(json!({"username": "chef_anna", "code": "123456"})).unwrap();
        assert_eq!(ok.validate().unwrap().code, "123456");

        let bad: VerifyAccountRequest =
            serde_json::from_value(json!({"username": "chef_anna", "code": "12345"})).unwrap();
        let errors = field_errors(bad.validate().unwrap_err());
        assert_eq!(errors[0].field, "code");
        assert_eq!(errors[0].message, "must be exactly 6 characters");
    }

    #[test]
    fn test_verify_account_username_length() {
        let short: VerifyAccountRequest =
            serde_json::from_value(json!({"username": "anna", "code": "123456"})).unwrap();
        let errors = field_errors(short.validate().unwrap_err());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "username");
        assert_eq!(errors[0].message, "must be at least 5 characters");

        let ok: VerifyAccountRequest =
            serde_json::from_value(json!({"username": "annar", "code": "123456"})).unwrap();
        assert_eq!(ok.validate().unwrap().username, "annar");
    }

    #[test]
    fn test_signin_response_omits_missing_refresh_token() {
        let response = SignInResponse {
            access_token: "a".to_string(),
            id_token: "i".to_string(),
            refresh_token: None,
            expires_in: 3600,
            token_type: "Bearer".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("refresh_token"));
        assert!(json.contains("\"expires_in\":3600"));
    }

    #[test]
    fn test_readiness_response_serialization() {
        let ready = ReadinessResponse {
            status: "ready",
            database: Some("healthy"),
            key_set: Some("loaded"),
            error: None,
        };

        let json = serde_json::to_string(&ready).unwrap();
        assert!(json.contains("\"status\":\"ready\""));
        assert!(json.contains("\"key_set\":\"loaded\""));
        assert!(!json.contains("\"error\""));

        let not_ready = ReadinessResponse {
            status: "not_ready",
            database: Some("unhealthy"),
            key_set: None,
            error: Some("Service dependencies unavailable".to_string()),
        };

        let json = serde_json::to_string(&not_ready).unwrap();
        assert!(json.contains("\"database\":\"unhealthy\""));
        assert!(!json.contains("\"key_set\""));
    }
}
