//! JWT claims structure.
//!
//! Claims carried by Cognito access and id tokens. The `sub` field is
//! redacted in Debug output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims of a verified token.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (Cognito user id). Redacted in Debug output.
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Issuer (the user pool URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// `access` or `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,

    /// Username. Access tokens carry `username`, id tokens `cognito:username`.
    #[serde(
        default,
        alias = "cognito:username",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("iss", &self.iss)
            .field("token_use", &self.token_use)
            .field("username", &self.username)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_debug_redacts_sub() {
        let claims = Claims {
            sub: "4f1c2d3e-user-id".to_string(),
            exp: 1_900_000_000,
            iat: 1_899_996_400,
            iss: None,
            token_use: Some("access".to_string()),
            username: Some("chef_anna".to_string()),
        };

        let debug_str = format!("{:?}", claims);

        assert!(!debug_str.contains("4f1c2d3e-user-id"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("chef_anna"));
    }

    #[test]
    fn test_access_token_claims() {
        let json = r#"{
            "sub": "abc",
            "exp": 1900000000,
            "iat": 1899996400,
            "iss": "https://cognito-idp.us-east-2.amazonaws.com/us-east-2_O5BI5NePk",
            "token_use": "access",
            "username": "chef_anna",
            "client_id": "client-abc"
        }"#;

        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.token_use.as_deref(), Some("access"));
        assert_eq!(claims.username.as_deref(), Some("chef_anna"));
    }

    #[test]
    fn test_id_token_username_alias() {
        let json = r#"{
            "sub": "abc",
            "exp": 1900000000,
            "iat": 1899996400,
            "token_use": "id",
            "cognito:username": "chef_anna",
            "email": "anna@butler.app"
        }"#;

        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.username.as_deref(), Some("chef_anna"));
        assert!(claims.iss.is_none());
    }

    #[test]
    fn test_claims_require_exp_and_iat() {
        let json = r#"{"sub": "abc", "exp": 1900000000}"#;
        assert!(serde_json::from_str::<Claims>(json).is_err());
    }
}
