//! Cognito user pool client.
//!
//! Speaks the AWS JSON 1.1 protocol: every call is a `POST /` with the
//! operation named in the `X-Amz-Target` header. The app client has a
//! secret, so each call carries a `SecretHash`.
//!
//! # Security
//!
//! - The client secret and user passwords stay in `SecretString` until the
//!   request body is built
//! - Provider error messages are logged, never returned verbatim

use crate::config::Config;
use crate::models::{SignInInput, SignUpInput, VerifyAccountInput};
use crate::observability::metrics::record_identity_provider_request;
use crate::services::identity_provider::{
    AuthTokens, IdentityProvider, IdentityProviderError, SignUpOutcome,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use common::secret::{ExposeSecret, SecretString};
use reqwest::Client;
use ring::hmac;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, instrument, warn};

/// Timeout for identity provider requests in seconds.
const COGNITO_REQUEST_TIMEOUT_SECS: u64 = 10;

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// `base64(HMAC-SHA256(client_secret, username || client_id))`.
pub fn secret_hash(client_secret: &str, username: &str, client_id: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, client_secret.as_bytes());
    let mut ctx = hmac::Context::with_key(&key);
    ctx.update(username.as_bytes());
    ctx.update(client_id.as_bytes());
    STANDARD.encode(ctx.sign().as_ref())
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeType<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpBody<'a> {
    client_id: &'a str,
    username: &'a str,
    password: &'a str,
    secret_hash: String,
    user_attributes: Vec<AttributeType<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpReply {
    #[serde(default)]
    user_confirmed: bool,
}

#[derive(Serialize)]
struct AuthParameters<'a> {
    #[serde(rename = "USERNAME")]
    username: &'a str,
    #[serde(rename = "PASSWORD")]
    password: &'a str,
    #[serde(rename = "SECRET_HASH")]
    secret_hash: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthBody<'a> {
    auth_flow: &'static str,
    client_id: &'a str,
    auth_parameters: AuthParameters<'a>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
    token_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthReply {
    #[serde(default)]
    authentication_result: Option<AuthenticationResult>,
    #[serde(default)]
    challenge_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ConfirmSignUpBody<'a> {
    client_id: &'a str,
    username: &'a str,
    confirmation_code: &'a str,
    secret_hash: String,
}

#[derive(Deserialize)]
struct ConfirmSignUpReply {}

/// Error body of a failed JSON 1.1 call.
#[derive(Debug, Default, Deserialize)]
struct ErrorReply {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(default, alias = "Message")]
    message: String,
}

/// Strip a namespace such as `com.amazon.coral.validate#` from an error type.
fn error_code(error_type: &str) -> String {
    error_type
        .rsplit('#')
        .next()
        .unwrap_or(error_type)
        .to_string()
}

/// HTTP client for a Cognito user pool app client.
pub struct CognitoClient {
    http_client: Client,
    endpoint: String,
    client_id: String,
    client_secret: SecretString,
}

impl CognitoClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `IdentityProviderError::Unavailable` if the HTTP client fails
    /// to build.
    pub fn new(
        endpoint: String,
        client_id: String,
        client_secret: SecretString,
    ) -> Result<Self, IdentityProviderError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(COGNITO_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "butler.services.cognito", error = %e, "Failed to build HTTP client");
                IdentityProviderError::Unavailable("Failed to create HTTP client".to_string())
            })?;

        Ok(Self {
            http_client,
            endpoint,
            client_id,
            client_secret,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, IdentityProviderError> {
        Self::new(
            config.cognito_endpoint.clone(),
            config.cognito_client_id.clone(),
            config.cognito_client_secret.clone(),
        )
    }

    fn secret_hash_for(&self, username: &str) -> String {
        secret_hash(
            self.client_secret.expose_secret(),
            username,
            &self.client_id,
        )
    }

    /// Send one JSON 1.1 call and record its outcome.
    async fn call<B: Serialize, R: DeserializeOwned>(
        &self,
        operation: &'static str,
        target: &'static str,
        body: &B,
    ) -> Result<R, IdentityProviderError> {
        let start = Instant::now();
        let result = self.send(target, body).await;

        let status = match &result {
            Ok(_) => "success",
            Err(IdentityProviderError::Rejected { .. }) => "rejected",
            Err(IdentityProviderError::Unavailable(_)) => "unavailable",
        };
        record_identity_provider_request(operation, status, start.elapsed());

        result
    }

    async fn send<B: Serialize, R: DeserializeOwned>(
        &self,
        target: &'static str,
        body: &B,
    ) -> Result<R, IdentityProviderError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{target}"))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(target: "butler.services.cognito", error = %e, operation = target, "Failed to reach identity provider");
                IdentityProviderError::Unavailable("Identity provider unreachable".to_string())
            })?;

        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                error!(target: "butler.services.cognito", error = %e, operation = target, "Failed to parse identity provider response");
                IdentityProviderError::Unavailable("Invalid identity provider response".to_string())
            })
        } else if status.is_client_error() {
            let reply: ErrorReply = response.json().await.unwrap_or_default();
            warn!(
                target: "butler.services.cognito",
                status = %status,
                operation = target,
                error_type = %reply.error_type,
                "Identity provider rejected request"
            );
            Err(IdentityProviderError::Rejected {
                code: error_code(&reply.error_type),
                message: reply.message,
            })
        } else {
            warn!(target: "butler.services.cognito", status = %status, operation = target, "Identity provider returned server error");
            Err(IdentityProviderError::Unavailable(format!(
                "Identity provider returned HTTP {}",
                status.as_u16()
            )))
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for CognitoClient {
    #[instrument(skip_all, name = "butler.services.cognito.sign_up")]
    async fn sign_up(&self, input: &SignUpInput) -> Result<SignUpOutcome, IdentityProviderError> {
        let body = SignUpBody {
            client_id: &self.client_id,
            username: &input.username,
            password: input.password.expose_secret(),
            secret_hash: self.secret_hash_for(&input.username),
            user_attributes: vec![
                AttributeType {
                    name: "email",
                    value: &input.email,
                },
                AttributeType {
                    name: "gender",
                    value: &input.gender,
                },
                AttributeType {
                    name: "birthdate",
                    value: &input.birthdate,
                },
                AttributeType {
                    name: "name",
                    value: &input.name,
                },
                AttributeType {
                    name: "family_name",
                    value: &input.family_name,
                },
            ],
        };

        let reply: SignUpReply = self.call("sign_up", "SignUp", &body).await?;

        Ok(SignUpOutcome {
            user_confirmed: reply.user_confirmed,
        })
    }

    #[instrument(skip_all, name = "butler.services.cognito.sign_in")]
    async fn sign_in(&self, input: &SignInInput) -> Result<AuthTokens, IdentityProviderError> {
        let body = InitiateAuthBody {
            auth_flow: "USER_PASSWORD_AUTH",
            client_id: &self.client_id,
            auth_parameters: AuthParameters {
                username: &input.username,
                password: input.password.expose_secret(),
                secret_hash: self.secret_hash_for(&input.username),
            },
        };

        let reply: InitiateAuthReply = self.call("sign_in", "InitiateAuth", &body).await?;

        match reply.authentication_result {
            Some(result) => Ok(AuthTokens {
                access_token: result.access_token,
                id_token: result.id_token,
                refresh_token: result.refresh_token,
                expires_in: result.expires_in,
                token_type: result.token_type,
            }),
            // Challenges (e.g. NEW_PASSWORD_REQUIRED) are not supported
            None => Err(IdentityProviderError::Rejected {
                code: reply
                    .challenge_name
                    .unwrap_or_else(|| "MissingAuthenticationResult".to_string()),
                message: "Sign-in requires an unsupported challenge".to_string(),
            }),
        }
    }

    #[instrument(skip_all, name = "butler.services.cognito.confirm_sign_up")]
    async fn confirm_sign_up(
        &self,
        input: &VerifyAccountInput,
    ) -> Result<(), IdentityProviderError> {
        let body = ConfirmSignUpBody {
            client_id: &self.client_id,
            username: &input.username,
            confirmation_code: &input.code,
            secret_hash: self.secret_hash_for(&input.username),
        };

        let _: ConfirmSignUpReply = self
            .call("confirm_sign_up", "ConfirmSignUp", &body)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_hash_known_vectors() {
        assert_eq!(
            secret_hash("shhh-client-secret", "chef_anna", "client-abc"),
            "gYcsKMWIIdNHYNFlUdPz8tNmGOInv+5yhMpA8ylyCWg="
        );
        assert_eq!(
            secret_hash("secret", "user", "client"),
            "wvW87lzZoI+qQCVGmWVBJLlucdJ65huAVP1z+0MgA6E="
        );
    }

    #[test]
    fn test_secret_hash_depends_on_username() {
        assert_ne!(
            secret_hash("secret", "user-a", "client"),
            secret_hash("secret", "user-b", "client")
        );
    }

    #[test]
    fn test_error_code_strips_namespace() {
        assert_eq!(
            error_code("com.amazon.coral.validate#ValidationException"),
            "ValidationException"
        );
        assert_eq!(error_code("NotAuthorizedException"), "NotAuthorizedException");
        assert_eq!(error_code(""), "");
    }

    #[test]
    fn test_sign_up_body_shape() {
        let body = SignUpBody {
            client_id: "client-abc",
            username: "chef_anna",
            password: "tiramisu-2024",
            secret_hash: "hash".to_string(),
            user_attributes: vec![AttributeType {
                name: "email",
                value: "anna@butler.app",
            }],
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ClientId"], "client-abc");
        assert_eq!(json["SecretHash"], "hash");
        assert_eq!(json["UserAttributes"][0]["Name"], "email");
        assert_eq!(json["UserAttributes"][0]["Value"], "anna@butler.app");
    }

    #[test]
    fn test_initiate_auth_body_shape() {
        let body = InitiateAuthBody {
            auth_flow: "USER_PASSWORD_AUTH",
            client_id: "client-abc",
            auth_parameters: AuthParameters {
                username: "chef_anna",
                password: "tiramisu-2024",
                secret_hash: "hash".to_string(),
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["AuthFlow"], "USER_PASSWORD_AUTH");
        assert_eq!(json["AuthParameters"]["USERNAME"], "chef_anna");
        assert_eq!(json["AuthParameters"]["SECRET_HASH"], "hash");
    }

    #[test]
    fn test_initiate_auth_reply_parsing() {
        let json = r#"{
            "AuthenticationResult": {
                "AccessToken": "access",
                "ExpiresIn": 3600,
                "IdToken": "id",
                "RefreshToken": "refresh",
                "TokenType": "Bearer"
            },
            "ChallengeParameters": {}
        }"#;

        let reply: InitiateAuthReply = serde_json::from_str(json).unwrap();
        let result = reply.authentication_result.unwrap();
        assert_eq!(result.access_token, "access");
        assert_eq!(result.expires_in, 3600);
        assert_eq!(result.refresh_token.as_deref(), Some("refresh"));
    }

    #[test]
    fn test_error_reply_parsing() {
        let reply: ErrorReply = serde_json::from_str(
            r#"{"__type": "UsernameExistsException", "message": "User already exists"}"#,
        )
        .unwrap();
        assert_eq!(reply.error_type, "UsernameExistsException");
        assert_eq!(reply.message, "User already exists");
    }

    #[test]
    fn test_client_creation() {
        let client = CognitoClient::new(
            "http://localhost:9229".to_string(),
            "client-abc".to_string(),
            SecretString::from("shhh"),
        )
        .unwrap();
        assert_eq!(client.endpoint, "http://localhost:9229");
        assert_eq!(
            client.secret_hash_for("chef_anna"),
            secret_hash("shhh", "chef_anna", "client-abc")
        );
    }
}
