//! Identity provider abstraction.
//!
//! Signup, signin and account confirmation are delegated to a hosted user
//! pool. Handlers talk to it through [`IdentityProvider`] so tests can swap
//! in [`mock::MockIdentityProvider`].

use crate::errors::ButlerError;
use crate::models::{SignInInput, SignInResponse, SignUpInput, VerifyAccountInput};
use thiserror::Error;

/// Tokens issued on a successful signin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: String,
}

impl From<AuthTokens> for SignInResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            token_type: tokens.token_type,
        }
    }
}

/// Result of a signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignUpOutcome {
    /// Whether the pool confirmed the user without a verification code.
    pub user_confirmed: bool,
}

#[derive(Debug, Error)]
pub enum IdentityProviderError {
    /// The provider answered and refused the request (HTTP 4xx).
    #[error("identity provider rejected the request: {code}: {message}")]
    Rejected { code: String, message: String },

    /// The provider could not be reached or failed (timeout, HTTP 5xx).
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Client-facing text for a provider error code.
///
/// Unknown-user and wrong-password collapse into one message.
pub fn client_message(code: &str) -> &'static str {
    match code {
        "UsernameExistsException" => "Username already exists",
        "InvalidPasswordException" => "Password does not meet the password policy",
        "NotAuthorizedException" | "UserNotFoundException" => "Incorrect username or password",
        "UserNotConfirmedException" => "Account has not been verified",
        "CodeMismatchException" => "Invalid verification code",
        "ExpiredCodeException" => "Verification code has expired",
        "TooManyRequestsException" | "LimitExceededException" => {
            "Too many attempts, try again later"
        }
        _ => "The identity provider rejected the request",
    }
}

impl From<IdentityProviderError> for ButlerError {
    fn from(err: IdentityProviderError) -> Self {
        match err {
            IdentityProviderError::Rejected { code, message } => {
                tracing::info!(
                    target: "butler.services.identity_provider",
                    code = %code,
                    message = %message,
                    "Identity provider rejected request"
                );
                ButlerError::BadRequest(client_message(&code).to_string())
            }
            IdentityProviderError::Unavailable(reason) => ButlerError::ServiceUnavailable(reason),
        }
    }
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a user with the five profile attributes.
    async fn sign_up(&self, input: &SignUpInput) -> Result<SignUpOutcome, IdentityProviderError>;

    /// Password signin.
    async fn sign_in(&self, input: &SignInInput) -> Result<AuthTokens, IdentityProviderError>;

    /// Confirm a signup with the emailed code.
    async fn confirm_sign_up(&self, input: &VerifyAccountInput)
        -> Result<(), IdentityProviderError>;
}

/// Mock identity provider for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    #[derive(Debug, Clone)]
    enum Behavior {
        Accept,
        Reject(String),
        Unavailable,
    }

    /// Mock that answers every call the same way and records usernames.
    pub struct MockIdentityProvider {
        behavior: Behavior,
        tokens: AuthTokens,
        call_count: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    impl MockIdentityProvider {
        fn with_behavior(behavior: Behavior) -> Self {
            Self {
                behavior,
                tokens: AuthTokens {
                    access_token: "mock-access-token".to_string(),
                    id_token: "mock-id-token".to_string(),
                    refresh_token: Some("mock-refresh-token".to_string()),
                    expires_in: 3600,
                    token_type: "Bearer".to_string(),
                },
                call_count: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Accept every request.
        pub fn accepting() -> Self {
            Self::with_behavior(Behavior::Accept)
        }

        /// Reject every request with the given provider error code.
        pub fn rejecting(code: &str) -> Self {
            Self::with_behavior(Behavior::Reject(code.to_string()))
        }

        /// Fail every request as if the provider were down.
        pub fn unavailable() -> Self {
            Self::with_behavior(Behavior::Unavailable)
        }

        /// Tokens returned by `sign_in`.
        pub fn with_tokens(mut self, tokens: AuthTokens) -> Self {
            self.tokens = tokens;
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Recorded calls as `"<operation>:<username>"`.
        pub fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn record(&self, operation: &str, username: &str) -> Result<(), IdentityProviderError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(format!("{operation}:{username}"));

            match &self.behavior {
                Behavior::Accept => Ok(()),
                Behavior::Reject(code) => Err(IdentityProviderError::Rejected {
                    code: code.clone(),
                    message: "Mock rejection".to_string(),
                }),
                Behavior::Unavailable => Err(IdentityProviderError::Unavailable(
                    "Mock identity provider unavailable".to_string(),
                )),
            }
        }
    }

    #[async_trait::async_trait]
    impl IdentityProvider for MockIdentityProvider {
        async fn sign_up(
            &self,
            input: &SignUpInput,
        ) -> Result<SignUpOutcome, IdentityProviderError> {
            self.record("sign_up", &input.username)?;
            Ok(SignUpOutcome {
                user_confirmed: false,
            })
        }

        async fn sign_in(&self, input: &SignInInput) -> Result<AuthTokens, IdentityProviderError> {
            self.record("sign_in", &input.username)?;
            Ok(self.tokens.clone())
        }

        async fn confirm_sign_up(
            &self,
            input: &VerifyAccountInput,
        ) -> Result<(), IdentityProviderError> {
            self.record("confirm_sign_up", &input.username)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::MockIdentityProvider;
    use super::*;
    use common::secret::SecretString;

    fn sign_in_input() -> SignInInput {
        SignInInput {
            username: "chef_anna".to_string(),
            password: SecretString::from("tiramisu-2024"),
        }
    }

    #[test]
    fn test_rejected_maps_to_bad_request_with_client_message() {
        let err: ButlerError = IdentityProviderError::Rejected {
            code: "UsernameExistsException".to_string(),
            message: "User already exists".to_string(),
        }
        .into();

        assert!(matches!(err, ButlerError::BadRequest(msg) if msg == "Username already exists"));
    }

    #[test]
    fn test_unavailable_maps_to_service_unavailable() {
        let err: ButlerError = IdentityProviderError::Unavailable("timeout".to_string()).into();
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn test_client_message_hides_user_existence() {
        assert_eq!(
            client_message("UserNotFoundException"),
            client_message("NotAuthorizedException")
        );
        assert_eq!(
            client_message("SomethingNewException"),
            "The identity provider rejected the request"
        );
    }

    #[test]
    fn test_tokens_convert_to_response() {
        let response = SignInResponse::from(AuthTokens {
            access_token: "a".to_string(),
            id_token: "i".to_string(),
            refresh_token: None,
            expires_in: 3600,
            token_type: "Bearer".to_string(),
        });
        assert_eq!(response.access_token, "a");
        assert!(response.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_mock_accepting_records_calls() {
        let mock = MockIdentityProvider::accepting();

        let tokens = mock.sign_in(&sign_in_input()).await.unwrap();
        assert_eq!(tokens.token_type, "Bearer");

        mock.confirm_sign_up(&VerifyAccountInput {
            username: "chef_anna".to_string(),
            code: "123456".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(mock.call_count(), 2);
        assert_eq!(
            mock.calls(),
            vec!["sign_in:chef_anna", "confirm_sign_up:chef_anna"]
        );
    }

    #[tokio::test]
    async fn test_mock_rejecting_and_unavailable() {
        let rejecting = MockIdentityProvider::rejecting("NotAuthorizedException");
        assert!(matches!(
            rejecting.sign_in(&sign_in_input()).await,
            Err(IdentityProviderError::Rejected { code, .. }) if code == "NotAuthorizedException"
        ));

        let unavailable = MockIdentityProvider::unavailable();
        assert!(matches!(
            unavailable.sign_in(&sign_in_input()).await,
            Err(IdentityProviderError::Unavailable(_))
        ));
        assert_eq!(unavailable.call_count(), 1);
    }
}
