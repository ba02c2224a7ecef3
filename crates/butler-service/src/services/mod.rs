//! Service layer for the Butler service.
//!
//! - `identity_provider` - Trait over the hosted user pool, plus a mock
//! - `cognito` - Cognito user pool client (AWS JSON 1.1 protocol)

pub mod cognito;
pub mod identity_provider;

pub use cognito::CognitoClient;
pub use identity_provider::{
    AuthTokens, IdentityProvider, IdentityProviderError, SignUpOutcome,
};
