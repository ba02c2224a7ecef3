//! Butler service configuration.
//!
//! Configuration is loaded from environment variables. The database URL and
//! the Cognito client secret are redacted in Debug output.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// Default connection drain period on shutdown, in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Upper bound on the drain period, in seconds.
pub const MAX_DRAIN_SECONDS: u64 = 300;

/// Butler service configuration.
///
/// Cognito coordinates are required: there is no built-in user pool.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:5000").
    pub bind_address: String,

    /// AWS region hosting the user pool (e.g., "us-east-2").
    pub cognito_region: String,

    /// Cognito user pool id (e.g., "us-east-2_O5BI5NePk").
    pub cognito_user_pool_id: String,

    /// Cognito app client id.
    pub cognito_client_id: String,

    /// Cognito app client secret, used for the per-request secret hash.
    pub cognito_client_secret: SecretString,

    /// Base URL of the Cognito identity provider API.
    pub cognito_endpoint: String,

    /// URL of the JWKS document listing the pool's signing keys.
    pub key_set_url: String,

    /// Expected `iss` claim on every verified token.
    pub token_issuer: String,

    /// JWT clock skew tolerance in seconds for iat validation.
    pub jwt_clock_skew_seconds: i64,

    /// Origins allowed by CORS. Empty means any origin.
    pub cors_allowed_origins: Vec<String>,

    /// Seconds to keep serving in-flight requests after a shutdown signal.
    pub drain_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("cognito_region", &self.cognito_region)
            .field("cognito_user_pool_id", &self.cognito_user_pool_id)
            .field("cognito_client_id", &self.cognito_client_id)
            .field("cognito_client_secret", &"[REDACTED]")
            .field("cognito_endpoint", &self.cognito_endpoint)
            .field("key_set_url", &self.key_set_url)
            .field("token_issuer", &self.token_issuer)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid Cognito user pool configuration: {0}")]
    InvalidUserPool(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = required(vars, "DATABASE_URL")?;
        let cognito_user_pool_id = required(vars, "COGNITO_USER_POOL_ID")?;
        let cognito_client_id = required(vars, "COGNITO_CLIENT_ID")?;
        let cognito_client_secret = SecretString::from(required(vars, "COGNITO_CLIENT_SECRET")?);

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // Pool ids are "<region>_<suffix>", so the region can be derived
        let cognito_region = match vars.get("COGNITO_REGION") {
            Some(region) => region.clone(),
            None => cognito_user_pool_id
                .split_once('_')
                .map(|(region, _)| region.to_string())
                .filter(|region| !region.is_empty())
                .ok_or_else(|| {
                    ConfigError::InvalidUserPool(format!(
                        "cannot derive region from COGNITO_USER_POOL_ID '{}'; set COGNITO_REGION",
                        cognito_user_pool_id
                    ))
                })?,
        };

        let cognito_endpoint = vars
            .get("COGNITO_ENDPOINT")
            .cloned()
            .unwrap_or_else(|| format!("https://cognito-idp.{}.amazonaws.com", cognito_region));

        let token_issuer = vars.get("TOKEN_ISSUER").cloned().unwrap_or_else(|| {
            format!(
                "https://cognito-idp.{}.amazonaws.com/{}",
                cognito_region, cognito_user_pool_id
            )
        });

        let key_set_url = vars
            .get("KEY_SET_URL")
            .cloned()
            .unwrap_or_else(|| format!("{}/.well-known/jwks.json", token_issuer));

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let cors_allowed_origins = vars
            .get("CORS_ALLOWED_ORIGINS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let drain_seconds = match vars.get("BUTLER_DRAIN_SECONDS") {
            Some(value_str) => {
                let value: u64 = value_str.trim().parse().map_err(|e| {
                    ConfigError::InvalidDrainSeconds(format!(
                        "BUTLER_DRAIN_SECONDS must be a non-negative integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value > MAX_DRAIN_SECONDS {
                    return Err(ConfigError::InvalidDrainSeconds(format!(
                        "BUTLER_DRAIN_SECONDS must not exceed {} seconds, got {}",
                        MAX_DRAIN_SECONDS, value
                    )));
                }

                value
            }
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Config {
            database_url,
            bind_address,
            cognito_region,
            cognito_user_pool_id,
            cognito_client_id,
            cognito_client_secret,
            cognito_endpoint,
            key_set_url,
            token_issuer,
            jwt_clock_skew_seconds,
            cors_allowed_origins,
            drain_seconds,
        })
    }
}
