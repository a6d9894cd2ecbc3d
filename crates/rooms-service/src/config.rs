//! Rooms service configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! redacted in Debug output.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default JWKS endpoint of the identity provider.
pub const DEFAULT_JWKS_URL: &str = "http://localhost:8082/.well-known/jwks.json";

/// Default provider whose `rooms_configurations` rows apply.
pub const DEFAULT_PROVIDER: &str = "default";

/// Default upper bound for an uploaded presentation (30 MiB).
pub const DEFAULT_MAX_PRESENTATION_BYTES: usize = 30 * 1024 * 1024;

/// Rooms service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// JWKS endpoint used to verify bearer tokens.
    pub jwks_url: String,

    /// JWT clock skew tolerance in seconds.
    pub jwt_clock_skew_seconds: u64,

    /// Provider name used to select `rooms_configurations` overrides.
    pub provider: String,

    /// Maximum decoded size of a presentation upload.
    pub max_presentation_bytes: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("jwks_url", &self.jwks_url)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("provider", &self.provider)
            .field("max_presentation_bytes", &self.max_presentation_bytes)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid presentation size limit: {0}")]
    InvalidPresentationLimit(String),

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwks_url = vars
            .get("AUTH_JWKS_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_JWKS_URL.to_string());

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

            let value = value.unsigned_abs();
            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs()
        };

        let provider = match vars.get("ROOMS_PROVIDER") {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::InvalidProvider(
                    "ROOMS_PROVIDER must not be empty".to_string(),
                ));
            }
            Some(value) => value.trim().to_string(),
            None => DEFAULT_PROVIDER.to_string(),
        };

        let max_presentation_bytes =
            if let Some(value_str) = vars.get("MAX_PRESENTATION_BYTES") {
                let value: usize = value_str.parse().map_err(|e| {
                    ConfigError::InvalidPresentationLimit(format!(
                        "MAX_PRESENTATION_BYTES must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidPresentationLimit(
                        "MAX_PRESENTATION_BYTES must be greater than 0".to_string(),
                    ));
                }

                value
            } else {
                DEFAULT_MAX_PRESENTATION_BYTES
            };

        Ok(Config {
            database_url,
            bind_address,
            jwks_url,
            jwt_clock_skew_seconds,
            provider,
            max_presentation_bytes,
        })
    }

    /// Request body limit for the API.
    ///
    /// Presentations travel base64-encoded inside JSON, which inflates them
    /// by a third, plus room for the surrounding fields.
    pub fn max_request_body_bytes(&self) -> usize {
        self.max_presentation_bytes
            .saturating_mul(4)
            .saturating_div(3)
            .saturating_add(64 * 1024)
    }
}
