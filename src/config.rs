//! Centralized configuration for Session Service.
//!
//! All configuration is loaded from environment variables and validated at
//! startup. Token secrets have no defaults; a missing secret is a startup
//! error, never a signing-time one.

use crate::error::TokenError;
use std::env;
use std::time::Duration;

/// Session Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // JWT settings
    /// Secret for the access token namespace
    pub access_token_secret: String,
    /// Secret for the refresh token namespace
    pub refresh_token_secret: String,
    /// JWT issuer claim
    pub jwt_issuer: String,
    /// JWT audience claim
    pub jwt_audience: String,
    /// Access token TTL
    pub access_token_ttl: Duration,
    /// Refresh token TTL
    pub refresh_token_ttl: Duration,

    // Store settings
    /// Upper bound on any single store call
    pub store_timeout: Duration,
    /// Interval between expiry sweep passes
    pub sweep_interval: Duration,
    /// Maximum records deleted per sweep batch
    pub sweep_batch_size: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();

        let access_token_secret = require_env("ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = require_env("REFRESH_TOKEN_SECRET")?;

        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "auth-platform".to_string());
        let jwt_audience = env::var("JWT_AUDIENCE").unwrap_or_else(|_| "api".to_string());

        let access_token_ttl = Duration::from_secs(parse_env("ACCESS_TOKEN_TTL", 900)?);
        let refresh_token_ttl = Duration::from_secs(parse_env("REFRESH_TOKEN_TTL", 604_800)?);

        let store_timeout = Duration::from_secs(parse_env("STORE_TIMEOUT", 5)?);
        let sweep_interval = Duration::from_secs(parse_env("SWEEP_INTERVAL", 3600)?);
        let sweep_batch_size = parse_env("SWEEP_BATCH_SIZE", 500)?;

        let config = Self {
            access_token_secret,
            refresh_token_secret,
            jwt_issuer,
            jwt_audience,
            access_token_ttl,
            refresh_token_ttl,
            store_timeout,
            sweep_interval,
            sweep_batch_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if the secrets are shared between namespaces or a
    /// duration is zero.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.access_token_secret == self.refresh_token_secret {
            return Err(TokenError::config(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ",
            ));
        }
        if self.access_token_ttl.is_zero() || self.refresh_token_ttl.is_zero() {
            return Err(TokenError::config("token TTLs must be non-zero"));
        }
        if self.sweep_batch_size == 0 {
            return Err(TokenError::config("SWEEP_BATCH_SIZE must be non-zero"));
        }
        Ok(())
    }
}

/// Read a required environment variable, rejecting empty values.
fn require_env(name: &str) -> Result<String, TokenError> {
    match env::var(name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(TokenError::config(format!("{} must be set", name))),
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, TokenError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
