//! Service settings loaded once at startup
//!
//! Everything here is read from the process environment through the `config`
//! crate. Validation is eager: a missing or short signing secret stops the
//! process before the listener is bound.

use std::fmt;

use config::{Config, Environment};
use serde::Deserialize;
use thiserror::Error;

/// Minimum number of characters accepted for the session signing secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Cron expression for the rate-limit sweep: every 10 minutes
pub const DEFAULT_SWEEP_SCHEDULE: &str = "0 */10 * * * *";

/// Errors raised while loading settings. All of them are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("SESSION_SECRET environment variable not set")]
    MissingSecret,

    #[error("SESSION_SECRET must be at least 32 characters long")]
    SecretTooShort,

    #[error("Unknown APP_ENV value: {0}")]
    UnknownEnvironment(String),

    #[error("Unknown RATE_LIMIT_BACKEND value: {0}")]
    UnknownBackend(String),

    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}

/// Symmetric secret used to sign session credentials.
///
/// Can only be constructed from a value of at least [`MIN_SECRET_LENGTH`]
/// characters.
#[derive(Clone)]
pub struct SessionSecret(String);

impl SessionSecret {
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        if value.chars().count() < MIN_SECRET_LENGTH {
            return Err(ConfigError::SecretTooShort);
        }

        Ok(Self(value))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret(***)")
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Where rate-limit counters live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBackend {
    /// Process-local map; correct for a single instance only
    Memory,
    /// Shared Redis counters for multi-instance deployments
    Redis,
}

impl RateLimitBackend {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    session_secret: Option<String>,
    app_env: String,
    bind_address: String,
    rate_limit_backend: String,
    rate_limit_sweep_schedule: String,
}

/// Validated service settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub session_secret: SessionSecret,
    pub environment: AppEnvironment,
    pub bind_address: String,
    pub rate_limit_backend: RateLimitBackend,
    pub sweep_schedule: String,
}

impl Settings {
    /// Load settings from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_SECRET`: session signing secret, at least 32 characters (required)
    /// - `APP_ENV`: `development` or `production` (default: development)
    /// - `BIND_ADDRESS`: listen address (default: 0.0.0.0:3000)
    /// - `RATE_LIMIT_BACKEND`: `memory` or `redis` (default: memory)
    /// - `RATE_LIMIT_SWEEP_SCHEDULE`: cron expression (default: every 10 minutes)
    pub fn load() -> Result<Self, ConfigError> {
        let raw: RawSettings = Config::builder()
            .set_default("app_env", "development")?
            .set_default("bind_address", "0.0.0.0:3000")?
            .set_default("rate_limit_backend", "memory")?
            .set_default("rate_limit_sweep_schedule", DEFAULT_SWEEP_SCHEDULE)?
            .add_source(Environment::default())
            .build()?
            .try_deserialize()?;

        let session_secret = SessionSecret::new(raw.session_secret.unwrap_or_default())?;

        Ok(Settings {
            session_secret,
            environment: AppEnvironment::parse(&raw.app_env)?,
            bind_address: raw.bind_address,
            rate_limit_backend: RateLimitBackend::parse(&raw.rate_limit_backend)?,
            sweep_schedule: raw.rate_limit_sweep_schedule,
        })
    }

    /// Cookies carry `Secure` in production only
    pub fn secure_cookies(&self) -> bool {
        self.environment == AppEnvironment::Production
    }
}
