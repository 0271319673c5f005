//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `FUELBOT` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use fuelbot::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod classifier;
mod error;
mod features;
mod redis;
mod resilience;
mod server;
mod session;

pub use classifier::ClassifierConfig;
pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use resilience::ResilienceConfig;
pub use server::{Environment, ServerConfig};
pub use session::SessionConfig;
pub use self::redis::RedisConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a working
/// single-process setup with in-memory storage and the local classifier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Redis for sessions and rate limits; in-memory when absent
    pub redis: Option<RedisConfig>,

    /// Session, context and wizard lifetimes
    #[serde(default)]
    pub session: SessionConfig,

    /// External intent classifier
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Circuit breaker, rate limits and degradation thresholds
    #[serde(default)]
    pub resilience: ResilienceConfig,

    /// Feature flags
    #[serde(default)]
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `FUELBOT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `FUELBOT__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `FUELBOT__REDIS__URL=...` -> `redis.url = ...`
    /// - `FUELBOT__CLASSIFIER__API_KEY=...` -> `classifier.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("FUELBOT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid value found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(redis) = &self.redis {
            redis.validate()?;
        }
        self.session.validate()?;
        self.classifier.validate()?;
        self.resilience.validate()?;
        self.features.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
