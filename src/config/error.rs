//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    #[error("Invalid timeout for {0}")]
    InvalidTimeout(&'static str),

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Invalid classifier endpoint, expected http:// or https://")]
    InvalidClassifierEndpoint,

    #[error("Confidence threshold must be in (0, 1]")]
    InvalidConfidenceThreshold,

    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("{0} must be between 0 and 1")]
    InvalidRatio(&'static str),

    #[error("minimal_{0} must not be below degraded_{0}")]
    ThresholdOrder(&'static str),

    #[error("Invalid degradation level: {0}")]
    InvalidLevel(String),
}
