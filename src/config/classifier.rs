//! Intent classifier configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::HttpClassifierConfig;
use crate::application::NlpGatewayConfig;

/// External classifier settings.
///
/// Without an `endpoint` the local keyword classifier answers every query.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Classify endpoint URL
    pub endpoint: Option<String>,

    /// Bearer token for the classifier service
    pub api_key: Option<SecretString>,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Results below this confidence are treated as uncertain
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Recent queries sent along with each request
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// HTTP adapter settings, when an endpoint is configured.
    pub fn http_config(&self) -> Option<HttpClassifierConfig> {
        let endpoint = self.endpoint.as_ref()?;
        // Transport timeout sits above the gateway's so the gateway decides.
        let mut config =
            HttpClassifierConfig::new(endpoint.clone()).with_timeout(self.timeout() * 2);
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.clone());
        }
        Some(config)
    }

    pub fn gateway_config(&self, context_ttl: Duration) -> NlpGatewayConfig {
        NlpGatewayConfig {
            timeout: self.timeout(),
            confidence_threshold: self.confidence_threshold,
            context_window: self.context_window,
            context_ttl,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ValidationError::InvalidClassifierEndpoint);
            }
        }
        if self.timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout("classifier.timeout_ms"));
        }
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold <= 1.0) {
            return Err(ValidationError::InvalidConfidenceThreshold);
        }
        Ok(())
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_ms: default_timeout_ms(),
            confidence_threshold: default_confidence_threshold(),
            context_window: default_context_window(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_confidence_threshold() -> f32 {
    0.7
}

fn default_context_window() -> usize {
    3
}
