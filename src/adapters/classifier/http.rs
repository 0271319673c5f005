//! HTTP intent classifier.
//!
//! Posts `ClassifyRequest` as JSON to a configured endpoint and reads back
//! `{intent, entities, confidence}`. Intents the service invents map to
//! `Unknown`.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::nlp::{Classification, Entities, Intent};
use crate::ports::{ClassifierError, ClassifyRequest, IntentClassifier};

/// Configuration for the HTTP classifier.
#[derive(Debug, Clone)]
pub struct HttpClassifierConfig {
    /// Full URL of the classify endpoint.
    pub endpoint: String,
    /// Bearer token, if the service requires one.
    api_key: Option<Secret<String>>,
    /// Transport-level timeout. The gateway applies its own, shorter one.
    pub timeout: Duration,
}

impl HttpClassifierConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_api_key(mut self, api_key: Secret<String>) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Wire format of a classifier response.
#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    intent: String,
    #[serde(default)]
    entities: Entities,
    confidence: f32,
}

/// Classifier backed by an HTTP service.
pub struct HttpIntentClassifier {
    config: HttpClassifierConfig,
    client: Client,
}

impl HttpIntentClassifier {
    pub fn new(config: HttpClassifierConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassifierError::Unavailable(format!("failed to build client: {}", e)))?;
        Ok(Self { config, client })
    }

    async fn handle_response_status(&self, response: Response) -> Result<Response, ClassifierError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ClassifierError::AuthenticationFailed)
            }
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => Err(
                ClassifierError::Unavailable(format!("status {}: {}", status, body)),
            ),
            _ => Err(ClassifierError::InvalidResponse(format!(
                "status {}: {}",
                status, body
            ))),
        }
    }
}

#[async_trait]
impl IntentClassifier for HttpIntentClassifier {
    async fn classify(&self, request: ClassifyRequest) -> Result<Classification, ClassifierError> {
        let mut builder = self.client.post(&self.config.endpoint).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                ClassifierError::Unavailable(e.to_string())
            }
        })?;

        let response = self.handle_response_status(response).await?;
        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;

        Ok(Classification::new(
            Intent::parse_lenient(&body.intent),
            body.entities,
            body.confidence,
        ))
    }

    fn name(&self) -> &str {
        "http"
    }
}

impl std::fmt::Debug for HttpIntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIntentClassifier")
            .field("endpoint", &self.config.endpoint)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_sets_fields() {
        let config = HttpClassifierConfig::new("https://nlp.internal/classify")
            .with_timeout(Duration::from_millis(1500))
            .with_api_key(Secret::new("k".to_string()));
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert!(config.api_key.is_some());
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = HttpClassifierConfig::new("https://nlp.internal/classify")
            .with_api_key(Secret::new("super-secret".to_string()));
        let classifier = HttpIntentClassifier::new(config).unwrap();
        assert!(!format!("{:?}", classifier).contains("super-secret"));
    }

    #[test]
    fn response_with_unknown_intent_parses() {
        let body: ClassifyResponse =
            serde_json::from_str(r#"{"intent":"book_flight","confidence":0.8}"#).unwrap();
        assert_eq!(Intent::parse_lenient(&body.intent), Intent::Unknown);
        assert!(body.entities.is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let config = HttpClassifierConfig::new("http://127.0.0.1:9/classify")
            .with_timeout(Duration::from_millis(500));
        let classifier = HttpIntentClassifier::new(config).unwrap();

        let err = classifier
            .classify(ClassifyRequest::new("diesel price"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::Unavailable(_) | ClassifierError::Timeout { .. }
        ));
    }
}
