//! Keyword classifier exposed through the port.
//!
//! Used when no external classifier is configured. It never fails, so the
//! breaker in front of it stays closed.

use async_trait::async_trait;

use crate::domain::nlp::{Classification, LocalClassifier};
use crate::ports::{ClassifierError, ClassifyRequest, IntentClassifier};

#[derive(Debug, Clone, Default)]
pub struct KeywordIntentClassifier {
    inner: LocalClassifier,
}

impl KeywordIntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IntentClassifier for KeywordIntentClassifier {
    async fn classify(&self, request: ClassifyRequest) -> Result<Classification, ClassifierError> {
        Ok(self.inner.classify(&request.text))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
