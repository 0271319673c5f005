//! Mock intent classifier for tests and offline runs.
//!
//! Scripted responses are consumed in order; once exhausted the mock
//! falls back to a default. Delays let tests drive timeouts.
//!
//! # Example
//!
//! ```ignore
//! let classifier = MockIntentClassifier::new()
//!     .with_classification(Classification::new(Intent::Help, Entities::new(), 0.9))
//!     .with_delay(Duration::from_secs(5));
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::nlp::{Classification, LocalClassifier};
use crate::ports::{ClassifierError, ClassifyRequest, IntentClassifier};

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockClassification {
    /// Return this classification.
    Success(Classification),
    /// Return this error.
    Error(ClassifierError),
    /// Sleep this long, then return the default.
    Hang(Duration),
}

/// Mock classifier with scripted responses.
#[derive(Debug, Clone)]
pub struct MockIntentClassifier {
    responses: Arc<Mutex<VecDeque<MockClassification>>>,
    delay: Duration,
    calls: Arc<Mutex<Vec<ClassifyRequest>>>,
}

impl Default for MockIntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockIntentClassifier {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a successful response to the queue.
    pub fn with_classification(self, classification: Classification) -> Self {
        lock(&self.responses).push_back(MockClassification::Success(classification));
        self
    }

    /// Adds an error response to the queue.
    pub fn with_error(self, error: ClassifierError) -> Self {
        lock(&self.responses).push_back(MockClassification::Error(error));
        self
    }

    /// Adds a response that sleeps before answering.
    pub fn with_hang(self, duration: Duration) -> Self {
        lock(&self.responses).push_back(MockClassification::Hang(duration));
        self
    }

    /// Sets simulated latency for every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of calls made.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns all recorded requests.
    pub fn calls(&self) -> Vec<ClassifyRequest> {
        lock(&self.calls).clone()
    }

    fn next_response(&self) -> Option<MockClassification> {
        lock(&self.responses).pop_front()
    }
}

#[async_trait]
impl IntentClassifier for MockIntentClassifier {
    async fn classify(&self, request: ClassifyRequest) -> Result<Classification, ClassifierError> {
        let text = request.text.clone();
        lock(&self.calls).push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        // The default answer is the local classifier's, so an unscripted
        // mock behaves like a plausible service.
        match self.next_response() {
            Some(MockClassification::Success(classification)) => Ok(classification),
            Some(MockClassification::Error(err)) => Err(err),
            Some(MockClassification::Hang(duration)) => {
                sleep(duration).await;
                Ok(LocalClassifier::new().classify(&text))
            }
            None => Ok(LocalClassifier::new().classify(&text)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
