//! Intent classifier adapters.
//!
//! - `HttpIntentClassifier` - JSON over HTTP via `reqwest`
//! - `KeywordIntentClassifier` - local keyword rules, no network
//! - `MockIntentClassifier` - scripted responses for tests

mod http;
mod local;
mod mock;

pub use http::{HttpClassifierConfig, HttpIntentClassifier};
pub use local::KeywordIntentClassifier;
pub use mock::{MockClassification, MockIntentClassifier};
