//! Degradation vocabulary shared by the controller and the router.

mod level;

pub use level::{DegradationLevel, Feature, FeatureSet};
