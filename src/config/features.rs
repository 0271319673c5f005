//! Feature flags configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::resilience::DegradationLevel;

/// Operator switches for optional features.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    /// Allow free-text classification
    #[serde(default = "default_true")]
    pub nlp_enabled: bool,

    /// Allow aggregate statistics
    #[serde(default = "default_true")]
    pub analytics_enabled: bool,

    /// Pin the service level at start-up (`normal`, `degraded` or `minimal`)
    pub forced_level: Option<String>,
}

impl FeatureFlags {
    pub fn forced_level(&self) -> Result<Option<DegradationLevel>, ValidationError> {
        self.forced_level
            .as_deref()
            .map(|raw| {
                raw.parse::<DegradationLevel>()
                    .map_err(|_| ValidationError::InvalidLevel(raw.to_string()))
            })
            .transpose()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.forced_level().map(|_| ())
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            nlp_enabled: true,
            analytics_enabled: true,
            forced_level: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_flags_defaults() {
        let flags = FeatureFlags::default();
        assert!(flags.nlp_enabled);
        assert!(flags.analytics_enabled);
        assert_eq!(flags.forced_level().unwrap(), None);
    }

    #[test]
    fn test_feature_flags_deserialization() {
        let json = r#"{
            "nlp_enabled": false,
            "forced_level": "Degraded"
        }"#;

        let flags: FeatureFlags = serde_json::from_str(json).unwrap();
        assert!(!flags.nlp_enabled);
        assert!(flags.analytics_enabled);
        assert_eq!(flags.forced_level().unwrap(), Some(DegradationLevel::Degraded));
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let flags = FeatureFlags {
            forced_level: Some("panic".to_string()),
            ..Default::default()
        };
        assert_eq!(
            flags.validate(),
            Err(ValidationError::InvalidLevel("panic".to_string()))
        );
    }
}
