//! Degradation levels and the feature flags each level implies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Process-wide operating mode.
///
/// Ordered by severity, so `max` picks the worse of two levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DegradationLevel {
    #[default]
    Normal,
    Degraded,
    Minimal,
}

impl DegradationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradationLevel::Normal => "normal",
            DegradationLevel::Degraded => "degraded",
            DegradationLevel::Minimal => "minimal",
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            DegradationLevel::Normal => 0,
            DegradationLevel::Degraded => 1,
            DegradationLevel::Minimal => 2,
        }
    }

    /// Inverse of [`as_u8`](Self::as_u8); unknown values map to `Minimal`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => DegradationLevel::Normal,
            1 => DegradationLevel::Degraded,
            _ => DegradationLevel::Minimal,
        }
    }

    /// Features available at this level.
    pub fn features(&self) -> FeatureSet {
        FeatureSet::for_level(*self)
    }
}

impl fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DegradationLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(DegradationLevel::Normal),
            "degraded" => Ok(DegradationLevel::Degraded),
            "minimal" => Ok(DegradationLevel::Minimal),
            other => Err(ValidationError::invalid_format(
                "degradation_level",
                format!("expected normal, degraded or minimal, got '{}'", other),
            )),
        }
    }
}

/// Non-essential features that degradation can switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Free-text classification through the external classifier.
    Nlp,
    /// Aggregate statistics.
    Analytics,
    /// Reduced per-user request rate.
    SlowMode,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Nlp => "nlp",
            Feature::Analytics => "analytics",
            Feature::SlowMode => "slow_mode",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Feature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nlp" => Ok(Feature::Nlp),
            "analytics" => Ok(Feature::Analytics),
            "slow_mode" | "slowmode" => Ok(Feature::SlowMode),
            other => Err(ValidationError::invalid_format(
                "feature",
                format!("unknown feature '{}'", other),
            )),
        }
    }
}

/// Flag set associated with a degradation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub nlp_enabled: bool,
    pub analytics_enabled: bool,
    pub slow_mode_enabled: bool,
}

impl FeatureSet {
    /// Normal runs everything. Degraded drops analytics but keeps NLP so
    /// the classifier's local fallback still answers. Minimal drops NLP
    /// too and throttles users.
    pub fn for_level(level: DegradationLevel) -> Self {
        match level {
            DegradationLevel::Normal => Self {
                nlp_enabled: true,
                analytics_enabled: true,
                slow_mode_enabled: false,
            },
            DegradationLevel::Degraded => Self {
                nlp_enabled: true,
                analytics_enabled: false,
                slow_mode_enabled: false,
            },
            DegradationLevel::Minimal => Self {
                nlp_enabled: false,
                analytics_enabled: false,
                slow_mode_enabled: true,
            },
        }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::Nlp => self.nlp_enabled,
            Feature::Analytics => self.analytics_enabled,
            Feature::SlowMode => self.slow_mode_enabled,
        }
    }
}
