//! DegradationController - process-wide operating level and feature flags.
//!
//! The level is derived from health signals (breaker state changes, load
//! ratio, classifier latency) and can be pinned by an operator. Reads are a
//! single atomic load, so the router can consult it on every dispatch.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::domain::resilience::{DegradationLevel, Feature, FeatureSet};
use crate::ports::{CircuitBreakerObserver, CircuitState};

/// Smoothing factor for the latency moving average.
const LATENCY_EWMA_ALPHA: f64 = 0.2;

/// Thresholds and base toggles for the controller.
#[derive(Debug, Clone)]
pub struct DegradationConfig {
    /// Load ratio at or above which the level is at least `Degraded`.
    pub degraded_load_ratio: f64,
    /// Load ratio at or above which the level is `Minimal`.
    pub minimal_load_ratio: f64,
    /// Average classifier latency at or above which the level is at least `Degraded`.
    pub degraded_latency: Duration,
    /// Average classifier latency at or above which the level is `Minimal`.
    pub minimal_latency: Duration,
    /// Operator switch; when false NLP stays off at every level.
    pub nlp_enabled: bool,
    /// Operator switch; when false analytics stays off at every level.
    pub analytics_enabled: bool,
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            degraded_load_ratio: 0.75,
            minimal_load_ratio: 0.95,
            degraded_latency: Duration::from_millis(2_000),
            minimal_latency: Duration::from_millis(5_000),
            nlp_enabled: true,
            analytics_enabled: true,
        }
    }
}

#[derive(Debug, Default)]
struct Signals {
    unhealthy_breakers: BTreeSet<String>,
    load_ratio: f64,
    latency_ewma_ms: Option<f64>,
    forced: Option<DegradationLevel>,
}

/// Point-in-time view for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct DegradationSnapshot {
    pub level: DegradationLevel,
    pub forced: Option<DegradationLevel>,
    pub features: FeatureSet,
    pub unhealthy_breakers: Vec<String>,
    pub load_ratio: f64,
    pub latency_ewma_ms: Option<f64>,
}

/// Holds the current degradation level and answers feature queries.
pub struct DegradationController {
    config: DegradationConfig,
    level: AtomicU8,
    signals: Mutex<Signals>,
}

impl DegradationController {
    pub fn new(config: DegradationConfig) -> Self {
        Self {
            config,
            level: AtomicU8::new(DegradationLevel::Normal.as_u8()),
            signals: Mutex::new(Signals::default()),
        }
    }

    /// Current effective level.
    pub fn level(&self) -> DegradationLevel {
        DegradationLevel::from_u8(self.level.load(Ordering::Acquire))
    }

    /// Flags at the current level, masked by the operator switches.
    pub fn features(&self) -> FeatureSet {
        let mut features = self.level().features();
        features.nlp_enabled &= self.config.nlp_enabled;
        features.analytics_enabled &= self.config.analytics_enabled;
        features
    }

    pub fn is_feature_enabled(&self, feature: Feature) -> bool {
        self.features().is_enabled(feature)
    }

    pub fn is_slow_mode_enabled(&self) -> bool {
        self.is_feature_enabled(Feature::SlowMode)
    }

    /// Pins the level regardless of health signals.
    pub fn force_level(&self, level: DegradationLevel) {
        self.update(|signals| signals.forced = Some(level));
    }

    /// Returns control of the level to the health signals.
    pub fn clear_override(&self) {
        self.update(|signals| signals.forced = None);
    }

    /// Reports active conversations over capacity, clamped to `0..=1`.
    pub fn report_load(&self, active: usize, capacity: usize) {
        let ratio = if capacity == 0 {
            1.0
        } else {
            (active as f64 / capacity as f64).clamp(0.0, 1.0)
        };
        self.update(|signals| signals.load_ratio = ratio);
    }

    /// Folds one classifier latency sample into the moving average.
    pub fn report_latency(&self, latency: Duration) {
        let sample = latency.as_secs_f64() * 1_000.0;
        self.update(|signals| {
            signals.latency_ewma_ms = Some(match signals.latency_ewma_ms {
                Some(avg) => LATENCY_EWMA_ALPHA * sample + (1.0 - LATENCY_EWMA_ALPHA) * avg,
                None => sample,
            });
        });
    }

    pub fn snapshot(&self) -> DegradationSnapshot {
        let signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        DegradationSnapshot {
            level: self.level(),
            forced: signals.forced,
            features: self.features(),
            unhealthy_breakers: signals.unhealthy_breakers.iter().cloned().collect(),
            load_ratio: signals.load_ratio,
            latency_ewma_ms: signals.latency_ewma_ms,
        }
    }

    fn update(&self, apply: impl FnOnce(&mut Signals)) {
        let (from, to) = {
            let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
            apply(&mut signals);
            let to = signals.forced.unwrap_or_else(|| self.derive_level(&signals));
            let from = DegradationLevel::from_u8(self.level.swap(to.as_u8(), Ordering::AcqRel));
            (from, to)
        };

        if from != to {
            tracing::info!(from = %from, to = %to, "degradation level changed");
        }
    }

    fn derive_level(&self, signals: &Signals) -> DegradationLevel {
        let from_breakers = if signals.unhealthy_breakers.is_empty() {
            DegradationLevel::Normal
        } else {
            DegradationLevel::Degraded
        };

        let from_load = if signals.load_ratio >= self.config.minimal_load_ratio {
            DegradationLevel::Minimal
        } else if signals.load_ratio >= self.config.degraded_load_ratio {
            DegradationLevel::Degraded
        } else {
            DegradationLevel::Normal
        };

        let from_latency = match signals.latency_ewma_ms {
            Some(ms) if ms >= self.config.minimal_latency.as_secs_f64() * 1_000.0 => {
                DegradationLevel::Minimal
            }
            Some(ms) if ms >= self.config.degraded_latency.as_secs_f64() * 1_000.0 => {
                DegradationLevel::Degraded
            }
            _ => DegradationLevel::Normal,
        };

        from_breakers.max(from_load).max(from_latency)
    }
}

impl Default for DegradationController {
    fn default() -> Self {
        Self::new(DegradationConfig::default())
    }
}

impl CircuitBreakerObserver for DegradationController {
    fn on_state_change(&self, breaker: &str, _from: CircuitState, to: CircuitState) {
        self.update(|signals| match to {
            CircuitState::Closed => {
                signals.unhealthy_breakers.remove(breaker);
            }
            CircuitState::Open | CircuitState::HalfOpen => {
                signals.unhealthy_breakers.insert(breaker.to_string());
            }
        });
    }
}

impl std::fmt::Debug for DegradationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradationController")
            .field("level", &self.level())
            .finish()
    }
}
