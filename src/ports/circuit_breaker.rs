//! CircuitBreaker port - Interface for external dependency resilience.
//!
//! The circuit breaker stops calling a dependency that keeps failing and
//! probes it again after a cool-down.
//!
//! ## States
//!
//! - **Closed**: Normal operation, calls flow through
//! - **Open**: Too many consecutive failures, calls rejected immediately
//! - **Half-Open**: Cool-down elapsed, a limited number of probe calls allowed
//!
//! ## Transitions
//!
//! ```text
//! Closed --[failure_threshold consecutive failures]--> Open
//! Open --[cool_down elapsed]--> Half-Open
//! Half-Open --[success_threshold successes]--> Closed
//! Half-Open --[any failure]--> Open (fresh cool-down)
//! ```

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::domain::foundation::StateMachine;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - calls flow through to the dependency.
    Closed,

    /// Calls rejected immediately without touching the dependency.
    /// Moves to HalfOpen once the cool-down has elapsed.
    Open,

    /// Probing whether the dependency recovered.
    /// Success → Closed, Failure → Open.
    HalfOpen,
}

impl CircuitState {
    /// Check if the circuit allows calls through.
    pub fn allows_requests(&self) -> bool {
        matches!(self, CircuitState::Closed | CircuitState::HalfOpen)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for CircuitState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use CircuitState::*;
        matches!(
            (self, target),
            (Closed, Open) | (Open, HalfOpen) | (HalfOpen, Closed) | (HalfOpen, Open)
                // administrative reset
                | (Open, Closed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use CircuitState::*;
        match self {
            Closed => vec![Open],
            Open => vec![HalfOpen, Closed],
            HalfOpen => vec![Closed, Open],
        }
    }
}

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit.
    ///
    /// Default: 5 failures
    pub failure_threshold: u32,

    /// Time to stay open before allowing a probe.
    ///
    /// Default: 60 seconds
    pub cool_down: Duration,

    /// Number of probe successes needed to close the circuit.
    ///
    /// Default: 1 success
    pub success_threshold: u32,

    /// Maximum in-flight probe calls while half-open.
    ///
    /// Default: 1 request at a time
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(60),
            success_threshold: 1,
            half_open_max_requests: 1,
        }
    }
}

/// Port for circuit breaker functionality.
///
/// Generic over the protected dependency; wrap calls with [`execute`] or
/// drive `try_acquire`/`record_*` by hand.
pub trait CircuitBreaker: Send + Sync {
    /// Name of the protected dependency, used in logs and events.
    fn name(&self) -> &str;

    /// Get the current state of the circuit.
    ///
    /// Reports `HalfOpen` once an open circuit's cool-down has elapsed.
    fn state(&self) -> CircuitState;

    /// Asks permission for one call.
    ///
    /// Returns `false` while open, and while half-open once the probe
    /// slots are taken. A `true` must be followed by exactly one
    /// `record_success` or `record_failure`.
    fn try_acquire(&self) -> bool;

    /// Record a successful call.
    fn record_success(&self);

    /// Record a failed call.
    fn record_failure(&self);

    /// Force the circuit closed with zero failures.
    ///
    /// Use sparingly - typically for administrative intervention.
    fn reset(&self);

    /// Get metrics about the circuit breaker.
    fn metrics(&self) -> CircuitBreakerMetrics;
}

/// Receives breaker state changes.
pub trait CircuitBreakerObserver: Send + Sync {
    /// Called after the breaker named `breaker` moved from `from` to `to`.
    fn on_state_change(&self, breaker: &str, from: CircuitState, to: CircuitState);
}

/// Metrics about circuit breaker behavior.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CircuitBreakerMetrics {
    /// Current state
    pub state: Option<CircuitState>,

    /// Total successful calls since creation
    pub total_successes: u64,

    /// Total failed calls since creation
    pub total_failures: u64,

    /// Calls rejected without reaching the dependency
    pub total_rejected: u64,

    /// Times the circuit has opened
    pub times_opened: u64,

    /// Current consecutive failure count
    pub current_failures: u32,

    /// Current success count (in half-open state)
    pub current_successes: u32,

    /// Time until circuit transitions to half-open (when open)
    pub time_until_half_open: Option<Duration>,
}

/// Outcome of a call made through a breaker.
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    /// The breaker rejected the call; the operation was not invoked.
    #[error("circuit breaker '{0}' is open")]
    Open(String),

    /// The operation ran and failed.
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open(_))
    }
}

/// Runs `operation` through `breaker`.
///
/// The operation is not invoked when the breaker rejects the call. Its
/// `Ok`/`Err` is recorded as success/failure. Dropping the returned future
/// after admission (a caller timeout, a cancelled request) records a failure.
pub async fn execute<T, E, F, Fut>(
    breaker: &dyn CircuitBreaker,
    operation: F,
) -> Result<T, BreakerError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if !breaker.try_acquire() {
        return Err(BreakerError::Open(breaker.name().to_string()));
    }

    let call = AdmittedCall::new(breaker);
    match operation().await {
        Ok(value) => {
            call.succeeded();
            Ok(value)
        }
        Err(err) => {
            call.failed();
            Err(BreakerError::Inner(err))
        }
    }
}

/// An admitted call that has not reported its outcome yet.
///
/// Records a failure when dropped unsettled.
struct AdmittedCall<'a> {
    breaker: &'a dyn CircuitBreaker,
    settled: bool,
}

impl<'a> AdmittedCall<'a> {
    fn new(breaker: &'a dyn CircuitBreaker) -> Self {
        Self {
            breaker,
            settled: false,
        }
    }

    fn succeeded(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    fn failed(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for AdmittedCall<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(breaker = %self.breaker.name(), "call abandoned, counted as failure");
            self.breaker.record_failure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn circuit_state_allows_requests() {
        assert!(CircuitState::Closed.allows_requests());
        assert!(CircuitState::HalfOpen.allows_requests());
        assert!(!CircuitState::Open.allows_requests());
    }

    #[test]
    fn default_config_values() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.cool_down, Duration::from_secs(60));
        assert_eq!(config.success_threshold, 1);
        assert_eq!(config.half_open_max_requests, 1);
    }

    #[test]
    fn closed_cannot_jump_to_half_open() {
        assert!(!CircuitState::Closed.can_transition_to(&CircuitState::HalfOpen));
        assert!(CircuitState::HalfOpen.can_transition_to(&CircuitState::Open));
    }

    /// Breaker that admits or rejects everything and counts records.
    struct FixedBreaker {
        allow: bool,
        successes: AtomicU32,
        failures: AtomicU32,
    }

    impl FixedBreaker {
        fn new(allow: bool) -> Self {
            Self {
                allow,
                successes: AtomicU32::new(0),
                failures: AtomicU32::new(0),
            }
        }
    }

    impl CircuitBreaker for FixedBreaker {
        fn name(&self) -> &str {
            "fixed"
        }
        fn state(&self) -> CircuitState {
            if self.allow {
                CircuitState::Closed
            } else {
                CircuitState::Open
            }
        }
        fn try_acquire(&self) -> bool {
            self.allow
        }
        fn record_success(&self) {
            self.successes.fetch_add(1, Ordering::SeqCst);
        }
        fn record_failure(&self) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        fn reset(&self) {}
        fn metrics(&self) -> CircuitBreakerMetrics {
            CircuitBreakerMetrics::default()
        }
    }

    #[tokio::test]
    async fn execute_records_outcomes() {
        let breaker = FixedBreaker::new(true);

        let ok: Result<u8, BreakerError<&str>> = execute(&breaker, || async { Ok(1) }).await;
        assert_eq!(ok.unwrap(), 1);

        let err: Result<u8, BreakerError<&str>> = execute(&breaker, || async { Err("boom") }).await;
        assert!(matches!(err, Err(BreakerError::Inner("boom"))));

        assert_eq!(breaker.successes.load(Ordering::SeqCst), 1);
        assert_eq!(breaker.failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn execute_skips_operation_when_open() {
        let breaker = FixedBreaker::new(false);
        let invoked = AtomicU32::new(0);

        let result: Result<(), BreakerError<()>> = execute(&breaker, || async {
            invoked.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(result.unwrap_err().is_open());
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert_eq!(breaker.failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn abandoned_call_counts_as_failure() {
        let breaker = FixedBreaker::new(true);

        let result = tokio::time::timeout(
            Duration::from_millis(10),
            execute(&breaker, || std::future::pending::<Result<(), ()>>()),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(breaker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(breaker.successes.load(Ordering::SeqCst), 0);
    }
}
