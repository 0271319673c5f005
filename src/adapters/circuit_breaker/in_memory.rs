//! In-process circuit breaker.
//!
//! All state lives behind one mutex so counter updates and state changes
//! are observed atomically by concurrent callers. Observers are notified
//! after the lock is released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::foundation::{StateMachine, Timestamp};
use crate::ports::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitBreakerObserver,
    CircuitState, Clock,
};

/// Circuit breaker keeping its state in memory.
pub struct InMemoryCircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerInner>,
    observers: Vec<Arc<dyn CircuitBreakerObserver>>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    half_open_in_flight: u32,
    opened_at: Option<Timestamp>,
    last_failure_at: Option<Timestamp>,
    last_transition_at: Timestamp,
    total_successes: u64,
    total_failures: u64,
    total_rejected: u64,
    times_opened: u64,
}

type Transition = (CircuitState, CircuitState);

impl BreakerInner {
    fn new(now: Timestamp) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            half_open_successes: 0,
            half_open_in_flight: 0,
            opened_at: None,
            last_failure_at: None,
            last_transition_at: now,
            total_successes: 0,
            total_failures: 0,
            total_rejected: 0,
            times_opened: 0,
        }
    }

    fn move_to(&mut self, to: CircuitState, now: Timestamp, log: &mut Vec<Transition>) {
        let from = self.state;
        if from == to {
            return;
        }
        if let Err(err) = from.transition_to(to) {
            tracing::error!(error = %err, "circuit breaker transition refused");
            return;
        }
        self.state = to;
        self.last_transition_at = now;
        match to {
            CircuitState::Open => {
                self.opened_at = Some(now);
                self.times_opened += 1;
                self.half_open_in_flight = 0;
                self.half_open_successes = 0;
            }
            CircuitState::HalfOpen => {
                self.half_open_in_flight = 0;
                self.half_open_successes = 0;
            }
            CircuitState::Closed => {
                self.opened_at = None;
                self.consecutive_failures = 0;
                self.half_open_in_flight = 0;
                self.half_open_successes = 0;
            }
        }
        log.push((from, to));
    }
}

impl InMemoryCircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(BreakerInner::new(now)),
            observers: Vec::new(),
        }
    }

    /// Registers an observer for state changes.
    pub fn with_observer(mut self, observer: Arc<dyn CircuitBreakerObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Time of the most recent failure, if any.
    pub fn last_failure_at(&self) -> Option<Timestamp> {
        self.lock().last_failure_at
    }

    /// Time of the most recent state change.
    pub fn last_transition_at(&self) -> Timestamp {
        self.lock().last_transition_at
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cool_down_elapsed(&self, inner: &BreakerInner, now: Timestamp) -> bool {
        inner
            .opened_at
            .is_some_and(|opened| !now.is_before(&opened.plus(self.config.cool_down)))
    }

    /// Moves Open to HalfOpen once the cool-down has elapsed.
    fn refresh(&self, inner: &mut BreakerInner, now: Timestamp, log: &mut Vec<Transition>) {
        if inner.state == CircuitState::Open && self.cool_down_elapsed(inner, now) {
            inner.move_to(CircuitState::HalfOpen, now, log);
        }
    }

    fn notify(&self, transitions: Vec<Transition>) {
        for (from, to) in transitions {
            match to {
                CircuitState::Open => tracing::warn!(
                    breaker = %self.name,
                    from = %from,
                    to = %to,
                    "circuit breaker opened"
                ),
                _ => tracing::info!(
                    breaker = %self.name,
                    from = %from,
                    to = %to,
                    "circuit breaker state changed"
                ),
            }
            for observer in &self.observers {
                observer.on_state_change(&self.name, from, to);
            }
        }
    }
}

impl CircuitBreaker for InMemoryCircuitBreaker {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> CircuitState {
        let now = self.clock.now();
        let mut log = Vec::new();
        let state = {
            let mut inner = self.lock();
            self.refresh(&mut inner, now, &mut log);
            inner.state
        };
        self.notify(log);
        state
    }

    fn try_acquire(&self) -> bool {
        let now = self.clock.now();
        let mut log = Vec::new();
        let allowed = {
            let mut inner = self.lock();
            self.refresh(&mut inner, now, &mut log);
            let allowed = match inner.state {
                CircuitState::Closed => true,
                CircuitState::Open => false,
                CircuitState::HalfOpen => {
                    if inner.half_open_in_flight < self.config.half_open_max_requests {
                        inner.half_open_in_flight += 1;
                        true
                    } else {
                        false
                    }
                }
            };
            if !allowed {
                inner.total_rejected += 1;
            }
            allowed
        };
        self.notify(log);
        allowed
    }

    fn record_success(&self) {
        let now = self.clock.now();
        let mut log = Vec::new();
        {
            let mut inner = self.lock();
            inner.total_successes += 1;
            match inner.state {
                CircuitState::Closed => inner.consecutive_failures = 0,
                CircuitState::HalfOpen => {
                    inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                    inner.half_open_successes += 1;
                    if inner.half_open_successes >= self.config.success_threshold {
                        inner.move_to(CircuitState::Closed, now, &mut log);
                    }
                }
                // A call admitted before the circuit opened.
                CircuitState::Open => {}
            }
        }
        self.notify(log);
    }

    fn record_failure(&self) {
        let now = self.clock.now();
        let mut log = Vec::new();
        {
            let mut inner = self.lock();
            inner.total_failures += 1;
            inner.last_failure_at = Some(now);
            match inner.state {
                CircuitState::Closed => {
                    inner.consecutive_failures += 1;
                    if inner.consecutive_failures >= self.config.failure_threshold {
                        inner.move_to(CircuitState::Open, now, &mut log);
                    }
                }
                CircuitState::HalfOpen => {
                    inner.consecutive_failures += 1;
                    inner.move_to(CircuitState::Open, now, &mut log);
                }
                CircuitState::Open => {}
            }
        }
        self.notify(log);
    }

    fn reset(&self) {
        let now = self.clock.now();
        let mut log = Vec::new();
        {
            let mut inner = self.lock();
            inner.move_to(CircuitState::Closed, now, &mut log);
            inner.consecutive_failures = 0;
        }
        self.notify(log);
    }

    fn metrics(&self) -> CircuitBreakerMetrics {
        let now = self.clock.now();
        let inner = self.lock();
        let time_until_half_open = match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(opened)) => {
                let ready_at = opened.plus(self.config.cool_down);
                Some(
                    ready_at
                        .duration_since(&now)
                        .to_std()
                        .unwrap_or(Duration::ZERO),
                )
            }
            _ => None,
        };
        CircuitBreakerMetrics {
            state: Some(inner.state),
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
            total_rejected: inner.total_rejected,
            times_opened: inner.times_opened,
            current_failures: inner.consecutive_failures,
            current_successes: inner.half_open_successes,
            time_until_half_open,
        }
    }
}

impl std::fmt::Debug for InMemoryCircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
