//! Per-dependency circuit breaker: a sliding-window state machine with three
//! states (CLOSED/OPEN/HALF_OPEN), exposing only the two operations callers
//! need — `try_acquire_permission` and `record` — so fetchers can route a
//! denied permission to a business-specific fallback instead of a uniform
//! breaker exception.

use crate::clock::Clock;
use crate::metrics_window::{Outcome, SlidingWindow};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitBreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub sliding_window_size: u32,
    pub minimum_number_of_calls: u32,
    pub failure_rate_threshold: f64,
    pub wait_duration_in_open_state: Duration,
    pub permitted_number_of_calls_in_half_open_state: u32,
    pub slow_call_duration_threshold: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            sliding_window_size: 100,
            minimum_number_of_calls: 10,
            failure_rate_threshold: 10.0,
            wait_duration_in_open_state: Duration::from_secs(10),
            permitted_number_of_calls_in_half_open_state: 3,
            slow_call_duration_threshold: Duration::from_secs(5),
        }
    }
}

struct Inner {
    state: CircuitBreakerState,
    window: SlidingWindow,
    opened_at: Option<std::time::Instant>,
    half_open_in_flight: u32,
    half_open_total: u32,
    half_open_failures: u32,
    not_permitted_calls: u64,
    slow_calls: u32,
}

/// A named, independently-owned circuit breaker. Cheap to clone (an `Arc`
/// inside), so fetchers can hold their own handle.
#[derive(Clone)]
pub struct CircuitBreaker {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerMetrics {
    pub name: String,
    pub state: CircuitBreakerState,
    pub buffered_calls: u32,
    pub failed_calls: u32,
    pub successful_calls: u32,
    pub not_permitted_calls: u64,
    pub failure_rate: f64,
    pub slow_call_rate: f64,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<Arc<str>>, config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let window = SlidingWindow::new(config.sliding_window_size as usize);
        Self {
            name: name.into(),
            config,
            clock,
            inner: Arc::new(Mutex::new(Inner {
                state: CircuitBreakerState::Closed,
                window,
                opened_at: None,
                half_open_in_flight: 0,
                half_open_total: 0,
                half_open_failures: 0,
                not_permitted_calls: 0,
                slow_calls: 0,
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitBreakerState {
        self.inner.lock().state
    }

    /// Synchronous, constant-time decision: may this caller proceed, or must
    /// it fall back? Never suspends.
    pub fn try_acquire_permission(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitBreakerState::Closed => true,
            CircuitBreakerState::Open => {
                let opened_at = match inner.opened_at {
                    Some(t) => t,
                    None => return false,
                };
                if self.clock.now().duration_since(opened_at) >= self.config.wait_duration_in_open_state {
                    tracing::info!(breaker = %self.name, from = ?CircuitBreakerState::Open, to = ?CircuitBreakerState::HalfOpen, "circuit_transition");
                    inner.state = CircuitBreakerState::HalfOpen;
                    inner.opened_at = None;
                    inner.half_open_in_flight = 0;
                    inner.half_open_total = 0;
                    inner.half_open_failures = 0;
                    // Fall through to grant the first half-open trial.
                    inner.half_open_in_flight += 1;
                    true
                } else {
                    inner.not_permitted_calls += 1;
                    false
                }
            }
            CircuitBreakerState::HalfOpen => {
                if inner.half_open_in_flight < self.config.permitted_number_of_calls_in_half_open_state {
                    inner.half_open_in_flight += 1;
                    true
                } else {
                    inner.not_permitted_calls += 1;
                    false
                }
            }
        }
    }

    /// Record the outcome of a call that was previously admitted by
    /// `try_acquire_permission`. IGNORED outcomes neither fill the window nor
    /// move the state machine, but they still free a HALF_OPEN trial slot.
    pub fn record(&self, outcome: Outcome, duration: Duration) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitBreakerState::Closed => {
                if outcome == Outcome::Ignored {
                    return;
                }
                if duration >= self.config.slow_call_duration_threshold {
                    inner.slow_calls += 1;
                }
                inner.window.record(outcome, duration);
                if inner.window.buffered_calls() >= self.config.minimum_number_of_calls
                    && inner.window.failure_rate() >= self.config.failure_rate_threshold
                {
                    tracing::warn!(
                        breaker = %self.name,
                        failure_rate = inner.window.failure_rate(),
                        "failure_rate_exceeded"
                    );
                    tracing::warn!(breaker = %self.name, from = ?CircuitBreakerState::Closed, to = ?CircuitBreakerState::Open, "circuit_transition");
                    inner.state = CircuitBreakerState::Open;
                    inner.opened_at = Some(self.clock.now());
                }
            }
            CircuitBreakerState::Open => {
                // A call shouldn't be in flight here; ignore defensively.
            }
            CircuitBreakerState::HalfOpen => {
                if inner.half_open_in_flight > 0 {
                    inner.half_open_in_flight -= 1;
                }
                if outcome == Outcome::Ignored {
                    return;
                }
                if duration >= self.config.slow_call_duration_threshold {
                    inner.slow_calls += 1;
                }
                inner.half_open_total += 1;
                if outcome == Outcome::Failure {
                    inner.half_open_failures += 1;
                }
                if inner.half_open_total >= self.config.permitted_number_of_calls_in_half_open_state {
                    let rate = 100.0 * inner.half_open_failures as f64 / inner.half_open_total as f64;
                    if rate < self.config.failure_rate_threshold {
                        tracing::info!(breaker = %self.name, from = ?CircuitBreakerState::HalfOpen, to = ?CircuitBreakerState::Closed, "circuit_transition");
                        inner.state = CircuitBreakerState::Closed;
                        inner.window.reset();
                        inner.slow_calls = 0;
                        inner.opened_at = None;
                    } else {
                        tracing::warn!(breaker = %self.name, from = ?CircuitBreakerState::HalfOpen, to = ?CircuitBreakerState::Open, "circuit_transition");
                        inner.state = CircuitBreakerState::Open;
                        inner.opened_at = Some(self.clock.now());
                    }
                    inner.half_open_in_flight = 0;
                    inner.half_open_total = 0;
                    inner.half_open_failures = 0;
                }
            }
        }
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        let buffered = inner.window.buffered_calls();
        CircuitBreakerMetrics {
            name: self.name.to_string(),
            state: inner.state,
            buffered_calls: buffered,
            failed_calls: inner.window.failed_calls(),
            successful_calls: inner.window.successful_calls(),
            not_permitted_calls: inner.not_permitted_calls,
            failure_rate: inner.window.failure_rate(),
            slow_call_rate: if buffered == 0 {
                0.0
            } else {
                100.0 * inner.slow_calls as f64 / buffered as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;

    fn breaker_with(config: CircuitBreakerConfig, clock: FakeClock) -> CircuitBreaker {
        CircuitBreaker::new("test", config, Arc::new(clock))
    }

    #[test]
    fn closed_grants_permission_always() {
        let breaker = breaker_with(CircuitBreakerConfig::default(), FakeClock::new());
        for _ in 0..5 {
            assert!(breaker.try_acquire_permission());
        }
    }

    #[test]
    fn opens_only_after_minimum_calls_and_threshold_breach() {
        let config = CircuitBreakerConfig {
            minimum_number_of_calls: 10,
            failure_rate_threshold: 50.0,
            ..Default::default()
        };
        let breaker = breaker_with(config, FakeClock::new());

        // 5 failures: below minimum_number_of_calls, must stay closed.
        for _ in 0..5 {
            breaker.record(Outcome::Failure, Duration::from_millis(1));
        }
        assert_eq!(breaker.state(), CircuitBreakerState::Closed);

        // 5 more failures: now at 10 buffered calls, 100% failure rate >= 50%.
        for _ in 0..5 {
            breaker.record(Outcome::Failure, Duration::from_millis(1));
        }
        assert_eq!(breaker.state(), CircuitBreakerState::Open);
    }

    #[test]
    fn ignored_outcomes_never_trip_the_breaker() {
        let config = CircuitBreakerConfig {
            minimum_number_of_calls: 5,
            failure_rate_threshold: 10.0,
            ..Default::default()
        };
        let breaker = breaker_with(config, FakeClock::new());
        for _ in 0..50 {
            breaker.record(Outcome::Ignored, Duration::from_millis(1));
        }
        assert_eq!(breaker.state(), CircuitBreakerState::Closed);
        assert_eq!(breaker.metrics().buffered_calls, 0);
    }

    #[test]
    fn permission_denied_throughout_wait_duration() {
        let clock = FakeClock::new();
        let config = CircuitBreakerConfig {
            minimum_number_of_calls: 1,
            failure_rate_threshold: 1.0,
            wait_duration_in_open_state: Duration::from_secs(10),
            ..Default::default()
        };
        let breaker = breaker_with(config, clock.clone());
        breaker.record(Outcome::Failure, Duration::from_millis(1));
        assert_eq!(breaker.state(), CircuitBreakerState::Open);

        assert!(!breaker.try_acquire_permission());
        clock.advance(Duration::from_secs(5));
        assert!(!breaker.try_acquire_permission());

        clock.advance(Duration::from_secs(6));
        assert!(breaker.try_acquire_permission());
        assert_eq!(breaker.state(), CircuitBreakerState::HalfOpen);
    }

    #[test]
    fn half_open_closes_after_successful_trials() {
        let clock = FakeClock::new();
        let config = CircuitBreakerConfig {
            minimum_number_of_calls: 1,
            failure_rate_threshold: 1.0,
            wait_duration_in_open_state: Duration::from_secs(1),
            permitted_number_of_calls_in_half_open_state: 3,
            ..Default::default()
        };
        let breaker = breaker_with(config, clock.clone());
        breaker.record(Outcome::Failure, Duration::from_millis(1));
        clock.advance(Duration::from_secs(2));
        assert!(breaker.try_acquire_permission());
        breaker.record(Outcome::Success, Duration::from_millis(1));

        assert!(breaker.try_acquire_permission());
        breaker.record(Outcome::Success, Duration::from_millis(1));

        assert!(breaker.try_acquire_permission());
        breaker.record(Outcome::Success, Duration::from_millis(1));

        assert_eq!(breaker.state(), CircuitBreakerState::Closed);
    }

    #[test]
    fn half_open_reopens_on_failure() {
        let clock = FakeClock::new();
        let config = CircuitBreakerConfig {
            minimum_number_of_calls: 1,
            failure_rate_threshold: 50.0,
            wait_duration_in_open_state: Duration::from_secs(1),
            permitted_number_of_calls_in_half_open_state: 2,
            ..Default::default()
        };
        let breaker = breaker_with(config, clock.clone());
        breaker.record(Outcome::Failure, Duration::from_millis(1));
        clock.advance(Duration::from_secs(2));

        assert!(breaker.try_acquire_permission());
        breaker.record(Outcome::Failure, Duration::from_millis(1));
        assert!(breaker.try_acquire_permission());
        breaker.record(Outcome::Success, Duration::from_millis(1));

        assert_eq!(breaker.state(), CircuitBreakerState::Open);
    }

    #[test]
    fn half_open_in_flight_cap_denies_extra_trials() {
        let clock = FakeClock::new();
        let config = CircuitBreakerConfig {
            minimum_number_of_calls: 1,
            failure_rate_threshold: 1.0,
            wait_duration_in_open_state: Duration::from_secs(1),
            permitted_number_of_calls_in_half_open_state: 2,
            ..Default::default()
        };
        let breaker = breaker_with(config, clock.clone());
        breaker.record(Outcome::Failure, Duration::from_millis(1));
        clock.advance(Duration::from_secs(2));

        assert!(breaker.try_acquire_permission());
        assert!(breaker.try_acquire_permission());
        assert!(!breaker.try_acquire_permission());
    }
}
