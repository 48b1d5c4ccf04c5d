//! Count-based sliding window of call outcomes, shared substrate for every
//! circuit breaker's failure-rate computation.

use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    /// Business-logical absence (e.g. "not found"): never fills the window
    /// and never contributes to the failure rate.
    Ignored,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    outcome: Outcome,
    #[allow(dead_code)]
    duration: Duration,
}

/// Fixed-capacity ring of recent call outcomes.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    entries: VecDeque<Entry>,
    successes: u32,
    failures: u32,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sliding window capacity must be > 0");
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            successes: 0,
            failures: 0,
        }
    }

    /// Record an outcome. IGNORED outcomes are dropped entirely: they never
    /// enter the ring and never affect `buffered_calls`/`failure_rate`.
    pub fn record(&mut self, outcome: Outcome, duration: Duration) {
        if outcome == Outcome::Ignored {
            return;
        }

        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                match evicted.outcome {
                    Outcome::Success => self.successes -= 1,
                    Outcome::Failure => self.failures -= 1,
                    Outcome::Ignored => unreachable!("ignored outcomes are never stored"),
                }
            }
        }

        match outcome {
            Outcome::Success => self.successes += 1,
            Outcome::Failure => self.failures += 1,
            Outcome::Ignored => unreachable!(),
        }
        self.entries.push_back(Entry { outcome, duration });
    }

    /// Number of non-ignored calls currently buffered.
    pub fn buffered_calls(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn failed_calls(&self) -> u32 {
        self.failures
    }

    pub fn successful_calls(&self) -> u32 {
        self.successes
    }

    /// Failure rate as a percentage (0.0 - 100.0). `0.0` when the window is
    /// empty so the CLOSED state never spuriously trips.
    pub fn failure_rate(&self) -> f64 {
        let buffered = self.buffered_calls();
        if buffered == 0 {
            return 0.0;
        }
        100.0 * self.failures as f64 / buffered as f64
    }

    /// Clear the ring (used on CLOSED reset and on transition out of HALF_OPEN).
    pub fn reset(&mut self) {
        self.entries.clear();
        self.successes = 0;
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_outcomes_never_fill_the_window() {
        let mut window = SlidingWindow::new(10);
        for _ in 0..5 {
            window.record(Outcome::Ignored, Duration::from_millis(1));
        }
        assert_eq!(window.buffered_calls(), 0);
        assert_eq!(window.failure_rate(), 0.0);
    }

    #[test]
    fn failure_rate_computed_over_buffered_calls() {
        let mut window = SlidingWindow::new(10);
        for _ in 0..3 {
            window.record(Outcome::Failure, Duration::from_millis(1));
        }
        for _ in 0..7 {
            window.record(Outcome::Success, Duration::from_millis(1));
        }
        assert_eq!(window.buffered_calls(), 10);
        assert!((window.failure_rate() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ring_evicts_oldest_beyond_capacity() {
        let mut window = SlidingWindow::new(3);
        window.record(Outcome::Failure, Duration::from_millis(1));
        window.record(Outcome::Failure, Duration::from_millis(1));
        window.record(Outcome::Failure, Duration::from_millis(1));
        assert_eq!(window.failure_rate(), 100.0);

        // Pushes out one failure, window now has 2 failures + 1 success.
        window.record(Outcome::Success, Duration::from_millis(1));
        assert_eq!(window.buffered_calls(), 3);
        assert!((window.failure_rate() - (200.0 / 3.0)).abs() < 1e-9);
    }
}
