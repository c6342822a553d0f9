//! Named circuit breaker registry for outbound calls (spec §4.3).
//!
//! Grounded on the teacher's `services::otp_delivery::CircuitBreaker`
//! (closed/open/half-open, failure threshold, 2-success half-open recovery)
//! generalized from one breaker per provider to a process-wide registry
//! keyed by call name, since this service has more than two outbound
//! dependencies (tokeninfo proxy, JWKS, revocation feed).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use tokeninfo_telemetry::{BreakerState, Metrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

/// Once the window holds at least `failure_threshold` outcomes, a failure
/// ratio at or above this fraction trips the breaker.
const FAILURE_RATIO_THRESHOLD: f64 = 0.5;

struct Breaker {
    state: State,
    /// Closed-state call outcomes (`true` = failure) within the last
    /// `reset_timeout`; entries older than that are pruned on every record.
    outcomes: VecDeque<(Instant, bool)>,
    success_count: u32,
    last_failure: Option<Instant>,
    /// True while a half-open probe is outstanding. Only one call may probe
    /// a half-open breaker at a time; concurrent callers are rejected as
    /// overloaded rather than counted as a second probe.
    probe_in_flight: bool,
}

impl Breaker {
    fn new() -> Self {
        Self {
            state: State::Closed,
            outcomes: VecDeque::new(),
            success_count: 0,
            last_failure: None,
            probe_in_flight: false,
        }
    }

    fn record_outcome(&mut self, failed: bool, window: Duration, now: Instant) {
        self.outcomes.push_back((now, failed));
        while let Some(&(ts, _)) = self.outcomes.front() {
            if now.duration_since(ts) > window {
                self.outcomes.pop_front();
            } else {
                break;
            }
        }
    }

    /// `(total calls in window, failure ratio)`.
    fn window_failure_ratio(&self) -> (usize, f64) {
        let total = self.outcomes.len();
        if total == 0 {
            return (0, 0.0);
        }
        let failures = self.outcomes.iter().filter(|(_, failed)| *failed).count();
        (total, failures as f64 / total as f64)
    }
}

/// The outcome of asking a breaker whether a call may proceed, carrying
/// enough detail for the caller to classify a rejection the way spec §4.3's
/// `{overloaded, open}` pair requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerDecision {
    Allow,
    Open,
    Overloaded,
}

/// A process-wide registry of independent named breakers, one per outbound
/// call site. `reset_timeout` does double duty: it is both the sliding
/// window the failure ratio is computed over while closed, and the time an
/// open breaker waits before admitting a half-open probe. `failure_threshold`
/// is the minimum number of calls the window must hold before a ratio trip
/// is considered — a single failure in an otherwise-empty window never
/// opens it. Half-open requires two consecutive successes before closing,
/// matching the teacher's recovery rule.
pub struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, Breaker>>,
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_success_threshold: u32,
    metrics: Arc<Metrics>,
}

impl CircuitBreakerRegistry {
    pub fn new(failure_threshold: u32, reset_timeout: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            failure_threshold,
            reset_timeout,
            half_open_success_threshold: 2,
            metrics,
        }
    }

    /// Decides whether a call named `name` may proceed right now. A breaker
    /// that has been open longer than `reset_timeout` transitions to
    /// half-open and admits exactly one probe; a second caller arriving
    /// while that probe is outstanding is rejected as overloaded rather than
    /// treated as open, per spec §4.3's distinct `overloaded`/`open` classes.
    pub async fn allow(&self, name: &str) -> BreakerDecision {
        let mut breakers = self.breakers.write().await;
        let breaker = breakers.entry(name.to_string()).or_insert_with(Breaker::new);

        match breaker.state {
            State::Closed => BreakerDecision::Allow,
            State::HalfOpen => {
                if breaker.probe_in_flight {
                    BreakerDecision::Overloaded
                } else {
                    breaker.probe_in_flight = true;
                    BreakerDecision::Allow
                }
            }
            State::Open => {
                let elapsed = breaker.last_failure.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.reset_timeout {
                    breaker.state = State::HalfOpen;
                    breaker.probe_in_flight = true;
                    warn!(name, "circuit breaker entering half-open");
                    self.metrics.set_breaker_state(name, BreakerState::HalfOpen);
                    BreakerDecision::Allow
                } else {
                    BreakerDecision::Open
                }
            }
        }
    }

    pub async fn record_success(&self, name: &str) {
        let mut breakers = self.breakers.write().await;
        let breaker = breakers.entry(name.to_string()).or_insert_with(Breaker::new);

        match breaker.state {
            State::HalfOpen => {
                breaker.success_count += 1;
                breaker.probe_in_flight = false;
                if breaker.success_count >= self.half_open_success_threshold {
                    breaker.state = State::Closed;
                    breaker.success_count = 0;
                    breaker.outcomes.clear();
                    info!(name, "circuit breaker closed (recovered)");
                    self.metrics.set_breaker_state(name, BreakerState::Closed);
                }
            }
            State::Closed => {
                breaker.record_outcome(false, self.reset_timeout, Instant::now());
            }
            State::Open => {}
        }
    }

    pub async fn record_failure(&self, name: &str) {
        let mut breakers = self.breakers.write().await;
        let breaker = breakers.entry(name.to_string()).or_insert_with(Breaker::new);
        let now = Instant::now();
        breaker.last_failure = Some(now);

        match breaker.state {
            State::Closed => {
                breaker.record_outcome(true, self.reset_timeout, now);
                let (total, ratio) = breaker.window_failure_ratio();
                if total >= self.failure_threshold as usize && ratio >= FAILURE_RATIO_THRESHOLD {
                    breaker.state = State::Open;
                    error!(name, total, ratio, "circuit breaker opened");
                    self.metrics.set_breaker_state(name, BreakerState::Open);
                }
            }
            State::HalfOpen => {
                breaker.state = State::Open;
                breaker.success_count = 0;
                breaker.probe_in_flight = false;
                error!(name, "circuit breaker re-opened (failure in half-open)");
                self.metrics.set_breaker_state(name, BreakerState::Open);
            }
            State::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(threshold: u32, reset: Duration) -> CircuitBreakerRegistry {
        CircuitBreakerRegistry::new(threshold, reset, Arc::new(Metrics::new()))
    }

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let reg = registry(3, Duration::from_secs(60));
        for _ in 0..3 {
            reg.record_failure("upstream").await;
        }
        assert_eq!(reg.allow("upstream").await, BreakerDecision::Open);
    }

    #[tokio::test]
    async fn breakers_are_independent_per_name() {
        let reg = registry(1, Duration::from_secs(60));
        reg.record_failure("jwks").await;
        assert_eq!(reg.allow("jwks").await, BreakerDecision::Open);
        assert_eq!(reg.allow("revocation").await, BreakerDecision::Allow);
    }

    #[tokio::test]
    async fn half_open_requires_two_successes_to_close() {
        let reg = registry(1, Duration::from_millis(1));
        reg.record_failure("upstream").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(reg.allow("upstream").await, BreakerDecision::Allow);
        reg.record_success("upstream").await;
        reg.record_failure("upstream").await;
        assert_eq!(reg.allow("upstream").await, BreakerDecision::Open);
    }

    #[tokio::test]
    async fn failure_ratio_trips_even_with_one_interleaved_success() {
        // 4 failures and 1 success in the window is an 80% ratio; a plain
        // cumulative counter that zeroes on any success would stay closed
        // here, but the sliding window must not.
        let reg = registry(3, Duration::from_secs(60));
        reg.record_failure("upstream").await;
        reg.record_failure("upstream").await;
        reg.record_success("upstream").await;
        reg.record_failure("upstream").await;
        reg.record_failure("upstream").await;
        assert_eq!(reg.allow("upstream").await, BreakerDecision::Open);
    }

    #[tokio::test]
    async fn a_majority_of_successes_in_the_window_keeps_it_closed() {
        let reg = registry(3, Duration::from_secs(60));
        reg.record_failure("upstream").await;
        reg.record_success("upstream").await;
        reg.record_success("upstream").await;
        reg.record_success("upstream").await;
        assert_eq!(reg.allow("upstream").await, BreakerDecision::Allow);
    }

    #[tokio::test]
    async fn a_single_failure_below_the_minimum_volume_never_trips_it() {
        let reg = registry(3, Duration::from_secs(60));
        reg.record_failure("upstream").await;
        assert_eq!(reg.allow("upstream").await, BreakerDecision::Allow);
    }

    #[tokio::test]
    async fn failures_outside_the_window_do_not_count_toward_the_ratio() {
        let reg = registry(2, Duration::from_millis(20));
        reg.record_failure("upstream").await;
        reg.record_failure("upstream").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        reg.record_failure("upstream").await;
        assert_eq!(reg.allow("upstream").await, BreakerDecision::Allow);
    }

    #[tokio::test]
    async fn second_caller_during_an_outstanding_half_open_probe_is_overloaded() {
        let reg = registry(1, Duration::from_millis(1));
        reg.record_failure("upstream").await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(reg.allow("upstream").await, BreakerDecision::Allow);
        assert_eq!(reg.allow("upstream").await, BreakerDecision::Overloaded);

        reg.record_failure("upstream").await;
        assert_eq!(reg.allow("upstream").await, BreakerDecision::Open);
    }

    #[tokio::test]
    async fn probe_slot_frees_up_after_the_probe_resolves() {
        let reg = registry(1, Duration::from_millis(1));
        reg.record_failure("upstream").await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(reg.allow("upstream").await, BreakerDecision::Allow);
        reg.record_success("upstream").await;
        assert_eq!(reg.allow("upstream").await, BreakerDecision::Allow);
    }
}
