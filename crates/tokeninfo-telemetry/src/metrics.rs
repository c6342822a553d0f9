//! Metrics registry: per-call-name request counters/timers and circuit
//! breaker state gauges, serialized as JSON for `/metrics`.
//!
//! The spec scopes metrics *registration* and JSON *serialization* out of
//! the core subsystems, but the core must still increment named counters at
//! its decision points — this registry is the thing it increments against.
//! A hand-rolled `DashMap`-backed registry is used instead of the teacher's
//! `metrics`/`metrics-exporter-prometheus`/`opentelemetry` stack because
//! those emit Prometheus text exposition format, not the JSON document this
//! service's `/metrics` contract calls for; see DESIGN.md.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
struct CallStats {
    attempts: AtomicU64,
    failures: AtomicU64,
    total_latency_micros: AtomicU64,
}

#[derive(Default)]
struct BreakerGauge {
    /// 0 = closed, 1 = open, 2 = half-open
    state: AtomicI64,
}

/// Shared, cloneable handle to the metrics registry.
#[derive(Default, Clone)]
pub struct Metrics {
    calls: std::sync::Arc<DashMap<String, CallStats>>,
    breakers: std::sync::Arc<DashMap<String, BreakerGauge>>,
    counters: std::sync::Arc<DashMap<String, AtomicU64>>,
}

#[derive(Serialize)]
pub struct CallSnapshot {
    pub name: String,
    pub attempts: u64,
    pub failures: u64,
    pub mean_latency_micros: u64,
}

#[derive(Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: &'static str,
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub calls: Vec<CallSnapshot>,
    pub circuit_breakers: Vec<BreakerSnapshot>,
    pub counters: Vec<(String, u64)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one outbound call's outcome and latency against `name`
    /// (e.g. `"loadKeys"`, `"refreshRevocations"`, `"proxy"`).
    pub fn record_call(&self, name: &str, succeeded: bool, latency: Duration) {
        let entry = self.calls.entry(name.to_string()).or_default();
        entry.attempts.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            entry.failures.fetch_add(1, Ordering::Relaxed);
        }
        entry
            .total_latency_micros
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    /// Sets the circuit breaker gauge for `name` to reflect its current state.
    pub fn set_breaker_state(&self, name: &str, state: BreakerState) {
        self.breakers
            .entry(name.to_string())
            .or_default()
            .state
            .store(state as i64, Ordering::Relaxed);
    }

    /// Increments a bare named counter (e.g. `"jwks.no_keys"`,
    /// `"revocation.hit.token"`).
    pub fn increment(&self, name: &str) {
        self.counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let calls = self
            .calls
            .iter()
            .map(|entry| {
                let attempts = entry.attempts.load(Ordering::Relaxed);
                let total = entry.total_latency_micros.load(Ordering::Relaxed);
                CallSnapshot {
                    name: entry.key().clone(),
                    attempts,
                    failures: entry.failures.load(Ordering::Relaxed),
                    mean_latency_micros: if attempts > 0 { total / attempts } else { 0 },
                }
            })
            .collect();

        let circuit_breakers = self
            .breakers
            .iter()
            .map(|entry| BreakerSnapshot {
                name: entry.key().clone(),
                state: BreakerState::from_i64(entry.state.load(Ordering::Relaxed)).label(),
            })
            .collect();

        let counters = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();

        MetricsSnapshot {
            calls,
            circuit_breakers,
            counters,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl BreakerState {
    fn from_i64(v: i64) -> Self {
        match v {
            1 => BreakerState::Open,
            2 => BreakerState::HalfOpen,
            _ => BreakerState::Closed,
        }
    }

    fn label(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half-open",
        }
    }
}
