//! Metrics aggregation
//!
//! One `Metrics` is shared by every iteration through an `Arc`. Counters are
//! atomics; duration samples live behind a mutex so a snapshot sees a
//! consistent set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::checks::{Check, Observation};

#[derive(Debug)]
struct CheckCounter {
    name: String,
    passes: AtomicU64,
    fails: AtomicU64,
}

/// Shared aggregator for a load run
#[derive(Debug)]
pub struct Metrics {
    requests: AtomicU64,
    failed_requests: AtomicU64,
    iterations: AtomicU64,
    dropped_iterations: AtomicU64,
    interrupted_iterations: AtomicU64,
    peak_vus: AtomicU64,
    durations_ms: Mutex<Vec<f64>>,
    checks: Vec<CheckCounter>,
}

/// Distribution of request durations in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendStats {
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub max: f64,
    pub p90: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckStats {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckStats {
    pub fn pass_rate(&self) -> Option<f64> {
        let total = self.passes + self.fails;
        (total > 0).then(|| self.passes as f64 / total as f64)
    }
}

/// Point-in-time copy of the aggregate
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub failed_requests: u64,
    pub iterations: u64,
    pub dropped_iterations: u64,
    pub interrupted_iterations: u64,
    pub peak_vus: u64,
    pub durations: Option<TrendStats>,
    pub checks: Vec<CheckStats>,
}

impl MetricsSnapshot {
    /// Failed over total requests; `None` before the first request
    pub fn error_rate(&self) -> Option<f64> {
        (self.requests > 0).then(|| self.failed_requests as f64 / self.requests as f64)
    }
}

impl Metrics {
    pub fn new(checks: &[Check]) -> Self {
        Self {
            requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            iterations: AtomicU64::new(0),
            dropped_iterations: AtomicU64::new(0),
            interrupted_iterations: AtomicU64::new(0),
            peak_vus: AtomicU64::new(0),
            durations_ms: Mutex::new(Vec::new()),
            checks: checks
                .iter()
                .map(|c| CheckCounter {
                    name: c.name(),
                    passes: AtomicU64::new(0),
                    fails: AtomicU64::new(0),
                })
                .collect(),
        }
    }

    /// Record one request and the outcome of every check against it
    pub fn record_request(&self, observation: &Observation, checks: &[Check]) {
        {
            let mut durations = self.durations_ms.lock();
            durations.push(as_millis(observation.elapsed));
            self.requests.fetch_add(1, Ordering::Relaxed);
            if observation.is_failure() {
                self.failed_requests.fetch_add(1, Ordering::Relaxed);
            }
        }

        for (counter, check) in self.checks.iter().zip(checks) {
            if check.evaluate(observation) {
                counter.passes.fetch_add(1, Ordering::Relaxed);
            } else {
                counter.fails.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped_iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_interrupted(&self, count: u64) {
        self.interrupted_iterations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn observe_vus(&self, active: u64) {
        self.peak_vus.fetch_max(active, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (requests, failed_requests, durations) = {
            let durations = self.durations_ms.lock();
            (
                self.requests.load(Ordering::Relaxed),
                self.failed_requests.load(Ordering::Relaxed),
                trend(&durations),
            )
        };

        MetricsSnapshot {
            requests,
            failed_requests,
            iterations: self.iterations.load(Ordering::Relaxed),
            dropped_iterations: self.dropped_iterations.load(Ordering::Relaxed),
            interrupted_iterations: self.interrupted_iterations.load(Ordering::Relaxed),
            peak_vus: self.peak_vus.load(Ordering::Relaxed),
            durations,
            checks: self
                .checks
                .iter()
                .map(|c| CheckStats {
                    name: c.name.clone(),
                    passes: c.passes.load(Ordering::Relaxed),
                    fails: c.fails.load(Ordering::Relaxed),
                })
                .collect(),
        }
    }
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn trend(samples: &[f64]) -> Option<TrendStats> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let sum: f64 = sorted.iter().sum();
    Some(TrendStats {
        avg: sum / sorted.len() as f64,
        min: sorted[0],
        med: percentile(&sorted, 50.0),
        max: sorted[sorted.len() - 1],
        p90: percentile(&sorted, 90.0),
        p95: percentile(&sorted, 95.0),
    })
}

/// Linear interpolation between the closest ranks of a sorted, non-empty slice
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}
