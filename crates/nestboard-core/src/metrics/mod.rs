//! Injection outcome metrics over a bounded sliding window.
//!
//! The engine records one [`HealthSample`] per finished injection request
//! (success or final failure; superseded requests are not recorded).  The
//! window keeps the most recent `capacity` samples and answers two questions
//! for operators: what fraction of recent injections succeeded, and how slow
//! is the tail (p95 latency).
//!
//! Pure data structure.  No clocks, no locks; callers synchronise access.

use std::collections::VecDeque;
use std::time::Duration;

/// Outcome of one finished injection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSample {
    pub success: bool,
    /// Wall time from first attempt to final outcome, retries included.
    pub latency: Duration,
}

/// Sliding window of the most recent injection outcomes.
#[derive(Debug)]
pub struct MetricsWindow {
    samples: VecDeque<HealthSample>,
    capacity: usize,
}

impl MetricsWindow {
    /// Creates a window holding at most `capacity` samples.  A zero capacity
    /// is clamped to one so the window always retains the latest outcome.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records one outcome, evicting the oldest sample when full.
    pub fn record(&mut self, sample: HealthSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fraction of successful injections in the window, or `None` when no
    /// samples have been recorded yet.
    pub fn success_rate(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let ok = self.samples.iter().filter(|s| s.success).count();
        Some(ok as f64 / self.samples.len() as f64)
    }

    /// 95th-percentile latency over the window, or `None` when empty.
    ///
    /// Nearest-rank method: the sample at rank `ceil(0.95 * n)` of the sorted
    /// latencies.
    pub fn p95_latency(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let mut latencies: Vec<Duration> = self.samples.iter().map(|s| s.latency).collect();
        latencies.sort_unstable();
        let rank = ((latencies.len() as f64) * 0.95).ceil() as usize;
        Some(latencies[rank.saturating_sub(1)])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
