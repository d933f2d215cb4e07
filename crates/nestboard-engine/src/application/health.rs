//! Injection health tracking: Healthy ⇄ Degraded.
//!
//! The engine enters Degraded after a configured number of *consecutive*
//! final injection failures and returns to Healthy after a configured streak
//! of consecutive successes.  A success anywhere in a failure run resets the
//! failure counter, and vice versa.
//!
//! Transitions are published on a `tokio::sync::watch` channel so the
//! presentation layer can show a banner without polling.  A background probe
//! loop exercises the injector on an interval regardless of current health;
//! probe results feed the same counters as real injections, so a dead
//! injector is detected before the user gestures and recovery does not
//! depend on the user generating input.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::infrastructure::injection::KeyInjector;

/// Aggregate delivery health of the injection engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineHealth {
    Healthy,
    /// Recent injections failed consecutively; deliveries are suspect.
    Degraded,
}

/// Counter thresholds for health transitions.
#[derive(Debug, Clone, Copy)]
pub struct HealthThresholds {
    /// Consecutive final failures that trip Healthy → Degraded.
    pub degraded_after: u32,
    /// Consecutive successes that restore Degraded → Healthy.
    pub recovery_streak: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            degraded_after: 3,
            recovery_streak: 3,
        }
    }
}

/// Tracks consecutive injection outcomes and publishes health transitions.
#[derive(Debug)]
pub struct HealthTracker {
    thresholds: HealthThresholds,
    consecutive_failures: u32,
    consecutive_successes: u32,
    state: EngineHealth,
    tx: watch::Sender<EngineHealth>,
}

impl HealthTracker {
    pub fn new(thresholds: HealthThresholds) -> Self {
        let (tx, _rx) = watch::channel(EngineHealth::Healthy);
        Self {
            thresholds,
            consecutive_failures: 0,
            consecutive_successes: 0,
            state: EngineHealth::Healthy,
            tx,
        }
    }

    pub fn state(&self) -> EngineHealth {
        self.state
    }

    /// Subscribes to health transitions.  The receiver immediately holds the
    /// current state.
    pub fn subscribe(&self) -> watch::Receiver<EngineHealth> {
        self.tx.subscribe()
    }

    /// Records a successful final injection outcome.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        if self.state == EngineHealth::Degraded {
            self.consecutive_successes += 1;
            if self.consecutive_successes >= self.thresholds.recovery_streak {
                self.transition(EngineHealth::Healthy);
            }
        }
    }

    /// Records a failed final injection outcome (retries exhausted or fatal).
    pub fn record_failure(&mut self) {
        self.consecutive_successes = 0;
        self.consecutive_failures += 1;
        if self.state == EngineHealth::Healthy
            && self.consecutive_failures >= self.thresholds.degraded_after
        {
            self.transition(EngineHealth::Degraded);
        }
    }

    fn transition(&mut self, to: EngineHealth) {
        if self.state == to {
            return;
        }
        match to {
            EngineHealth::Degraded => {
                warn!(
                    failures = self.consecutive_failures,
                    "injection engine degraded"
                );
            }
            EngineHealth::Healthy => {
                info!(
                    streak = self.consecutive_successes,
                    "injection engine recovered"
                );
            }
        }
        self.state = to;
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;
        // send_replace never fails; the tracker holds the sender.
        self.tx.send_replace(to);
    }
}

/// Background probe loop: exercises the injector on an interval and feeds
/// the outcome into the tracker.  Probing while Healthy catches a dead
/// injector before the next gesture; probing while Degraded drives recovery
/// without requiring the user to generate gestures.
///
/// Runs until the watch sender side of `shutdown` is dropped or set to true.
pub async fn run_probe_loop(
    tracker: Arc<tokio::sync::Mutex<HealthTracker>>,
    injector: Arc<dyn KeyInjector>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("probe loop stopping");
                    return;
                }
                continue;
            }
        }

        match injector.probe().await {
            Ok(()) => {
                debug!("health probe succeeded");
                tracker.lock().await.record_success();
            }
            Err(e) => {
                debug!(error = %e, "health probe failed");
                tracker.lock().await.record_failure();
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> HealthTracker {
        HealthTracker::new(HealthThresholds {
            degraded_after: 3,
            recovery_streak: 2,
        })
    }

    #[test]
    fn test_tracker_starts_healthy() {
        assert_eq!(tracker().state(), EngineHealth::Healthy);
    }

    #[test]
    fn test_consecutive_failures_trip_degraded() {
        let mut t = tracker();
        t.record_failure();
        t.record_failure();
        assert_eq!(t.state(), EngineHealth::Healthy);

        t.record_failure();

        assert_eq!(t.state(), EngineHealth::Degraded);
    }

    #[test]
    fn test_success_resets_failure_run() {
        let mut t = tracker();
        t.record_failure();
        t.record_failure();
        t.record_success();
        t.record_failure();
        t.record_failure();

        // The run restarted after the success: only two consecutive failures.
        assert_eq!(t.state(), EngineHealth::Healthy);
    }

    #[test]
    fn test_recovery_requires_full_success_streak() {
        let mut t = tracker();
        for _ in 0..3 {
            t.record_failure();
        }
        assert_eq!(t.state(), EngineHealth::Degraded);

        t.record_success();
        assert_eq!(t.state(), EngineHealth::Degraded);
        t.record_success();

        assert_eq!(t.state(), EngineHealth::Healthy);
    }

    #[test]
    fn test_failure_resets_recovery_streak() {
        let mut t = tracker();
        for _ in 0..3 {
            t.record_failure();
        }
        t.record_success();
        t.record_failure();
        t.record_success();

        // Streak restarted: one success, threshold is two.
        assert_eq!(t.state(), EngineHealth::Degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_loop_degrades_healthy_engine_without_gestures() {
        use crate::infrastructure::injection::mock::MockKeyInjector;
        use crate::infrastructure::injection::InjectError;

        // Arrange – a healthy engine whose injector has died
        let tracker = Arc::new(tokio::sync::Mutex::new(tracker()));
        let injector = Arc::new(MockKeyInjector::new());
        for _ in 0..3 {
            injector.push_probe_outcome(Err(InjectError::Platform("driver gone".into())));
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let probe_loop = tokio::spawn(run_probe_loop(
            Arc::clone(&tracker),
            Arc::clone(&injector) as Arc<dyn KeyInjector>,
            Duration::from_secs(5),
            shutdown_rx,
        ));

        // Act – three probe intervals elapse with no user input
        tokio::time::sleep(Duration::from_secs(11)).await;

        // Assert
        assert_eq!(tracker.lock().await.state(), EngineHealth::Degraded);
        shutdown_tx.send(true).expect("send shutdown");
        probe_loop.await.expect("probe loop");
    }

    #[test]
    fn test_watch_channel_publishes_transitions() {
        let mut t = tracker();
        let rx = t.subscribe();
        assert_eq!(*rx.borrow(), EngineHealth::Healthy);

        for _ in 0..3 {
            t.record_failure();
        }

        assert_eq!(*rx.borrow(), EngineHealth::Degraded);
    }
}
