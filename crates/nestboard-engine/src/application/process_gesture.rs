//! ProcessGestureUseCase: turns pointer gestures into delivered OS input.
//!
//! This use case is the heart of the engine.  It feeds each gesture through
//! the [`Keyboard`] aggregate, plays feedback for user-caused transitions,
//! and drives every resulting [`InjectionRequest`] through the delivery
//! policy: per-attempt timeout, bounded retries with backoff for transient
//! failures, and per-key supersession so a stale retry never lands after a
//! newer gesture on the same key.
//!
//! Final outcomes (success or failure, but not supersession) feed the
//! delivery metrics window and the health tracker.
//!
//! Every state change is also published on a shared `broadcast` channel so
//! the presentation layer can repaint keys it did not gesture on, in
//! particular forced corrections applied by the IME synchroniser's
//! background loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use nestboard_core::{
    ChangeCause, GestureTrigger, HealthSample, InjectionRequest, KeyId, KeyState, Keyboard,
    MetricsWindow, ProcessResult, StateChange,
};

use crate::application::health::HealthTracker;
use crate::infrastructure::feedback::FeedbackCache;
use crate::infrastructure::injection::{InjectError, KeyInjector};

/// Delivery policy for one injection request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,
    /// Delay between attempts.
    pub backoff: Duration,
    /// Budget for one attempt; overruns count as [`InjectError::Timeout`].
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(25),
            attempt_timeout: Duration::from_millis(150),
        }
    }
}

/// Final fate of one injection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionOutcome {
    /// Delivered to the OS.
    Delivered,
    /// Retries exhausted or a fatal error; the key's displayed state may
    /// disagree with the OS until the next gesture or correction.
    Failed(InjectError),
    /// A newer request for the same key arrived while this one was between
    /// attempts; delivery was abandoned without recording a sample.
    Superseded,
}

/// Everything one handled gesture produced.
#[derive(Debug, Default)]
pub struct GestureReport {
    pub changes: Vec<StateChange>,
    pub outcomes: Vec<(InjectionRequest, InjectionOutcome)>,
}

/// The Process Gesture use case.
pub struct ProcessGestureUseCase {
    keyboard: Arc<Mutex<Keyboard>>,
    injector: Arc<dyn KeyInjector>,
    feedback: Option<Arc<FeedbackCache>>,
    health: Arc<Mutex<HealthTracker>>,
    metrics: Arc<Mutex<MetricsWindow>>,
    /// Latest delivery generation per key; a dispatch whose generation falls
    /// behind has been superseded.
    generations: Mutex<HashMap<KeyId, u64>>,
    /// State-changed stream shared with the IME synchroniser.
    changes: broadcast::Sender<StateChange>,
    policy: RetryPolicy,
}

impl ProcessGestureUseCase {
    pub fn new(
        keyboard: Arc<Mutex<Keyboard>>,
        injector: Arc<dyn KeyInjector>,
        feedback: Option<Arc<FeedbackCache>>,
        health: Arc<Mutex<HealthTracker>>,
        metrics: Arc<Mutex<MetricsWindow>>,
        changes: broadcast::Sender<StateChange>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            keyboard,
            injector,
            feedback,
            health,
            metrics,
            generations: Mutex::new(HashMap::new()),
            changes,
            policy,
        }
    }

    /// Shared keyboard handle, for the IME synchroniser and the presentation
    /// layer.
    pub fn keyboard(&self) -> Arc<Mutex<Keyboard>> {
        Arc::clone(&self.keyboard)
    }

    /// Subscribes to the state-changed stream.  Carries every change this use
    /// case produces; wiring the same sender into the IME synchroniser makes
    /// forced corrections arrive on the same stream.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    /// Handles one pointer gesture end to end.
    pub async fn handle_gesture(&self, id: &KeyId, trigger: GestureTrigger) -> GestureReport {
        let result: ProcessResult = {
            let mut keyboard = self.keyboard.lock().await;
            keyboard.process(id, trigger)
        };

        self.play_feedback(&result.changes).await;
        for change in &result.changes {
            // Err means no live subscribers, which is fine headless.
            let _ = self.changes.send(change.clone());
        }

        let mut report = GestureReport {
            changes: result.changes,
            outcomes: Vec::with_capacity(result.requests.len()),
        };
        // Sequential dispatch preserves intra-gesture ordering (character
        // click before its modifier releases).
        for request in result.requests {
            let outcome = self.inject_request(request.clone()).await;
            report.outcomes.push((request, outcome));
        }
        report
    }

    /// Drives one request through the delivery policy.
    ///
    /// Public so integration tests can exercise retry and supersession paths
    /// without fabricating gestures.
    pub async fn inject_request(&self, request: InjectionRequest) -> InjectionOutcome {
        let my_generation = {
            let mut generations = self.generations.lock().await;
            let slot = generations.entry(request.key.clone()).or_insert(0);
            *slot += 1;
            *slot
        };

        let started = Instant::now();
        let mut attempt = 0u32;
        loop {
            let attempt_result = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.injector.inject(&request),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(InjectError::Timeout),
            };

            match attempt_result {
                Ok(()) => {
                    let latency = started.elapsed();
                    debug!(
                        request = %request.request_id,
                        key = %request.key,
                        attempts = attempt + 1,
                        latency_ms = latency.as_millis() as u64,
                        "injection delivered"
                    );
                    self.record_outcome(true, latency).await;
                    return InjectionOutcome::Delivered;
                }
                Err(error) if !error.is_transient() => {
                    warn!(
                        request = %request.request_id,
                        key = %request.key,
                        %error,
                        "injection failed fatally"
                    );
                    self.record_outcome(false, started.elapsed()).await;
                    return InjectionOutcome::Failed(error);
                }
                Err(error) if attempt >= self.policy.max_retries => {
                    warn!(
                        request = %request.request_id,
                        key = %request.key,
                        attempts = attempt + 1,
                        %error,
                        "injection failed; retries exhausted"
                    );
                    self.record_outcome(false, started.elapsed()).await;
                    return InjectionOutcome::Failed(error);
                }
                Err(error) => {
                    debug!(
                        request = %request.request_id,
                        key = %request.key,
                        attempt = attempt + 1,
                        %error,
                        "transient injection failure; retrying"
                    );
                }
            }

            tokio::time::sleep(self.policy.backoff).await;
            attempt += 1;

            let superseded = {
                let generations = self.generations.lock().await;
                generations.get(&request.key).copied() != Some(my_generation)
            };
            if superseded {
                info!(
                    request = %request.request_id,
                    key = %request.key,
                    "injection superseded by a newer request for the same key"
                );
                return InjectionOutcome::Superseded;
            }
        }
    }

    /// Current delivery health, for status surfaces.
    pub async fn metrics_snapshot(&self) -> (Option<f64>, Option<Duration>) {
        let metrics = self.metrics.lock().await;
        (metrics.success_rate(), metrics.p95_latency())
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    async fn record_outcome(&self, success: bool, latency: Duration) {
        self.metrics
            .lock()
            .await
            .record(HealthSample { success, latency });
        let mut health = self.health.lock().await;
        if success {
            health.record_success();
        } else {
            health.record_failure();
        }
    }

    /// Fetches the feedback clip for each user-caused transition.  Forced
    /// corrections stay silent: the user did not act, so nothing should
    /// click.
    async fn play_feedback(&self, changes: &[StateChange]) {
        let Some(cache) = &self.feedback else {
            return;
        };
        for change in changes {
            if change.cause != ChangeCause::UserGesture {
                continue;
            }
            let Some(sample) = sample_for(change) else {
                continue;
            };
            if cache.get(sample).await.is_none() {
                debug!(key = %change.key, sample, "feedback clip unavailable; playing silence");
            }
        }
    }
}

/// Sample name for a user-caused transition, if it is audible.
fn sample_for(change: &StateChange) -> Option<&'static str> {
    match (change.from, change.to) {
        (_, KeyState::Pressed) => Some("press"),
        (_, KeyState::Locked) => Some("lock"),
        (KeyState::Pressed | KeyState::Locked, KeyState::Idle) => Some("release"),
        _ => None,
    }
}

/// Builds a keyboard wrapped for sharing between the gesture pipeline and the
/// IME synchroniser.
pub fn shared_keyboard(keyboard: Keyboard) -> Arc<Mutex<Keyboard>> {
    Arc::new(Mutex::new(keyboard))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
