//! SyncImeUseCase: reconciles the displayed input-method toggle with the OS.
//!
//! The OS owns the real input-method state; the on-screen toggle is a
//! display.  Users can flip the real state outside NestBoard (hardware
//! keyboard, another utility), so the synchroniser polls the OS and applies
//! at most one forced correction per observation.  An `Unknown` reading
//! keeps the current display: absence of evidence is not evidence of "off".
//!
//! Corrections never inject input.  The OS state already changed; only the
//! picture is being fixed.
//!
//! Corrections are applied by a background loop the presentation layer never
//! calls, so each one is also published on the shared state-changed
//! `broadcast` channel (the same stream the gesture pipeline publishes on).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use nestboard_core::{KeyId, Keyboard, StateChange};

use crate::infrastructure::ime::{ImeObservation, ImeStateProbe};

/// The Sync IME use case.
pub struct SyncImeUseCase {
    keyboard: Arc<Mutex<Keyboard>>,
    probe: Arc<dyn ImeStateProbe>,
    toggle_key: KeyId,
    poll_interval: Duration,
    /// State-changed stream shared with the gesture pipeline.
    changes: broadcast::Sender<StateChange>,
}

impl SyncImeUseCase {
    pub fn new(
        keyboard: Arc<Mutex<Keyboard>>,
        probe: Arc<dyn ImeStateProbe>,
        toggle_key: KeyId,
        poll_interval: Duration,
        changes: broadcast::Sender<StateChange>,
    ) -> Self {
        Self {
            keyboard,
            probe,
            toggle_key,
            poll_interval,
            changes,
        }
    }

    /// Takes one observation and applies at most one correction.
    ///
    /// Returns the forced correction, or `None` when the display already
    /// agreed, the state was unreadable, or the probe failed.
    pub async fn observe_once(&self) -> Option<StateChange> {
        let observation = match self.probe.observe() {
            Ok(observation) => observation,
            Err(e) => {
                warn!(error = %e, "IME probe failed; keeping displayed state");
                return None;
            }
        };

        let engaged = match observation {
            ImeObservation::Active => true,
            ImeObservation::Inactive => false,
            ImeObservation::Unknown => {
                debug!("IME state unreadable; keeping displayed state");
                return None;
            }
        };

        let change = {
            let mut keyboard = self.keyboard.lock().await;
            keyboard.apply_correction(&self.toggle_key, engaged)
        };
        if let Some(change) = &change {
            info!(
                key = %change.key,
                from = ?change.from,
                to = ?change.to,
                "display corrected to match OS input-method state"
            );
            // Err means no live subscribers, which is fine headless.
            let _ = self.changes.send(change.clone());
        }
        change
    }

    /// Subscribes to the state-changed stream this use case publishes on.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    /// Polling loop.  Runs until `shutdown` flips to true or its sender is
    /// dropped.  A layout without the toggle key makes the loop exit
    /// immediately rather than warn on every poll.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        {
            let keyboard = self.keyboard.lock().await;
            if keyboard.key_state(&self.toggle_key).is_none() {
                info!(
                    key = %self.toggle_key,
                    layout = keyboard.layout_id(),
                    "layout has no input-method toggle; synchroniser idle"
                );
                return;
            }
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("IME synchroniser stopping");
                        return;
                    }
                    continue;
                }
            }
            self.observe_once().await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ime::mock::MockImeProbe;
    use nestboard_core::{
        ChangeCause, GestureConfig, GestureTrigger, KeyRegistry, KeyState,
    };

    fn toggle() -> KeyId {
        KeyId::new("HangulToggle")
    }

    fn make_use_case(initial: ImeObservation) -> (SyncImeUseCase, Arc<MockImeProbe>) {
        let resolution = KeyRegistry::new().resolve("kr-106");
        let keyboard = Arc::new(Mutex::new(Keyboard::new(
            resolution.layout_id.clone(),
            &resolution.keys,
            GestureConfig::default(),
        )));
        let probe = Arc::new(MockImeProbe::new(initial));
        let use_case = SyncImeUseCase::new(
            keyboard,
            Arc::clone(&probe) as Arc<dyn ImeStateProbe>,
            toggle(),
            Duration::from_millis(200),
            broadcast::channel(16).0,
        );
        (use_case, probe)
    }

    async fn toggle_state(uc: &SyncImeUseCase) -> KeyState {
        uc.keyboard
            .lock()
            .await
            .key_state(&toggle())
            .expect("toggle key present")
    }

    #[tokio::test]
    async fn test_active_observation_locks_displayed_toggle() {
        // Arrange
        let (uc, _) = make_use_case(ImeObservation::Active);

        // Act
        let change = uc.observe_once().await.expect("correction");

        // Assert
        assert_eq!(change.to, KeyState::Locked);
        assert_eq!(change.cause, ChangeCause::ForcedCorrection);
        assert_eq!(toggle_state(&uc).await, KeyState::Locked);
    }

    #[tokio::test]
    async fn test_agreement_produces_no_correction() {
        let (uc, _) = make_use_case(ImeObservation::Inactive);

        assert!(uc.observe_once().await.is_none());
        assert_eq!(toggle_state(&uc).await, KeyState::Idle);
    }

    #[tokio::test]
    async fn test_inactive_observation_reverts_user_locked_toggle() {
        // Arrange – the user locked the toggle but the OS says native input
        let (uc, probe) = make_use_case(ImeObservation::Inactive);
        {
            let mut keyboard = uc.keyboard.lock().await;
            keyboard.process(
                &toggle(),
                GestureTrigger::ClickComplete {
                    held: Duration::from_millis(700),
                },
            );
        }
        assert_eq!(toggle_state(&uc).await, KeyState::Locked);
        probe.set_observation(ImeObservation::Inactive);

        // Act
        let change = uc.observe_once().await.expect("correction");

        // Assert
        assert_eq!(change.to, KeyState::Idle);
        assert_eq!(toggle_state(&uc).await, KeyState::Idle);
    }

    #[tokio::test]
    async fn test_unknown_observation_keeps_displayed_state() {
        // Arrange – toggle is displayed engaged; OS state becomes unreadable
        let (uc, probe) = make_use_case(ImeObservation::Active);
        uc.observe_once().await;
        assert_eq!(toggle_state(&uc).await, KeyState::Locked);
        probe.set_observation(ImeObservation::Unknown);

        // Act
        let change = uc.observe_once().await;

        // Assert – Unknown is not "off"; the lock stays
        assert!(change.is_none());
        assert_eq!(toggle_state(&uc).await, KeyState::Locked);
    }

    #[tokio::test]
    async fn test_probe_error_keeps_displayed_state() {
        let (uc, probe) = make_use_case(ImeObservation::Active);
        uc.observe_once().await;
        probe.fail_next("no focused window");

        assert!(uc.observe_once().await.is_none());
        assert_eq!(toggle_state(&uc).await, KeyState::Locked);
    }

    #[tokio::test]
    async fn test_repeated_agreement_applies_no_further_corrections() {
        let (uc, _) = make_use_case(ImeObservation::Active);

        let first = uc.observe_once().await;
        let second = uc.observe_once().await;
        let third = uc.observe_once().await;

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(third.is_none());
    }

    #[tokio::test]
    async fn test_correction_is_published_on_the_change_stream() {
        // Arrange – the display will disagree with the first observation
        let (uc, _) = make_use_case(ImeObservation::Active);
        let mut rx = uc.subscribe_changes();

        // Act
        uc.observe_once().await.expect("correction");

        // Assert – the background correction is visible to subscribers
        let change = rx.try_recv().expect("published change");
        assert_eq!(change.key, toggle());
        assert_eq!(change.to, KeyState::Locked);
        assert_eq!(change.cause, ChangeCause::ForcedCorrection);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_polls_on_interval_until_shutdown() {
        // Arrange
        let (uc, probe) = make_use_case(ImeObservation::Inactive);
        let uc = Arc::new(uc);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = {
            let uc = Arc::clone(&uc);
            tokio::spawn(async move { uc.run(shutdown_rx).await })
        };

        // Act – let a few poll intervals elapse, then stop
        tokio::time::sleep(Duration::from_millis(650)).await;
        shutdown_tx.send(true).expect("send shutdown");
        runner.await.expect("runner");

        // Assert – first tick fires immediately, then every 200ms
        let polls = *probe.observation_count.lock().unwrap();
        assert!(polls >= 3, "expected at least 3 polls, got {polls}");
    }

    #[tokio::test]
    async fn test_run_exits_when_layout_lacks_toggle_key() {
        // Arrange – ansi-104 has no HangulToggle
        let resolution = KeyRegistry::new().resolve("ansi-104");
        let keyboard = Arc::new(Mutex::new(Keyboard::new(
            resolution.layout_id.clone(),
            &resolution.keys,
            GestureConfig::default(),
        )));
        let probe = Arc::new(MockImeProbe::new(ImeObservation::Active));
        let uc = SyncImeUseCase::new(
            keyboard,
            Arc::clone(&probe) as Arc<dyn ImeStateProbe>,
            toggle(),
            Duration::from_millis(200),
            broadcast::channel(16).0,
        );
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        // Act – returns instead of looping
        uc.run(shutdown_rx).await;

        // Assert
        assert_eq!(*probe.observation_count.lock().unwrap(), 0);
    }
}
