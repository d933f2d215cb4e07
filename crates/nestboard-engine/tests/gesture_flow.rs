//! Integration tests for the gesture-to-injection pipeline.
//!
//! These tests exercise the application layer of nestboard-engine end-to-end:
//! `ProcessGestureUseCase` + `Keyboard` + mock infrastructure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};

use nestboard_core::{
    GestureConfig, GestureTrigger, KeyAction, KeyId, KeyRegistry, KeyState, Keyboard,
    MetricsWindow,
};
use nestboard_engine::application::health::{EngineHealth, HealthThresholds, HealthTracker};
use nestboard_engine::application::process_gesture::{
    shared_keyboard, InjectionOutcome, ProcessGestureUseCase, RetryPolicy,
};
use nestboard_engine::infrastructure::injection::mock::MockKeyInjector;
use nestboard_engine::infrastructure::injection::{InjectError, KeyInjector};

// ── Test fixture ──────────────────────────────────────────────────────────────

struct Fixture {
    use_case: Arc<ProcessGestureUseCase>,
    injector: Arc<MockKeyInjector>,
    health: Arc<Mutex<HealthTracker>>,
}

fn fixture(layout: &str, policy: RetryPolicy) -> Fixture {
    let resolution = KeyRegistry::new().resolve(layout);
    let keyboard = shared_keyboard(Keyboard::new(
        resolution.layout_id.clone(),
        &resolution.keys,
        GestureConfig::default(),
    ));
    let injector = Arc::new(MockKeyInjector::new());
    let health = Arc::new(Mutex::new(HealthTracker::new(HealthThresholds {
        degraded_after: 3,
        recovery_streak: 2,
    })));
    let metrics = Arc::new(Mutex::new(MetricsWindow::new(64)));
    let use_case = Arc::new(ProcessGestureUseCase::new(
        keyboard,
        Arc::clone(&injector) as Arc<dyn KeyInjector>,
        None,
        Arc::clone(&health),
        metrics,
        broadcast::channel(64).0,
        policy,
    ));
    Fixture {
        use_case,
        injector,
        health,
    }
}

fn id(s: &str) -> KeyId {
    KeyId::new(s)
}

fn short_click() -> GestureTrigger {
    GestureTrigger::ClickComplete {
        held: Duration::from_millis(80),
    }
}

fn long_click() -> GestureTrigger {
    GestureTrigger::ClickComplete {
        held: Duration::from_millis(700),
    }
}

async fn settle() {
    // Keep successive clicks of the same key past the minimum gesture
    // interval under real time.
    tokio::time::sleep(Duration::from_millis(35)).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_shift_then_letter_delivers_shifted_character_and_release() {
    let f = fixture("ansi-104", RetryPolicy::default());

    f.use_case.handle_gesture(&id("LeftShift"), short_click()).await;
    settle().await;
    let report = f.use_case.handle_gesture(&id("A"), short_click()).await;

    // The A click plus the armed shift's release, both delivered.
    assert_eq!(report.outcomes.len(), 2);
    assert!(report
        .outcomes
        .iter()
        .all(|(_, outcome)| *outcome == InjectionOutcome::Delivered));

    let attempts = f.injector.attempts.lock().unwrap();
    // Shift press, A click, shift release, in gesture order.
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[0].action, KeyAction::Press);
    assert_eq!(attempts[1].key, id("A"));
    assert_eq!(attempts[1].translated, Some('A'));
    assert_eq!(attempts[2].key, id("LeftShift"));
    assert_eq!(attempts[2].action, KeyAction::Release);
}

#[tokio::test]
async fn test_locked_shift_survives_letters_until_unlocked() {
    let f = fixture("ansi-104", RetryPolicy::default());

    f.use_case.handle_gesture(&id("LeftShift"), long_click()).await;
    settle().await;
    f.use_case.handle_gesture(&id("A"), short_click()).await;
    settle().await;
    f.use_case.handle_gesture(&id("B"), short_click()).await;
    settle().await;

    {
        let keyboard = f.use_case.keyboard();
        let keyboard = keyboard.lock().await;
        assert_eq!(keyboard.key_state(&id("LeftShift")), Some(KeyState::Locked));
    }

    // Unlock with a re-click; the release is injected.
    let report = f.use_case.handle_gesture(&id("LeftShift"), short_click()).await;
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(
        f.injector.attempts.lock().unwrap().last().unwrap().action,
        KeyAction::Release
    );
}

#[tokio::test]
async fn test_failed_delivery_leaves_displayed_state_as_transitioned() {
    // The state machine already transitioned when injection fails; the
    // display shows the user's intent and the next correction or gesture
    // reconciles it.
    let policy = RetryPolicy {
        max_retries: 0,
        backoff: Duration::from_millis(1),
        attempt_timeout: Duration::from_millis(150),
    };
    let f = fixture("ansi-104", policy);
    f.injector
        .push_outcome(Err(InjectError::TargetUnavailable("locked desktop".into())));

    let report = f.use_case.handle_gesture(&id("LeftShift"), short_click()).await;

    assert!(matches!(report.outcomes[0].1, InjectionOutcome::Failed(_)));
    let keyboard = f.use_case.keyboard();
    let keyboard = keyboard.lock().await;
    assert_eq!(keyboard.key_state(&id("LeftShift")), Some(KeyState::Pressed));
}

#[tokio::test]
async fn test_repeated_failures_degrade_then_successes_recover() {
    let policy = RetryPolicy {
        max_retries: 0,
        backoff: Duration::from_millis(1),
        attempt_timeout: Duration::from_millis(150),
    };
    let f = fixture("ansi-104", policy);

    for _ in 0..3 {
        f.injector.push_outcome(Err(InjectError::Timeout));
    }
    for key in ["A", "B", "C"] {
        f.use_case.handle_gesture(&id(key), short_click()).await;
    }
    assert_eq!(f.health.lock().await.state(), EngineHealth::Degraded);

    // Script exhausted: subsequent deliveries succeed and restore health.
    f.use_case.handle_gesture(&id("D"), short_click()).await;
    f.use_case.handle_gesture(&id("E"), short_click()).await;
    assert_eq!(f.health.lock().await.state(), EngineHealth::Healthy);
}

#[tokio::test]
async fn test_metrics_window_reflects_mixed_outcomes() {
    let policy = RetryPolicy {
        max_retries: 0,
        backoff: Duration::from_millis(1),
        attempt_timeout: Duration::from_millis(150),
    };
    let f = fixture("ansi-104", policy);
    f.injector.push_outcome(Err(InjectError::Timeout));

    f.use_case.handle_gesture(&id("A"), short_click()).await; // fails
    settle().await;
    f.use_case.handle_gesture(&id("B"), short_click()).await; // succeeds

    let (rate, p95) = f.use_case.metrics_snapshot().await;
    assert_eq!(rate, Some(0.5));
    assert!(p95.is_some());
}

#[tokio::test]
async fn test_disabled_key_produces_nothing_end_to_end() {
    let f = fixture("ansi-104", RetryPolicy::default());

    f.use_case.handle_gesture(&id("A"), GestureTrigger::Disable).await;
    let report = f.use_case.handle_gesture(&id("A"), short_click()).await;

    assert!(report.changes.is_empty());
    assert!(report.outcomes.is_empty());
    assert_eq!(f.injector.attempt_count(), 0);
}

#[tokio::test]
async fn test_korean_layout_toggle_click_injects_ime_vk() {
    let f = fixture("kr-106", RetryPolicy::default());

    let report = f.use_case.handle_gesture(&id("HangulToggle"), short_click()).await;

    assert_eq!(report.outcomes.len(), 1);
    let attempts = f.injector.attempts.lock().unwrap();
    assert_eq!(attempts[0].vk, 0x15);
    // Lock-style toggles flip the OS state with a full click.
    assert_eq!(attempts[0].action, KeyAction::Click);
}
