//! NestBoard engine entry point.
//!
//! Wires together all infrastructure services and starts the Tokio async
//! runtime.  The presentation layer (key widgets, pointer capture) connects
//! to the [`ProcessGestureUseCase`] handle; this binary runs the engine
//! headless.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config, resolve layout, build Keyboard
//!  └─ start services
//!       ├─ ProcessGestureUseCase  (shared handle for the UI)
//!       ├─ SyncImeUseCase         (OS input-method poll loop)
//!       ├─ health probe loop      (periodic injector self-test)
//!       └─ feedback maintenance   (idle reclamation + resource reports)
//!
//! Both use cases publish on one state-changed broadcast channel; the
//! presentation layer subscribes via `ProcessGestureUseCase::subscribe_changes`.
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nestboard_core::{KeyId, KeyRegistry, Keyboard, MetricsWindow};

use nestboard_engine::application::health::{
    run_probe_loop, HealthThresholds, HealthTracker,
};
use nestboard_engine::application::process_gesture::{
    shared_keyboard, ProcessGestureUseCase, RetryPolicy,
};
use nestboard_engine::application::sync_ime::SyncImeUseCase;
use nestboard_engine::infrastructure::feedback::{
    run_maintenance, CachePolicy, FeedbackCache, FsAssetSource, SwitchProfile,
};
use nestboard_engine::infrastructure::ime::ImeStateProbe;
use nestboard_engine::infrastructure::injection::KeyInjector;
use nestboard_engine::infrastructure::storage::config::{self, EngineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so the log level default can come from it.
    let cfg = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load config, using defaults: {e}");
            EngineConfig::default()
        }
    };

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cfg.engine.log_level.clone())),
        )
        .init();

    info!("NestBoard engine starting");

    // ── Keyboard ──────────────────────────────────────────────────────────────
    let resolution = KeyRegistry::new().resolve(&cfg.engine.layout);
    if let Some(fallback) = &resolution.fallback {
        warn!(
            requested = %fallback.requested,
            resolved = %resolution.layout_id,
            "configured layout unknown; using default"
        );
    }
    info!(
        layout = %resolution.layout_id,
        keys = resolution.keys.len(),
        "layout resolved"
    );
    let keyboard = shared_keyboard(Keyboard::new(
        resolution.layout_id.clone(),
        &resolution.keys,
        cfg.gesture.to_gesture_config(),
    ));

    // ── Platform services ─────────────────────────────────────────────────────
    let injector = make_injector();
    let ime_probe = make_ime_probe();

    // ── Feedback cache ────────────────────────────────────────────────────────
    let profile = SwitchProfile::from_id(&cfg.feedback.switch_type).unwrap_or_else(|| {
        warn!(
            requested = %cfg.feedback.switch_type,
            "unknown switch profile; using default"
        );
        SwitchProfile::default()
    });
    let asset_root = config::config_dir()
        .map(|dir| dir.join("sounds"))
        .unwrap_or_else(|_| "sounds".into());
    let feedback = Arc::new(FeedbackCache::new(
        Arc::new(FsAssetSource::new(asset_root)),
        profile,
        CachePolicy {
            capacity: cfg.feedback.cache_capacity,
            max_idle: Duration::from_secs(cfg.feedback.max_idle_secs),
            load_timeout: Duration::from_millis(cfg.feedback.load_timeout_ms),
        },
    ));

    // ── Health and metrics ────────────────────────────────────────────────────
    let health = Arc::new(Mutex::new(HealthTracker::new(HealthThresholds {
        degraded_after: cfg.injection.degraded_threshold,
        recovery_streak: cfg.injection.recovery_streak,
    })));
    let metrics = Arc::new(Mutex::new(MetricsWindow::new(cfg.injection.metrics_window)));

    // ── Use cases ─────────────────────────────────────────────────────────────
    // One state-changed stream for both use cases; receivers are created on
    // demand by subscribers.
    let (changes_tx, _) = broadcast::channel(256);
    let gestures = Arc::new(ProcessGestureUseCase::new(
        Arc::clone(&keyboard),
        Arc::clone(&injector),
        Some(Arc::clone(&feedback)),
        Arc::clone(&health),
        metrics,
        changes_tx.clone(),
        RetryPolicy {
            max_retries: cfg.injection.max_retries,
            backoff: Duration::from_millis(cfg.injection.retry_backoff_ms),
            attempt_timeout: Duration::from_millis(cfg.injection.attempt_timeout_ms),
        },
    ));
    let ime_sync = Arc::new(SyncImeUseCase::new(
        Arc::clone(&keyboard),
        ime_probe,
        KeyId::new("HangulToggle"),
        Duration::from_millis(cfg.ime.poll_interval_ms),
        changes_tx,
    ));

    // ── Background services ───────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    {
        let ime_sync = Arc::clone(&ime_sync);
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { ime_sync.run(shutdown).await });
    }
    tokio::spawn(run_probe_loop(
        Arc::clone(&health),
        Arc::clone(&injector),
        Duration::from_millis(cfg.injection.probe_interval_ms),
        shutdown_rx.clone(),
    ));
    tokio::spawn(run_maintenance(
        Arc::clone(&feedback),
        Duration::from_secs(cfg.feedback.report_interval_secs),
        shutdown_rx,
    ));

    info!("NestBoard engine ready.  Press Ctrl-C to exit.");

    // The presentation layer drives `gestures` from here on; the headless
    // binary keeps the handle alive and blocks until shutdown.
    let _gestures = gestures;
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    shutdown_tx.send(true).ok();

    // Give background loops a beat to observe the flag before exiting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    info!("NestBoard engine stopped");
    Ok(())
}

// ── Platform selection ────────────────────────────────────────────────────────

#[cfg(target_os = "windows")]
fn make_injector() -> Arc<dyn KeyInjector> {
    use nestboard_engine::infrastructure::injection::windows::WindowsKeyInjector;
    Arc::new(WindowsKeyInjector::new())
}

#[cfg(not(target_os = "windows"))]
fn make_injector() -> Arc<dyn KeyInjector> {
    use nestboard_engine::infrastructure::injection::mock::MockKeyInjector;
    warn!("no platform injector on this OS; input injection is inert");
    Arc::new(MockKeyInjector::new())
}

#[cfg(target_os = "windows")]
fn make_ime_probe() -> Arc<dyn ImeStateProbe> {
    use nestboard_engine::infrastructure::ime::windows::WindowsImeProbe;
    Arc::new(WindowsImeProbe::new())
}

#[cfg(not(target_os = "windows"))]
fn make_ime_probe() -> Arc<dyn ImeStateProbe> {
    use nestboard_engine::infrastructure::ime::mock::MockImeProbe;
    warn!("no platform IME probe on this OS; input-method state reads as unknown");
    Arc::new(MockImeProbe::default())
}
