//! Mock key injector for unit and integration testing.
//!
//! # Why a mock injector?
//!
//! The real injector (`WindowsKeyInjector`) calls `SendInput`, which:
//!
//! - Requires a Windows desktop session to run.
//! - Actually types characters on the test machine.
//! - Cannot be observed directly from Rust test code.
//!
//! The `MockKeyInjector` replaces the OS call with in-memory recording.  Each
//! attempted request is pushed into a `Mutex<Vec<...>>` so tests can inspect
//! exactly what was attempted and in what order.
//!
//! # Scripted outcomes
//!
//! `push_outcome` queues the result of the *next* attempts, front to back.
//! When the script is empty, attempts succeed.  This lets tests drive retry
//! and degradation paths deterministically:
//!
//! ```ignore
//! let injector = Arc::new(MockKeyInjector::new());
//! injector.push_outcome(Err(InjectError::Timeout));   // first attempt fails
//! injector.push_outcome(Ok(()));                      // retry succeeds
//! ```
//!
//! `set_delay` makes every attempt sleep first, letting tests exercise the
//! attempt timeout and supersession windows with `tokio::time::pause`.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use nestboard_core::InjectionRequest;

use super::{InjectError, KeyInjector};

/// A mock injector that records attempts and replays scripted outcomes.
#[derive(Default)]
pub struct MockKeyInjector {
    /// Every request passed to `inject`, one entry per attempt.
    pub attempts: Mutex<Vec<InjectionRequest>>,
    /// Scripted outcomes consumed front to back; empty means success.
    script: Mutex<VecDeque<Result<(), InjectError>>>,
    /// Number of `probe` calls and their scripted outcomes.
    pub probes: Mutex<u32>,
    probe_script: Mutex<VecDeque<Result<(), InjectError>>>,
    /// Artificial latency applied to every attempt before it resolves.
    delay: Mutex<Option<Duration>>,
}

impl MockKeyInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome of the next unscripted attempt.
    pub fn push_outcome(&self, outcome: Result<(), InjectError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Queues the outcome of the next probe call.
    pub fn push_probe_outcome(&self, outcome: Result<(), InjectError>) {
        self.probe_script.lock().unwrap().push_back(outcome);
    }

    /// Makes every subsequent attempt sleep for `delay` before resolving.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Number of attempts recorded so far.
    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl KeyInjector for MockKeyInjector {
    async fn inject(&self, request: &InjectionRequest) -> Result<(), InjectError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.attempts.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn probe(&self) -> Result<(), InjectError> {
        *self.probes.lock().unwrap() += 1;
        self.probe_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}
