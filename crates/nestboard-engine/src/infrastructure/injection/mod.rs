//! Input injection port.
//!
//! [`KeyInjector`] is the seam between gesture processing and the OS:
//! the Windows implementation calls `SendInput`, the mock records calls and
//! replays scripted outcomes.  One `inject` call covers one attempt; retry
//! and backoff policy live in the use case, not here.

use async_trait::async_trait;
use thiserror::Error;

use nestboard_core::InjectionRequest;

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Error type for a single injection attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InjectError {
    /// The attempt did not complete within the configured attempt timeout.
    #[error("injection attempt timed out")]
    Timeout,

    /// The target session rejected or could not receive the input right now.
    #[error("target session unavailable: {0}")]
    TargetUnavailable(String),

    /// The OS rejected the injection for lack of privileges.  Not retryable:
    /// the condition will not clear until the process is restarted with the
    /// required rights.
    #[error("injection rejected: insufficient privileges")]
    PermissionDenied,

    /// Any other platform-level failure.
    #[error("platform error: {0}")]
    Platform(String),
}

impl InjectError {
    /// Whether a retry of the same request can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, InjectError::Timeout | InjectError::TargetUnavailable(_))
    }
}

/// Delivers one synthetic input event to the OS.
///
/// Implementations must be cheap to call concurrently; the use case serialises
/// per-key ordering itself.
#[async_trait]
pub trait KeyInjector: Send + Sync {
    /// Performs one delivery attempt for `request`.
    async fn inject(&self, request: &InjectionRequest) -> Result<(), InjectError>;

    /// Cheap liveness check used by the health probe loop while degraded.
    /// Must not produce user-visible input.
    async fn probe(&self) -> Result<(), InjectError>;
}
