//! Input-method state observation port.
//!
//! The OS owns the real input-method state; NestBoard only mirrors it.  The
//! probe reports what the OS says *right now* and is deliberately allowed to
//! say [`ImeObservation::Unknown`] when the state cannot be read (no focused
//! window, secure desktop, probe error).  Unknown is never treated as "off":
//! the synchroniser keeps the last displayed state until a definite
//! observation arrives.

use thiserror::Error;

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// One reading of the OS input-method conversion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImeObservation {
    /// The alternate (non-native) input method is active.
    Active,
    /// The native input method is active.
    Inactive,
    /// The state could not be determined; keep the current display.
    Unknown,
}

/// Error type for probe failures that are worth logging (as opposed to the
/// expected [`ImeObservation::Unknown`] reading).
#[derive(Debug, Error)]
pub enum ImeProbeError {
    #[error("platform error reading IME state: {0}")]
    Platform(String),
}

/// Reads the current OS input-method state.
///
/// Called on a polling interval by the synchroniser; implementations must be
/// cheap and must never block on user input.
pub trait ImeStateProbe: Send + Sync {
    fn observe(&self) -> Result<ImeObservation, ImeProbeError>;
}
