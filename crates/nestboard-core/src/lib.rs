//! # nestboard-core
//!
//! Shared library for the NestBoard on-screen keyboard engine containing the
//! key registry, the per-key state machine, the keyboard aggregate, the
//! Windows virtual-key translation table, and the rolling metrics window.
//!
//! This crate is pure domain logic: it has zero dependencies on OS APIs, UI
//! frameworks, async runtimes, or sound/animation decoders.  Everything here
//! can be compiled and unit-tested on any platform.
//!
//! # Architecture overview
//!
//! NestBoard is a virtual keyboard for users with limited hand function.  A
//! pointer gesture on a key region must become a reliable synthetic key event
//! in the foreground application, and the on-screen state must never silently
//! diverge from the real OS keyboard/IME state.  This crate defines:
//!
//! - **`domain`** – The key state machine and the keyboard aggregate.  A
//!   [`domain::key::Key`] owns one key's state; [`domain::keyboard::Keyboard`]
//!   folds gestures over the whole board, translates characters under
//!   armed/locked modifiers, and applies externally-driven corrections.
//!
//! - **`registry`** – Resolves a layout identifier to the ordered set of key
//!   identities and kinds that compose that layout, falling back to the
//!   built-in 104-key default when the identifier is unknown.
//!
//! - **`keymap`** – Named Windows virtual-key constants and a reverse name
//!   table used by the registry and by injector logging.
//!
//! - **`metrics`** – A bounded window of injection health samples with
//!   success-rate and p95-latency aggregates, consumed by the engine's
//!   health check.

pub mod domain;
pub mod keymap;
pub mod metrics;
pub mod registry;

// Re-export the most-used types at the crate root so callers can write
// `nestboard_core::Keyboard` instead of `nestboard_core::domain::keyboard::Keyboard`.
pub use domain::key::{
    ChangeCause, GestureConfig, GestureTrigger, Key, KeyAction, KeyId, KeyKind, KeyState,
    StateChange,
};
pub use domain::keyboard::{InjectionRequest, Keyboard, ModifierMask, ProcessResult};
pub use metrics::{HealthSample, MetricsWindow};
pub use registry::{KeyRegistry, KeySpec, LayoutFallback, LayoutResolution, DEFAULT_LAYOUT};
