//! Domain entities for the NestBoard engine.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: the per-key state machine and the keyboard aggregate.  Code
//! here never imports OS APIs, async runtimes, or asset decoders, so every
//! transition rule can be unit-tested on any platform.
//!
//! Outer layers (the injection engine, the IME synchronizer, the feedback
//! cache) depend on this module; it never depends on them.

/// Per-key state machine.
///
/// See [`key::Key`] for the main type.
pub mod key;

/// Keyboard aggregate: ordered keys, modifier-mask projection, translation.
///
/// See [`keyboard::Keyboard`] for the main type.
pub mod keyboard;
