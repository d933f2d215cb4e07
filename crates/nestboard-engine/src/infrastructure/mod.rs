//! Infrastructure layer: OS input injection, IME observation, audio feedback
//! assets, and configuration persistence.
//!
//! Platform-specific implementations are selected at compile time via
//! `#[cfg(target_os = ...)]`; every port also ships a mock implementation for
//! tests and non-Windows development hosts.

pub mod feedback;
pub mod ime;
pub mod injection;
pub mod storage;
