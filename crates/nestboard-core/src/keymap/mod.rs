//! Windows virtual-key constants and name lookup.
//!
//! NestBoard injects input through the Win32 `SendInput` surface, so the
//! registry stores a Windows virtual-key code on every [`crate::KeySpec`].
//! The constants and the reverse name table live here so the registry and the
//! injector log output agree on one source of truth.

pub mod windows_vk;

pub use windows_vk::vk_name;
