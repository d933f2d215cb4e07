//! Windows IME state observation via GetKeyState.
//!
//! The Hangul/alternate input mode is exposed as the low-order (toggle) bit
//! of `GetKeyState(VK_HANGUL)`.  GetKeyState reads the state of the calling
//! thread's input queue, so a reading is always available; this probe never
//! reports `Unknown` on Windows.

#![cfg(target_os = "windows")]

use windows::Win32::UI::Input::KeyboardAndMouse::GetKeyState;

use nestboard_core::keymap::windows_vk::VK_HANGUL;

use super::{ImeObservation, ImeProbeError, ImeStateProbe};

/// Windows implementation of [`ImeStateProbe`].
pub struct WindowsImeProbe;

impl WindowsImeProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsImeProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ImeStateProbe for WindowsImeProbe {
    fn observe(&self) -> Result<ImeObservation, ImeProbeError> {
        // SAFETY: GetKeyState is always safe to call.
        let state = unsafe { GetKeyState(VK_HANGUL as i32) };
        // Low bit is the toggle state; the sign bit is the held state.
        if state & 0x0001 != 0 {
            Ok(ImeObservation::Active)
        } else {
            Ok(ImeObservation::Inactive)
        }
    }
}
