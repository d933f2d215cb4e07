//! Windows input injection via the SendInput API.
//!
//! Each [`InjectionRequest`] becomes one or two `KEYBDINPUT` entries (down,
//! up, or both for a click).  `SendInput` reports how many entries the system
//! accepted; a short count with no recorded OS error means the input queue
//! blocked the injection (surfaced as `TargetUnavailable` so the use case
//! retries), ERROR_ACCESS_DENIED means UIPI rejected it (fatal), and any
//! other OS error is surfaced as `Platform`.

#![cfg(target_os = "windows")]

use async_trait::async_trait;
use windows::Win32::Foundation::GetLastError;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetKeyState, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_EXTENDEDKEY,
    KEYEVENTF_KEYUP, VIRTUAL_KEY,
};

use nestboard_core::keymap::windows_vk::{vk_name, VK_CAPITAL};
use nestboard_core::{InjectionRequest, KeyAction};

use super::{InjectError, KeyInjector};

// ERROR_ACCESS_DENIED: UIPI blocked the injection (target has higher integrity).
const ACCESS_DENIED: u32 = 5;

/// Windows implementation of [`KeyInjector`] using SendInput.
pub struct WindowsKeyInjector;

impl WindowsKeyInjector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsKeyInjector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyInjector for WindowsKeyInjector {
    async fn inject(&self, request: &InjectionRequest) -> Result<(), InjectError> {
        let inputs = build_inputs(request.vk, request.action);
        // SAFETY: `inputs` is a stack array of fully-initialised INPUT
        // structures for the duration of the call.
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };

        if sent as usize == inputs.len() {
            return Ok(());
        }

        // SAFETY: GetLastError is always safe to call.
        let code = unsafe { GetLastError() }.0;
        Err(map_send_error(sent as usize, inputs.len(), request.vk, code))
    }

    async fn probe(&self) -> Result<(), InjectError> {
        // GetKeyState touches the same input state machinery SendInput feeds
        // without producing user-visible input.
        // SAFETY: GetKeyState is always safe to call.
        let _ = unsafe { GetKeyState(VK_CAPITAL as i32) };
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Maps a short `SendInput` count to the port error taxonomy.
fn map_send_error(sent: usize, expected: usize, vk: u8, code: u32) -> InjectError {
    match code {
        ACCESS_DENIED => InjectError::PermissionDenied,
        // No error recorded: the input queue dropped the entries, which
        // clears once the target session accepts input again.
        0 => InjectError::TargetUnavailable(format!(
            "SendInput accepted {sent}/{expected} entries for {}",
            vk_name(vk),
        )),
        _ => InjectError::Platform(format!(
            "SendInput accepted {sent}/{expected} entries for {} (os error {code})",
            vk_name(vk),
        )),
    }
}

fn build_inputs(vk: u8, action: KeyAction) -> Vec<INPUT> {
    match action {
        KeyAction::Press => vec![keybd_input(vk, false)],
        KeyAction::Release => vec![keybd_input(vk, true)],
        KeyAction::Click => vec![keybd_input(vk, false), keybd_input(vk, true)],
    }
}

fn keybd_input(vk: u8, key_up: bool) -> INPUT {
    let mut flags = windows::Win32::UI::Input::KeyboardAndMouse::KEYBD_EVENT_FLAGS(0);
    if key_up {
        flags |= KEYEVENTF_KEYUP;
    }

    // Extended keys need the EXTENDEDKEY flag
    let extended_vks: &[u8] = &[
        0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, // nav
        0x2D, 0x2E, // Insert, Delete
        0x5B, 0x5C, // Win keys
        0xA3, 0xA5, // Right Ctrl, Right Alt
        0x6F, // Numpad divide
    ];
    if extended_vks.contains(&vk) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }

    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk as u16),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}
