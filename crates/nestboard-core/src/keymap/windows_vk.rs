//! Windows Virtual Key (VK) code constants and name table.
//!
//! Reference: Windows Virtual-Key Codes (winuser.h).  VK codes range from
//! 0x00 to 0xFF.  They identify *logical* keys rather than physical scan
//! codes: the letter A is `VK_A = 0x41` on every layout.
//!
//! The registry assigns one of these codes to every key it produces, and the
//! injection engine passes the code straight to `SendInput`.  `VK_NAME_TABLE`
//! is a compile-time constant array of 256 names indexed by VK code, used for
//! log output; codes without a name store `"VK_UNKNOWN"`.

// ── Modifier keys ─────────────────────────────────────────────────────────────
pub const VK_LSHIFT: u8 = 0xA0;
pub const VK_RSHIFT: u8 = 0xA1;
pub const VK_LCONTROL: u8 = 0xA2;
pub const VK_RCONTROL: u8 = 0xA3;
pub const VK_LMENU: u8 = 0xA4; // left Alt
pub const VK_RMENU: u8 = 0xA5; // right Alt
pub const VK_LWIN: u8 = 0x5B;
pub const VK_RWIN: u8 = 0x5C;
pub const VK_APPS: u8 = 0x5D; // context-menu key

// ── Lock and IME keys ─────────────────────────────────────────────────────────
pub const VK_CAPITAL: u8 = 0x14; // Caps Lock
pub const VK_NUMLOCK: u8 = 0x90;
pub const VK_SCROLL: u8 = 0x91;
pub const VK_HANGUL: u8 = 0x15; // native/alternate input-method toggle
pub const VK_HANJA: u8 = 0x19; // Hanja conversion

// ── Control keys ──────────────────────────────────────────────────────────────
pub const VK_BACK: u8 = 0x08;
pub const VK_TAB: u8 = 0x09;
pub const VK_RETURN: u8 = 0x0D;
pub const VK_PAUSE: u8 = 0x13;
pub const VK_ESCAPE: u8 = 0x1B;
pub const VK_SPACE: u8 = 0x20;
pub const VK_SNAPSHOT: u8 = 0x2C; // Print Screen

// ── Navigation cluster ────────────────────────────────────────────────────────
pub const VK_PRIOR: u8 = 0x21; // Page Up
pub const VK_NEXT: u8 = 0x22; // Page Down
pub const VK_END: u8 = 0x23;
pub const VK_HOME: u8 = 0x24;
pub const VK_LEFT: u8 = 0x25;
pub const VK_UP: u8 = 0x26;
pub const VK_RIGHT: u8 = 0x27;
pub const VK_DOWN: u8 = 0x28;
pub const VK_INSERT: u8 = 0x2D;
pub const VK_DELETE: u8 = 0x2E;

// ── Function keys ─────────────────────────────────────────────────────────────
pub const VK_F1: u8 = 0x70;
pub const VK_F2: u8 = 0x71;
pub const VK_F3: u8 = 0x72;
pub const VK_F4: u8 = 0x73;
pub const VK_F5: u8 = 0x74;
pub const VK_F6: u8 = 0x75;
pub const VK_F7: u8 = 0x76;
pub const VK_F8: u8 = 0x77;
pub const VK_F9: u8 = 0x78;
pub const VK_F10: u8 = 0x79;
pub const VK_F11: u8 = 0x7A;
pub const VK_F12: u8 = 0x7B;

// ── OEM punctuation keys (US ANSI positions) ──────────────────────────────────
pub const VK_OEM_1: u8 = 0xBA; // ;
pub const VK_OEM_PLUS: u8 = 0xBB; // =
pub const VK_OEM_COMMA: u8 = 0xBC; // ,
pub const VK_OEM_MINUS: u8 = 0xBD; // -
pub const VK_OEM_PERIOD: u8 = 0xBE; // .
pub const VK_OEM_2: u8 = 0xBF; // /
pub const VK_OEM_3: u8 = 0xC0; // `
pub const VK_OEM_4: u8 = 0xDB; // [
pub const VK_OEM_5: u8 = 0xDC; // \
pub const VK_OEM_6: u8 = 0xDD; // ]
pub const VK_OEM_7: u8 = 0xDE; // '

// ── Numeric keypad ────────────────────────────────────────────────────────────
pub const VK_NUMPAD0: u8 = 0x60;
pub const VK_NUMPAD1: u8 = 0x61;
pub const VK_NUMPAD2: u8 = 0x62;
pub const VK_NUMPAD3: u8 = 0x63;
pub const VK_NUMPAD4: u8 = 0x64;
pub const VK_NUMPAD5: u8 = 0x65;
pub const VK_NUMPAD6: u8 = 0x66;
pub const VK_NUMPAD7: u8 = 0x67;
pub const VK_NUMPAD8: u8 = 0x68;
pub const VK_NUMPAD9: u8 = 0x69;
pub const VK_MULTIPLY: u8 = 0x6A;
pub const VK_ADD: u8 = 0x6B;
pub const VK_SUBTRACT: u8 = 0x6D;
pub const VK_DECIMAL: u8 = 0x6E;
pub const VK_DIVIDE: u8 = 0x6F;

/// Returns the winuser.h-style name for a VK code, for log output.
///
/// Returns `"VK_UNKNOWN"` for codes without an entry.  Never panics; all u8
/// inputs are handled.
pub fn vk_name(vk: u8) -> &'static str {
    VK_NAME_TABLE[vk as usize]
}

/// VK → name table indexed by VK code (0x00–0xFF).
const VK_NAME_TABLE: [&str; 256] = {
    let mut t = ["VK_UNKNOWN"; 256];

    // ── Alphabet (VK_A=0x41 … VK_Z=0x5A) and digit row (VK_0=0x30 … VK_9=0x39)
    t[0x41] = "VK_A";
    t[0x42] = "VK_B";
    t[0x43] = "VK_C";
    t[0x44] = "VK_D";
    t[0x45] = "VK_E";
    t[0x46] = "VK_F";
    t[0x47] = "VK_G";
    t[0x48] = "VK_H";
    t[0x49] = "VK_I";
    t[0x4A] = "VK_J";
    t[0x4B] = "VK_K";
    t[0x4C] = "VK_L";
    t[0x4D] = "VK_M";
    t[0x4E] = "VK_N";
    t[0x4F] = "VK_O";
    t[0x50] = "VK_P";
    t[0x51] = "VK_Q";
    t[0x52] = "VK_R";
    t[0x53] = "VK_S";
    t[0x54] = "VK_T";
    t[0x55] = "VK_U";
    t[0x56] = "VK_V";
    t[0x57] = "VK_W";
    t[0x58] = "VK_X";
    t[0x59] = "VK_Y";
    t[0x5A] = "VK_Z";
    t[0x30] = "VK_0";
    t[0x31] = "VK_1";
    t[0x32] = "VK_2";
    t[0x33] = "VK_3";
    t[0x34] = "VK_4";
    t[0x35] = "VK_5";
    t[0x36] = "VK_6";
    t[0x37] = "VK_7";
    t[0x38] = "VK_8";
    t[0x39] = "VK_9";

    // ── Modifiers ─────────────────────────────────────────────────────────────
    t[0xA0] = "VK_LSHIFT";
    t[0xA1] = "VK_RSHIFT";
    t[0xA2] = "VK_LCONTROL";
    t[0xA3] = "VK_RCONTROL";
    t[0xA4] = "VK_LMENU";
    t[0xA5] = "VK_RMENU";
    t[0x5B] = "VK_LWIN";
    t[0x5C] = "VK_RWIN";
    t[0x5D] = "VK_APPS";

    // ── Locks and IME ─────────────────────────────────────────────────────────
    t[0x14] = "VK_CAPITAL";
    t[0x90] = "VK_NUMLOCK";
    t[0x91] = "VK_SCROLL";
    t[0x15] = "VK_HANGUL";
    t[0x19] = "VK_HANJA";

    // ── Control keys ──────────────────────────────────────────────────────────
    t[0x08] = "VK_BACK";
    t[0x09] = "VK_TAB";
    t[0x0D] = "VK_RETURN";
    t[0x13] = "VK_PAUSE";
    t[0x1B] = "VK_ESCAPE";
    t[0x20] = "VK_SPACE";
    t[0x2C] = "VK_SNAPSHOT";

    // ── Navigation ────────────────────────────────────────────────────────────
    t[0x21] = "VK_PRIOR";
    t[0x22] = "VK_NEXT";
    t[0x23] = "VK_END";
    t[0x24] = "VK_HOME";
    t[0x25] = "VK_LEFT";
    t[0x26] = "VK_UP";
    t[0x27] = "VK_RIGHT";
    t[0x28] = "VK_DOWN";
    t[0x2D] = "VK_INSERT";
    t[0x2E] = "VK_DELETE";

    // ── Function keys ─────────────────────────────────────────────────────────
    t[0x70] = "VK_F1";
    t[0x71] = "VK_F2";
    t[0x72] = "VK_F3";
    t[0x73] = "VK_F4";
    t[0x74] = "VK_F5";
    t[0x75] = "VK_F6";
    t[0x76] = "VK_F7";
    t[0x77] = "VK_F8";
    t[0x78] = "VK_F9";
    t[0x79] = "VK_F10";
    t[0x7A] = "VK_F11";
    t[0x7B] = "VK_F12";

    // ── OEM punctuation ───────────────────────────────────────────────────────
    t[0xBA] = "VK_OEM_1";
    t[0xBB] = "VK_OEM_PLUS";
    t[0xBC] = "VK_OEM_COMMA";
    t[0xBD] = "VK_OEM_MINUS";
    t[0xBE] = "VK_OEM_PERIOD";
    t[0xBF] = "VK_OEM_2";
    t[0xC0] = "VK_OEM_3";
    t[0xDB] = "VK_OEM_4";
    t[0xDC] = "VK_OEM_5";
    t[0xDD] = "VK_OEM_6";
    t[0xDE] = "VK_OEM_7";

    // ── Numpad ────────────────────────────────────────────────────────────────
    t[0x60] = "VK_NUMPAD0";
    t[0x61] = "VK_NUMPAD1";
    t[0x62] = "VK_NUMPAD2";
    t[0x63] = "VK_NUMPAD3";
    t[0x64] = "VK_NUMPAD4";
    t[0x65] = "VK_NUMPAD5";
    t[0x66] = "VK_NUMPAD6";
    t[0x67] = "VK_NUMPAD7";
    t[0x68] = "VK_NUMPAD8";
    t[0x69] = "VK_NUMPAD9";
    t[0x6A] = "VK_MULTIPLY";
    t[0x6B] = "VK_ADD";
    t[0x6D] = "VK_SUBTRACT";
    t[0x6E] = "VK_DECIMAL";
    t[0x6F] = "VK_DIVIDE";

    t
};

// ── Tests ─────────────────────────────────────────────────────────────────────
