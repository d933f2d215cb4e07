//! Key registry: resolves a layout identifier to an ordered key list.
//!
//! The registry is a pure function of layout → keys with a cached parse per
//! layout identifier.  An unknown or corrupt identifier never fails the
//! session: resolution falls back to the built-in 104-key default and signals
//! a [`LayoutFallback`] to the caller instead.
//!
//! Built-in layouts:
//!
//! - `ansi-104` – the standard US ANSI full-size board (104 keys).  This is
//!   the documented default.
//! - `kr-106`   – the ANSI board plus the Korean `HangulToggle` and
//!   `HanjaConvert` keys on the bottom row.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::domain::key::{KeyId, KeyKind};
use crate::keymap::windows_vk::*;

/// The layout used when the requested identifier cannot be resolved.
pub const DEFAULT_LAYOUT: &str = "ansi-104";

/// Immutable identity and translation data for one key.
///
/// `unshifted`/`shifted` carry the character payload used when the injection
/// request needs a translated character (e.g. `'a'` vs `'A'` under Shift).
/// Display labels are resolved by the presentation layer, not owned here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    pub id: KeyId,
    pub kind: KeyKind,
    /// Windows virtual-key code delivered to the injection engine.
    pub vk: u8,
    pub unshifted: Option<char>,
    pub shifted: Option<char>,
}

impl KeySpec {
    /// A character-producing key.
    pub fn character(id: &str, vk: u8, unshifted: char, shifted: char) -> Self {
        Self {
            id: KeyId::new(id),
            kind: KeyKind::Character,
            vk,
            unshifted: Some(unshifted),
            shifted: Some(shifted),
        }
    }

    /// A held modifier key (Shift, Ctrl, Alt, Meta).
    pub fn modifier(id: &str, vk: u8) -> Self {
        Self {
            id: KeyId::new(id),
            kind: KeyKind::Modifier,
            vk,
            unshifted: None,
            shifted: None,
        }
    }

    /// A lock-style toggle key (Caps Lock, Num Lock, IME toggle).
    pub fn toggle(id: &str, vk: u8) -> Self {
        Self {
            id: KeyId::new(id),
            kind: KeyKind::Toggle,
            vk,
            unshifted: None,
            shifted: None,
        }
    }

    /// A momentary non-character key (Enter, F-keys, navigation).
    pub fn function(id: &str, vk: u8) -> Self {
        Self {
            id: KeyId::new(id),
            kind: KeyKind::Function,
            vk,
            unshifted: None,
            shifted: None,
        }
    }
}

/// Signalled when a requested layout could not be resolved and the default
/// was substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutFallback {
    /// The identifier the caller asked for.
    pub requested: String,
}

/// The outcome of resolving a layout identifier.
#[derive(Debug, Clone)]
pub struct LayoutResolution {
    /// The identifier actually resolved (the default when a fallback occurred).
    pub layout_id: String,
    /// Ordered key specifications composing the layout.
    pub keys: Arc<[KeySpec]>,
    /// Present when the requested identifier was unknown.
    pub fallback: Option<LayoutFallback>,
}

/// Resolves layout identifiers to ordered key lists, caching each parse.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    cache: HashMap<String, Arc<[KeySpec]>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `requested` to an ordered key list.
    ///
    /// Unknown identifiers resolve to [`DEFAULT_LAYOUT`] with
    /// `fallback: Some(..)` rather than failing.  Repeated resolutions of the
    /// same identifier return the cached parse.
    pub fn resolve(&mut self, requested: &str) -> LayoutResolution {
        let (layout_id, fallback) = match requested {
            "ansi-104" | "kr-106" => (requested.to_string(), None),
            _ => {
                warn!(%requested, default = DEFAULT_LAYOUT, "unknown layout; falling back to default");
                (
                    DEFAULT_LAYOUT.to_string(),
                    Some(LayoutFallback {
                        requested: requested.to_string(),
                    }),
                )
            }
        };

        let keys = self
            .cache
            .entry(layout_id.clone())
            .or_insert_with(|| build_layout(&layout_id))
            .clone();

        LayoutResolution {
            layout_id,
            keys,
            fallback,
        }
    }
}

fn build_layout(layout_id: &str) -> Arc<[KeySpec]> {
    match layout_id {
        "kr-106" => kr_106().into(),
        // DEFAULT_LAYOUT and anything routed to it.
        _ => ansi_104().into(),
    }
}

/// The standard 104-key US ANSI board, row by row.
fn ansi_104() -> Vec<KeySpec> {
    let mut keys = Vec::with_capacity(104);

    // ── Function row ──────────────────────────────────────────────────────────
    keys.push(KeySpec::function("Escape", VK_ESCAPE));
    for (i, vk) in (VK_F1..=VK_F12).enumerate() {
        keys.push(KeySpec::function(&format!("F{}", i + 1), vk));
    }
    keys.push(KeySpec::function("PrintScreen", VK_SNAPSHOT));
    keys.push(KeySpec::toggle("ScrollLock", VK_SCROLL));
    keys.push(KeySpec::function("Pause", VK_PAUSE));

    // ── Digit row ─────────────────────────────────────────────────────────────
    keys.push(KeySpec::character("Backquote", VK_OEM_3, '`', '~'));
    for (digit, shifted) in [
        ('1', '!'),
        ('2', '@'),
        ('3', '#'),
        ('4', '$'),
        ('5', '%'),
        ('6', '^'),
        ('7', '&'),
        ('8', '*'),
        ('9', '('),
        ('0', ')'),
    ] {
        keys.push(KeySpec::character(&digit.to_string(), digit as u8, digit, shifted));
    }
    keys.push(KeySpec::character("Minus", VK_OEM_MINUS, '-', '_'));
    keys.push(KeySpec::character("Equal", VK_OEM_PLUS, '=', '+'));
    keys.push(KeySpec::function("Backspace", VK_BACK));

    // ── Letter rows (QWERTY order) ────────────────────────────────────────────
    keys.push(KeySpec::function("Tab", VK_TAB));
    for c in ['q', 'w', 'e', 'r', 't', 'y', 'u', 'i', 'o', 'p'] {
        keys.push(letter(c));
    }
    keys.push(KeySpec::character("BracketLeft", VK_OEM_4, '[', '{'));
    keys.push(KeySpec::character("BracketRight", VK_OEM_6, ']', '}'));
    keys.push(KeySpec::character("Backslash", VK_OEM_5, '\\', '|'));

    keys.push(KeySpec::toggle("CapsLock", VK_CAPITAL));
    for c in ['a', 's', 'd', 'f', 'g', 'h', 'j', 'k', 'l'] {
        keys.push(letter(c));
    }
    keys.push(KeySpec::character("Semicolon", VK_OEM_1, ';', ':'));
    keys.push(KeySpec::character("Quote", VK_OEM_7, '\'', '"'));
    keys.push(KeySpec::function("Enter", VK_RETURN));

    keys.push(KeySpec::modifier("LeftShift", VK_LSHIFT));
    for c in ['z', 'x', 'c', 'v', 'b', 'n', 'm'] {
        keys.push(letter(c));
    }
    keys.push(KeySpec::character("Comma", VK_OEM_COMMA, ',', '<'));
    keys.push(KeySpec::character("Period", VK_OEM_PERIOD, '.', '>'));
    keys.push(KeySpec::character("Slash", VK_OEM_2, '/', '?'));
    keys.push(KeySpec::modifier("RightShift", VK_RSHIFT));

    // ── Bottom row ────────────────────────────────────────────────────────────
    keys.push(KeySpec::modifier("LeftCtrl", VK_LCONTROL));
    keys.push(KeySpec::modifier("LeftMeta", VK_LWIN));
    keys.push(KeySpec::modifier("LeftAlt", VK_LMENU));
    keys.push(KeySpec::character("Space", VK_SPACE, ' ', ' '));
    keys.push(KeySpec::modifier("RightAlt", VK_RMENU));
    keys.push(KeySpec::modifier("RightMeta", VK_RWIN));
    keys.push(KeySpec::function("ContextMenu", VK_APPS));
    keys.push(KeySpec::modifier("RightCtrl", VK_RCONTROL));

    // ── Navigation cluster and arrows ─────────────────────────────────────────
    keys.push(KeySpec::function("Insert", VK_INSERT));
    keys.push(KeySpec::function("Home", VK_HOME));
    keys.push(KeySpec::function("PageUp", VK_PRIOR));
    keys.push(KeySpec::function("Delete", VK_DELETE));
    keys.push(KeySpec::function("End", VK_END));
    keys.push(KeySpec::function("PageDown", VK_NEXT));
    keys.push(KeySpec::function("ArrowUp", VK_UP));
    keys.push(KeySpec::function("ArrowLeft", VK_LEFT));
    keys.push(KeySpec::function("ArrowDown", VK_DOWN));
    keys.push(KeySpec::function("ArrowRight", VK_RIGHT));

    // ── Numeric keypad ────────────────────────────────────────────────────────
    keys.push(KeySpec::toggle("NumLock", VK_NUMLOCK));
    keys.push(KeySpec::character("NumpadDivide", VK_DIVIDE, '/', '/'));
    keys.push(KeySpec::character("NumpadMultiply", VK_MULTIPLY, '*', '*'));
    keys.push(KeySpec::character("NumpadSubtract", VK_SUBTRACT, '-', '-'));
    for d in 7..=9u8 {
        keys.push(numpad_digit(d));
    }
    keys.push(KeySpec::character("NumpadAdd", VK_ADD, '+', '+'));
    for d in 4..=6u8 {
        keys.push(numpad_digit(d));
    }
    for d in 1..=3u8 {
        keys.push(numpad_digit(d));
    }
    keys.push(KeySpec::function("NumpadEnter", VK_RETURN));
    keys.push(numpad_digit(0));
    keys.push(KeySpec::character("NumpadDecimal", VK_DECIMAL, '.', '.'));

    keys
}

/// The Korean 106-key board: ANSI plus Hangul/Hanja on the bottom row.
fn kr_106() -> Vec<KeySpec> {
    let mut keys = ansi_104();
    // The physical board places these beside the spacebar; the registry only
    // guarantees a stable order, so they follow the bottom row block.
    let after_bottom_row = keys
        .iter()
        .position(|k| k.id.as_str() == "RightCtrl")
        .map(|i| i + 1)
        .unwrap_or(keys.len());
    keys.insert(after_bottom_row, KeySpec::function("HanjaConvert", VK_HANJA));
    keys.insert(after_bottom_row, KeySpec::toggle("HangulToggle", VK_HANGUL));
    keys
}

fn letter(c: char) -> KeySpec {
    let upper = c.to_ascii_uppercase();
    KeySpec::character(&upper.to_string(), upper as u8, c, upper)
}

fn numpad_digit(d: u8) -> KeySpec {
    let c = (b'0' + d) as char;
    KeySpec::character(&format!("Numpad{d}"), VK_NUMPAD0 + d, c, c)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_has_exactly_104_keys() {
        let mut registry = KeyRegistry::new();

        let res = registry.resolve("ansi-104");

        assert_eq!(res.keys.len(), 104);
        assert!(res.fallback.is_none());
    }

    #[test]
    fn test_korean_layout_has_106_keys_including_ime_toggles() {
        let mut registry = KeyRegistry::new();

        let res = registry.resolve("kr-106");

        assert_eq!(res.keys.len(), 106);
        assert!(res.keys.iter().any(|k| k.id.as_str() == "HangulToggle"));
        assert!(res.keys.iter().any(|k| k.id.as_str() == "HanjaConvert"));
    }

    #[test]
    fn test_unknown_layout_falls_back_to_default_with_signal() {
        let mut registry = KeyRegistry::new();

        let res = registry.resolve("unknown-layout-v9");

        assert_eq!(res.layout_id, DEFAULT_LAYOUT);
        assert_eq!(res.keys.len(), 104);
        assert_eq!(
            res.fallback,
            Some(LayoutFallback {
                requested: "unknown-layout-v9".to_string()
            })
        );
    }

    #[test]
    fn test_repeated_resolution_returns_cached_parse() {
        let mut registry = KeyRegistry::new();

        let first = registry.resolve("ansi-104");
        let second = registry.resolve("ansi-104");

        // Same Arc allocation, not a re-parse.
        assert!(Arc::ptr_eq(&first.keys, &second.keys));
    }

    #[test]
    fn test_key_identities_are_unique_within_a_layout() {
        let mut registry = KeyRegistry::new();
        let res = registry.resolve("kr-106");

        let mut ids: Vec<&str> = res.keys.iter().map(|k| k.id.as_str()).collect();
        ids.sort_unstable();
        let before = ids.len();
        ids.dedup();

        assert_eq!(ids.len(), before, "duplicate key identity in layout");
    }

    #[test]
    fn test_letter_specs_carry_shift_translation() {
        let mut registry = KeyRegistry::new();
        let res = registry.resolve("ansi-104");

        let a = res
            .keys
            .iter()
            .find(|k| k.id.as_str() == "A")
            .expect("A key present");

        assert_eq!(a.kind, KeyKind::Character);
        assert_eq!(a.vk, 0x41);
        assert_eq!(a.unshifted, Some('a'));
        assert_eq!(a.shifted, Some('A'));
    }

    #[test]
    fn test_modifier_and_toggle_kinds_assigned() {
        let mut registry = KeyRegistry::new();
        let res = registry.resolve("ansi-104");

        let kind_of = |id: &str| res.keys.iter().find(|k| k.id.as_str() == id).map(|k| k.kind);

        assert_eq!(kind_of("LeftShift"), Some(KeyKind::Modifier));
        assert_eq!(kind_of("CapsLock"), Some(KeyKind::Toggle));
        assert_eq!(kind_of("NumLock"), Some(KeyKind::Toggle));
        assert_eq!(kind_of("Enter"), Some(KeyKind::Function));
    }
}
