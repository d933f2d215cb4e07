//! Keyboard aggregate: ordered keys, modifier-mask projection, translation.
//!
//! The keyboard folds pointer gestures over its keys and turns completed
//! clicks into [`InjectionRequest`]s for the injection engine.  Two rules the
//! rest of the system relies on:
//!
//! - The modifier mask is **always** recomputed by folding over the keys; it
//!   is a cached projection of key states, never an independently mutated
//!   source of truth.
//! - Externally observed IME/lock state is applied through
//!   [`Keyboard::apply_correction`], which bypasses gesture rules and tags
//!   the resulting change as a forced correction so the feedback layer can
//!   stay silent.

use std::collections::HashMap;
use std::time::Instant;

use tracing::warn;
use uuid::Uuid;

use crate::domain::key::{
    ChangeCause, GestureConfig, GestureTrigger, Key, KeyAction, KeyId, KeyKind, KeyState,
    StateChange,
};
use crate::registry::KeySpec;

/// Bitset of currently engaged (armed or locked) modifiers and toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierMask(u16);

impl ModifierMask {
    pub const SHIFT: u16 = 1 << 0;
    pub const CTRL: u16 = 1 << 1;
    pub const ALT: u16 = 1 << 2;
    pub const META: u16 = 1 << 3;
    pub const CAPS_LOCK: u16 = 1 << 4;
    pub const NUM_LOCK: u16 = 1 << 5;
    pub const SCROLL_LOCK: u16 = 1 << 6;
    /// The alternate (non-native) input method toggle is engaged.
    pub const ALT_INPUT: u16 = 1 << 7;

    pub fn contains(self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Maps a key identity to its modifier-mask bit, if it has one.
fn mask_bit(id: &KeyId) -> Option<u16> {
    match id.as_str() {
        "LeftShift" | "RightShift" => Some(ModifierMask::SHIFT),
        "LeftCtrl" | "RightCtrl" => Some(ModifierMask::CTRL),
        "LeftAlt" | "RightAlt" => Some(ModifierMask::ALT),
        "LeftMeta" | "RightMeta" => Some(ModifierMask::META),
        "CapsLock" => Some(ModifierMask::CAPS_LOCK),
        "NumLock" => Some(ModifierMask::NUM_LOCK),
        "ScrollLock" => Some(ModifierMask::SCROLL_LOCK),
        "HangulToggle" => Some(ModifierMask::ALT_INPUT),
        _ => None,
    }
}

/// A value object describing one synthetic input the engine should emit.
///
/// Created per user gesture, consumed synchronously by the injection engine,
/// and discarded after completion or final failure.  Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionRequest {
    /// Correlation id for logs and outcome reporting.
    pub request_id: Uuid,
    pub key: KeyId,
    /// Windows virtual-key code to deliver.
    pub vk: u8,
    pub action: KeyAction,
    /// Translated character payload (e.g. `'A'` for a shifted `a` click).
    pub translated: Option<char>,
}

/// Everything one processed gesture produced.
#[derive(Debug, Default)]
pub struct ProcessResult {
    pub changes: Vec<StateChange>,
    pub requests: Vec<InjectionRequest>,
}

/// An ordered collection of keys driving one target session.
#[derive(Debug)]
pub struct Keyboard {
    layout_id: String,
    keys: Vec<Key>,
    index: HashMap<KeyId, usize>,
    config: GestureConfig,
}

impl Keyboard {
    /// Builds a keyboard from an ordered key list (normally a
    /// [`crate::registry::LayoutResolution`]).
    pub fn new(layout_id: impl Into<String>, specs: &[KeySpec], config: GestureConfig) -> Self {
        let keys: Vec<Key> = specs.iter().cloned().map(Key::new).collect();
        let index = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.id().clone(), i))
            .collect();
        Self {
            layout_id: layout_id.into(),
            keys,
            index,
            config,
        }
    }

    /// The opaque active-layout identifier.
    pub fn layout_id(&self) -> &str {
        &self.layout_id
    }

    /// Iterates keys in layout order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    /// Current state of one key, or `None` for an unknown identity.
    pub fn key_state(&self, id: &KeyId) -> Option<KeyState> {
        self.index.get(id).map(|&i| self.keys[i].state())
    }

    /// The aggregate modifier mask, recomputed by folding over all keys whose
    /// kind is modifier/toggle and whose state is armed or locked.
    pub fn modifier_mask(&self) -> ModifierMask {
        let bits = self
            .keys
            .iter()
            .filter(|k| k.kind().is_latching() && k.state().is_engaged())
            .filter_map(|k| mask_bit(k.id()))
            .fold(0u16, |acc, bit| acc | bit);
        ModifierMask(bits)
    }

    /// Processes a gesture with the current time.  See [`Self::process_at`].
    pub fn process(&mut self, id: &KeyId, trigger: GestureTrigger) -> ProcessResult {
        self.process_at(id, trigger, Instant::now())
    }

    /// Processes a gesture on one key at time `at`.
    ///
    /// Returns the state changes and injection requests the gesture produced.
    /// A completed click on a character key is translated under the modifier
    /// mask captured *before* the transition, then consumes any armed
    /// (Pressed, not Locked) modifiers back to Idle, emitting a release
    /// request for each.  Unknown identities are no-ops logged at `warn`.
    pub fn process_at(&mut self, id: &KeyId, trigger: GestureTrigger, at: Instant) -> ProcessResult {
        let Some(&idx) = self.index.get(id) else {
            warn!(key = %id, "gesture for unknown key ignored");
            return ProcessResult::default();
        };

        let is_character_click = matches!(trigger, GestureTrigger::ClickComplete { .. })
            && self.keys[idx].kind() == KeyKind::Character;
        let translated = if is_character_click {
            self.translated_char(idx)
        } else {
            None
        };

        let config = self.config;
        let outcome = self.keys[idx].apply(trigger, &config, at);

        let mut result = ProcessResult {
            changes: outcome.changes,
            requests: Vec::new(),
        };
        let Some(action) = outcome.intent else {
            // Debounced or stateless transition: nothing to inject and no
            // modifier consumption.
            return result;
        };

        result.requests.push(InjectionRequest {
            request_id: Uuid::new_v4(),
            key: self.keys[idx].id().clone(),
            vk: self.keys[idx].spec().vk,
            action,
            translated,
        });

        if is_character_click {
            self.consume_armed_modifiers(&mut result);
        }
        result
    }

    /// Force-transitions a toggle key so its state matches `engaged` as
    /// observed at the OS level, bypassing gesture rules.
    ///
    /// Returns the change (cause [`ChangeCause::ForcedCorrection`]) when the
    /// key disagreed with the observation, `None` when it already agreed.
    /// Corrections never produce injection requests: the OS state already
    /// changed, only the display is being reconciled.
    pub fn apply_correction(&mut self, id: &KeyId, engaged: bool) -> Option<StateChange> {
        let Some(&idx) = self.index.get(id) else {
            warn!(key = %id, "correction for unknown key ignored");
            return None;
        };
        let key = &mut self.keys[idx];
        if !key.kind().is_latching() {
            warn!(key = %id, kind = ?key.kind(), "correction targets a momentary key; ignoring");
            return None;
        }
        if key.state().is_engaged() == engaged {
            return None;
        }
        let target = if engaged { KeyState::Locked } else { KeyState::Idle };
        key.force_state(target)
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    /// Character payload for a click on `idx` under the current mask.
    ///
    /// Caps Lock inverts the shift sense for letters only; symbols and digits
    /// follow Shift alone.
    fn translated_char(&self, idx: usize) -> Option<char> {
        let spec = self.keys[idx].spec();
        let base = spec.unshifted?;
        let mask = self.modifier_mask();
        let shift = mask.contains(ModifierMask::SHIFT);
        let effective_shift = if base.is_ascii_alphabetic() {
            shift != mask.contains(ModifierMask::CAPS_LOCK)
        } else {
            shift
        };
        if effective_shift {
            spec.shifted.or(Some(base))
        } else {
            Some(base)
        }
    }

    /// Reverts armed held-modifiers to Idle and emits their release requests.
    /// Locked modifiers and lock-style toggles persist.
    fn consume_armed_modifiers(&mut self, result: &mut ProcessResult) {
        for key in &mut self.keys {
            if key.kind() != KeyKind::Modifier {
                continue;
            }
            if let Some(change) = key.consume_armed() {
                result.requests.push(InjectionRequest {
                    request_id: Uuid::new_v4(),
                    key: change.key.clone(),
                    vk: key.spec().vk,
                    action: KeyAction::Release,
                    translated: None,
                });
                result.changes.push(change);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
