//! Per-key state machine.
//!
//! Each on-screen key owns a [`KeyState`] and a transition function that is
//! **total** over (state, trigger): unrecognised combinations are no-ops
//! logged at `warn`, never errors.  Long-press detection is an explicit
//! duration carried by the completed gesture, not a suspended timer, so the
//! machine has no hidden concurrency.
//!
//! State diagram:
//!
//! ```text
//! Idle ⇄ Hover                    (pointer enter / leave)
//! Idle → Pressed → Idle           (momentary click: character/function keys)
//! Idle → Pressed                  (short click: modifier/toggle keys, "armed")
//! Idle → Locked                   (long press: modifier/toggle keys)
//! Pressed → Locked                (long press while armed)
//! Pressed → Idle, Locked → Idle   (re-click: unarm / unlock)
//! any → Disabled → Idle           (explicit disable / re-enable only)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::registry::KeySpec;

/// Stable logical identifier for a key (e.g. `"LeftShift"`, `"A"`,
/// `"HangulToggle"`).
///
/// Identity is immutable once created.  The newtype wraps `Arc<str>` so ids
/// can be cloned into events and injection requests without allocating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(Arc<str>);

impl KeyId {
    /// Creates a key id from a string.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The behavioural class of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Produces a character; momentary press, consumes armed modifiers.
    Character,
    /// Held modifier (Shift, Ctrl, Alt, Meta); arms on short click, locks on
    /// long press.
    Modifier,
    /// Lock-style key whose OS effect persists until reversed (Caps Lock,
    /// Num Lock, the input-method toggle).
    Toggle,
    /// Momentary non-character key (Enter, F1, arrows, ...).
    Function,
}

impl KeyKind {
    /// Returns `true` for kinds that complete a click by returning to Idle.
    pub fn is_momentary(self) -> bool {
        matches!(self, KeyKind::Character | KeyKind::Function)
    }

    /// Returns `true` for kinds with armed/locked semantics.
    pub fn is_latching(self) -> bool {
        matches!(self, KeyKind::Modifier | KeyKind::Toggle)
    }
}

/// The visual/logical state of a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Idle,
    Hover,
    Pressed,
    Locked,
    Disabled,
}

impl KeyState {
    /// Returns `true` when the key currently contributes to the modifier
    /// mask (armed or locked).
    pub fn is_engaged(self) -> bool {
        matches!(self, KeyState::Pressed | KeyState::Locked)
    }
}

/// Why a state change happened.
///
/// The feedback layer uses this to suppress click sounds for corrections
/// driven by externally observed OS state rather than by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    UserGesture,
    ForcedCorrection,
}

/// A state-changed notification, emitted for every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub key: KeyId,
    pub from: KeyState,
    pub to: KeyState,
    pub cause: ChangeCause,
}

/// A pointer gesture or configuration trigger delivered to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureTrigger {
    /// The pointer entered the key region.
    PointerEnter,
    /// The pointer left the key region without completing a click.
    PointerLeave,
    /// A primary click completed; `held` is the measured press duration.
    ClickComplete { held: Duration },
    /// Configuration disabled the key for this session.
    Disable,
    /// Configuration re-enabled the key.
    Enable,
}

/// The logical OS action a completed gesture asks the injection engine for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Key-down only (engaging a held modifier).
    Press,
    /// Key-up only (releasing a held modifier).
    Release,
    /// Down immediately followed by up.
    Click,
}

/// Gesture timing knobs, supplied by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureConfig {
    /// Click duration at or above which a latching key locks.
    pub long_press: Duration,
    /// Minimum interval between two clicks of the same key; sub-interval
    /// re-clicks are dropped.
    pub min_gesture_interval: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            long_press: Duration::from_millis(600),
            min_gesture_interval: Duration::from_millis(30),
        }
    }
}

/// Result of applying one trigger to one key.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    /// Zero, one, or two state changes (a momentary click emits two).
    pub changes: Vec<StateChange>,
    /// The OS action the gesture calls for, if any.
    pub intent: Option<KeyAction>,
}

/// One on-screen key: immutable identity plus mutable state.
#[derive(Debug)]
pub struct Key {
    spec: KeySpec,
    state: KeyState,
    last_click: Option<Instant>,
}

impl Key {
    /// Creates a key in the Idle state.
    pub fn new(spec: KeySpec) -> Self {
        Self {
            spec,
            state: KeyState::Idle,
            last_click: None,
        }
    }

    pub fn id(&self) -> &KeyId {
        &self.spec.id
    }

    pub fn kind(&self) -> KeyKind {
        self.spec.kind
    }

    pub fn state(&self) -> KeyState {
        self.state
    }

    pub fn spec(&self) -> &KeySpec {
        &self.spec
    }

    /// Applies a trigger at time `at`, returning the resulting state changes
    /// and injection intent.
    ///
    /// Total over (state, trigger): combinations without a defined transition
    /// are no-ops logged at `warn`.
    pub fn apply(&mut self, trigger: GestureTrigger, cfg: &GestureConfig, at: Instant) -> ApplyOutcome {
        match (self.state, trigger) {
            (KeyState::Disabled, GestureTrigger::Enable) => {
                self.transition_one(KeyState::Idle, ChangeCause::UserGesture)
            }
            (KeyState::Disabled, other) => {
                warn!(key = %self.spec.id, trigger = ?other, "trigger ignored: key is disabled");
                ApplyOutcome::default()
            }
            (_, GestureTrigger::Disable) => {
                self.transition_one(KeyState::Disabled, ChangeCause::UserGesture)
            }
            (_, GestureTrigger::Enable) => {
                warn!(key = %self.spec.id, "enable ignored: key is not disabled");
                ApplyOutcome::default()
            }
            (KeyState::Idle, GestureTrigger::PointerEnter) => {
                self.transition_one(KeyState::Hover, ChangeCause::UserGesture)
            }
            (KeyState::Hover, GestureTrigger::PointerLeave) => {
                self.transition_one(KeyState::Idle, ChangeCause::UserGesture)
            }
            (_, GestureTrigger::ClickComplete { held }) => self.click(held, cfg, at),
            (state, trigger) => {
                warn!(key = %self.spec.id, ?state, ?trigger, "no transition defined; ignoring");
                ApplyOutcome::default()
            }
        }
    }

    /// Force-transitions the key to `target`, bypassing gesture rules.
    ///
    /// Used for IME-driven corrections.  Returns `None` when the key is
    /// already in the target state or is disabled (disabled keys stay down
    /// until configuration re-enables them).
    pub fn force_state(&mut self, target: KeyState) -> Option<StateChange> {
        if self.state == KeyState::Disabled {
            warn!(key = %self.spec.id, ?target, "correction ignored: key is disabled");
            return None;
        }
        if self.state == target {
            return None;
        }
        Some(self.transition(target, ChangeCause::ForcedCorrection))
    }

    /// Reverts an armed (Pressed) latching key to Idle after its effect was
    /// consumed by a character key press.
    ///
    /// Returns `None` unless the key is currently armed.
    pub fn consume_armed(&mut self) -> Option<StateChange> {
        if self.state != KeyState::Pressed {
            return None;
        }
        Some(self.transition(KeyState::Idle, ChangeCause::UserGesture))
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn click(&mut self, held: Duration, cfg: &GestureConfig, at: Instant) -> ApplyOutcome {
        // Minimum gesture interval: drop sub-interval re-clicks of the same
        // key.  This is the only debouncing the machine performs.
        if let Some(prev) = self.last_click {
            if at.saturating_duration_since(prev) < cfg.min_gesture_interval {
                warn!(key = %self.spec.id, "click dropped: below minimum gesture interval");
                return ApplyOutcome::default();
            }
        }
        self.last_click = Some(at);

        if self.spec.kind.is_momentary() {
            // Momentary: Pressed then immediately back to Idle.
            let down = self.transition(KeyState::Pressed, ChangeCause::UserGesture);
            let up = self.transition(KeyState::Idle, ChangeCause::UserGesture);
            return ApplyOutcome {
                changes: vec![down, up],
                intent: Some(KeyAction::Click),
            };
        }

        // Latching (modifier/toggle).
        let long = held >= cfg.long_press;
        let (target, intent) = match self.state {
            KeyState::Locked => (KeyState::Idle, Some(self.release_intent())),
            KeyState::Pressed if long => (KeyState::Locked, None), // already engaged
            KeyState::Pressed => (KeyState::Idle, Some(self.release_intent())),
            _ if long => (KeyState::Locked, Some(self.engage_intent())),
            _ => (KeyState::Pressed, Some(self.engage_intent())),
        };
        ApplyOutcome {
            changes: vec![self.transition(target, ChangeCause::UserGesture)],
            intent,
        }
    }

    /// OS action that engages this latching key.  Held modifiers stay down;
    /// lock-style toggles flip on a full click.
    fn engage_intent(&self) -> KeyAction {
        match self.spec.kind {
            KeyKind::Toggle => KeyAction::Click,
            _ => KeyAction::Press,
        }
    }

    fn release_intent(&self) -> KeyAction {
        match self.spec.kind {
            KeyKind::Toggle => KeyAction::Click,
            _ => KeyAction::Release,
        }
    }

    fn transition(&mut self, to: KeyState, cause: ChangeCause) -> StateChange {
        let from = self.state;
        self.state = to;
        StateChange {
            key: self.spec.id.clone(),
            from,
            to,
            cause,
        }
    }

    fn transition_one(&mut self, to: KeyState, cause: ChangeCause) -> ApplyOutcome {
        ApplyOutcome {
            changes: vec![self.transition(to, cause)],
            intent: None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::KeySpec;

    fn character_key() -> Key {
        Key::new(KeySpec::character("A", 0x41, 'a', 'A'))
    }

    fn modifier_key() -> Key {
        Key::new(KeySpec::modifier("LeftShift", 0xA0))
    }

    fn toggle_key() -> Key {
        Key::new(KeySpec::toggle("HangulToggle", 0x15))
    }

    fn cfg() -> GestureConfig {
        GestureConfig::default()
    }

    fn short_click() -> GestureTrigger {
        GestureTrigger::ClickComplete { held: Duration::from_millis(80) }
    }

    fn long_click() -> GestureTrigger {
        GestureTrigger::ClickComplete { held: Duration::from_millis(700) }
    }

    // ── Pointer transitions ───────────────────────────────────────────────────

    #[test]
    fn test_pointer_enter_moves_idle_to_hover() {
        let mut key = character_key();

        let out = key.apply(GestureTrigger::PointerEnter, &cfg(), Instant::now());

        assert_eq!(key.state(), KeyState::Hover);
        assert_eq!(out.changes.len(), 1);
        assert_eq!(out.changes[0].cause, ChangeCause::UserGesture);
    }

    #[test]
    fn test_pointer_leave_returns_hover_to_idle() {
        let mut key = character_key();
        key.apply(GestureTrigger::PointerEnter, &cfg(), Instant::now());

        key.apply(GestureTrigger::PointerLeave, &cfg(), Instant::now());

        assert_eq!(key.state(), KeyState::Idle);
    }

    #[test]
    fn test_pointer_leave_on_idle_key_is_noop() {
        let mut key = character_key();

        let out = key.apply(GestureTrigger::PointerLeave, &cfg(), Instant::now());

        assert!(out.changes.is_empty());
        assert!(out.intent.is_none());
        assert_eq!(key.state(), KeyState::Idle);
    }

    // ── Momentary clicks ──────────────────────────────────────────────────────

    #[test]
    fn test_character_click_emits_pressed_then_idle() {
        let mut key = character_key();

        let out = key.apply(short_click(), &cfg(), Instant::now());

        let states: Vec<KeyState> = out.changes.iter().map(|c| c.to).collect();
        assert_eq!(states, vec![KeyState::Pressed, KeyState::Idle]);
        assert_eq!(out.intent, Some(KeyAction::Click));
        assert_eq!(key.state(), KeyState::Idle);
    }

    #[test]
    fn test_function_key_long_press_is_still_momentary() {
        // Long press has latching meaning only for modifier/toggle kinds.
        let mut key = Key::new(KeySpec::function("Enter", 0x0D));

        let out = key.apply(long_click(), &cfg(), Instant::now());

        assert_eq!(key.state(), KeyState::Idle);
        assert_eq!(out.intent, Some(KeyAction::Click));
    }

    // ── Latching clicks ───────────────────────────────────────────────────────

    #[test]
    fn test_modifier_short_click_arms_key() {
        let mut key = modifier_key();

        let out = key.apply(short_click(), &cfg(), Instant::now());

        assert_eq!(key.state(), KeyState::Pressed);
        assert_eq!(out.intent, Some(KeyAction::Press));
    }

    #[test]
    fn test_modifier_long_press_locks_key() {
        let mut key = modifier_key();

        let out = key.apply(long_click(), &cfg(), Instant::now());

        assert_eq!(key.state(), KeyState::Locked);
        assert_eq!(out.intent, Some(KeyAction::Press));
    }

    #[test]
    fn test_locked_modifier_unlocks_on_next_click() {
        let mut key = modifier_key();
        let t0 = Instant::now();
        key.apply(long_click(), &cfg(), t0);

        let out = key.apply(short_click(), &cfg(), t0 + Duration::from_millis(500));

        assert_eq!(key.state(), KeyState::Idle);
        assert_eq!(out.intent, Some(KeyAction::Release));
    }

    #[test]
    fn test_armed_modifier_unarms_on_reclick() {
        let mut key = modifier_key();
        let t0 = Instant::now();
        key.apply(short_click(), &cfg(), t0);

        let out = key.apply(short_click(), &cfg(), t0 + Duration::from_millis(500));

        assert_eq!(key.state(), KeyState::Idle);
        assert_eq!(out.intent, Some(KeyAction::Release));
    }

    #[test]
    fn test_toggle_key_uses_click_intent_both_directions() {
        // Lock-style keys flip OS state on a full click, engaging and releasing.
        let mut key = toggle_key();
        let t0 = Instant::now();

        let engage = key.apply(long_click(), &cfg(), t0);
        assert_eq!(key.state(), KeyState::Locked);
        assert_eq!(engage.intent, Some(KeyAction::Click));

        let release = key.apply(short_click(), &cfg(), t0 + Duration::from_secs(1));
        assert_eq!(key.state(), KeyState::Idle);
        assert_eq!(release.intent, Some(KeyAction::Click));
    }

    // ── Minimum gesture interval ──────────────────────────────────────────────

    #[test]
    fn test_subinterval_reclick_is_dropped() {
        let mut key = character_key();
        let t0 = Instant::now();
        key.apply(short_click(), &cfg(), t0);

        let out = key.apply(short_click(), &cfg(), t0 + Duration::from_millis(10));

        assert!(out.changes.is_empty());
        assert!(out.intent.is_none());
    }

    #[test]
    fn test_reclick_after_interval_is_processed() {
        let mut key = character_key();
        let t0 = Instant::now();
        key.apply(short_click(), &cfg(), t0);

        let out = key.apply(short_click(), &cfg(), t0 + Duration::from_millis(50));

        assert_eq!(out.intent, Some(KeyAction::Click));
    }

    #[test]
    fn test_rapid_double_toggle_processes_in_arrival_order() {
        // Two clicks beyond the minimum interval: armed then unarmed, strictly
        // in arrival order.
        let mut key = modifier_key();
        let t0 = Instant::now();

        let first = key.apply(short_click(), &cfg(), t0);
        let second = key.apply(short_click(), &cfg(), t0 + Duration::from_millis(40));

        assert_eq!(first.changes[0].to, KeyState::Pressed);
        assert_eq!(second.changes[0].to, KeyState::Idle);
    }

    // ── Disable / enable ──────────────────────────────────────────────────────

    #[test]
    fn test_disable_is_reachable_from_any_state() {
        let mut key = modifier_key();
        key.apply(long_click(), &cfg(), Instant::now());
        assert_eq!(key.state(), KeyState::Locked);

        key.apply(GestureTrigger::Disable, &cfg(), Instant::now());

        assert_eq!(key.state(), KeyState::Disabled);
    }

    #[test]
    fn test_disabled_key_ignores_gestures_until_enabled() {
        let mut key = character_key();
        key.apply(GestureTrigger::Disable, &cfg(), Instant::now());

        let out = key.apply(short_click(), &cfg(), Instant::now());
        assert!(out.changes.is_empty());
        assert_eq!(key.state(), KeyState::Disabled);

        key.apply(GestureTrigger::Enable, &cfg(), Instant::now());
        assert_eq!(key.state(), KeyState::Idle);
    }

    #[test]
    fn test_disabled_key_rejects_forced_correction() {
        let mut key = toggle_key();
        key.apply(GestureTrigger::Disable, &cfg(), Instant::now());

        assert!(key.force_state(KeyState::Locked).is_none());
        assert_eq!(key.state(), KeyState::Disabled);
    }

    // ── Forced corrections ────────────────────────────────────────────────────

    #[test]
    fn test_force_state_bypasses_gesture_rules() {
        let mut key = toggle_key();

        let change = key.force_state(KeyState::Locked).expect("change");

        assert_eq!(change.cause, ChangeCause::ForcedCorrection);
        assert_eq!(key.state(), KeyState::Locked);
    }

    #[test]
    fn test_force_state_to_current_state_emits_nothing() {
        let mut key = toggle_key();

        assert!(key.force_state(KeyState::Idle).is_none());
    }

    // ── Armed consumption ─────────────────────────────────────────────────────

    #[test]
    fn test_consume_armed_reverts_pressed_to_idle_as_user_gesture() {
        let mut key = modifier_key();
        key.apply(short_click(), &cfg(), Instant::now());

        let change = key.consume_armed().expect("change");

        assert_eq!(change.to, KeyState::Idle);
        assert_eq!(change.cause, ChangeCause::UserGesture);
    }

    #[test]
    fn test_consume_armed_does_not_touch_locked_key() {
        let mut key = modifier_key();
        key.apply(long_click(), &cfg(), Instant::now());

        assert!(key.consume_armed().is_none());
        assert_eq!(key.state(), KeyState::Locked);
    }
}
