//! # Chord Definitions
//!
//! Static description of one vendor chord and the table a hardware profile
//! carries. Tables are built at compile time with the `const fn` builders:
//!
//! ```
//! use handycon::action::LogicalButton;
//! use handycon::chord::codes::*;
//! use handycon::chord::definition::ChordDefinition;
//!
//! const QAM: ChordDefinition =
//!     ChordDefinition::queued(LogicalButton::Button2, &[&[KEY_RIGHTCTRL, KEY_RIGHTALT, KEY_DELETE]])
//!         .haptic_on_press(150);
//! assert!(QAM.releases_on(KEY_DELETE));
//! ```

use std::time::Duration;

use evdev::{EventType, InputEvent, MiscCode};

use crate::action::LogicalButton;

/// Which event arms a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Key-down (value 1)
    Press,
    /// Key autorepeat (value 2), used for long-press upgrades
    Hold,
    /// `MSC_SCAN` carrying this vendor scancode while the set is held
    Scan(i32),
}

impl TriggerKind {
    /// Whether `event` is the kind of event that arms this chord
    #[must_use]
    pub fn accepts(self, event: &InputEvent) -> bool {
        match self {
            TriggerKind::Press => event.event_type() == EventType::KEY && event.value() == 1,
            TriggerKind::Hold => event.event_type() == EventType::KEY && event.value() == 2,
            TriggerKind::Scan(scan) => {
                event.event_type() == EventType::MISC
                    && event.code() == MiscCode::MSC_SCAN.0
                    && event.value() == scan
            }
        }
    }
}

/// When the logical press is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireMode {
    /// Press at resolution (key-up), release on the following event
    Queued,
    /// Press when armed (key-down), release at resolution
    Instant,
}

/// Condition that must hold for a chord to arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The gyro answered its last probe
    Gyro,
    /// The companion launcher is installed
    Companion,
    /// The companion launcher is not installed
    NoCompanion,
    /// No power-button suspend sequence is in flight
    NoSuspendPending,
    /// Nothing else is armed
    Idle,
}

/// A rumble pulse on the real gamepad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HapticCue {
    pub duration: Duration,
}

impl HapticCue {
    #[must_use]
    pub const fn millis(ms: u64) -> Self {
        Self { duration: Duration::from_millis(ms) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticTiming {
    OnArm,
    OnPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordHaptic {
    pub timing: HapticTiming,
    pub cue: HapticCue,
}

/// One vendor chord bound to a logical button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordDefinition {
    pub button: LogicalButton,
    /// Alternative key sets, each sorted ascending; any one arms the chord
    pub triggers: &'static [&'static [u16]],
    pub kind: TriggerKind,
    /// Codes whose key-up resolves the chord; empty means any trigger code
    pub release: &'static [u16],
    /// Keys allowed to stay held when the chord resolves
    pub residual: &'static [u16],
    pub mode: FireMode,
    /// Buttons disarmed when this chord arms, on top of strict subsets
    pub supersedes: &'static [LogicalButton],
    pub haptic: Option<ChordHaptic>,
    pub gate: Option<Gate>,
    /// Resolved by a distinct follow-up code, so never self-healed
    pub deferred: bool,
}

impl ChordDefinition {
    const fn new(button: LogicalButton, triggers: &'static [&'static [u16]], mode: FireMode) -> Self {
        Self {
            button,
            triggers,
            kind: TriggerKind::Press,
            release: &[],
            residual: &[],
            mode,
            supersedes: &[],
            haptic: None,
            gate: None,
            deferred: false,
        }
    }

    /// Chord that presses and releases its button once the keys come up
    #[must_use]
    pub const fn queued(button: LogicalButton, triggers: &'static [&'static [u16]]) -> Self {
        Self::new(button, triggers, FireMode::Queued)
    }

    /// Chord that presses on key-down and releases on key-up
    #[must_use]
    pub const fn instant(button: LogicalButton, triggers: &'static [&'static [u16]]) -> Self {
        Self::new(button, triggers, FireMode::Instant)
    }

    #[must_use]
    pub const fn hold(self) -> Self {
        Self { kind: TriggerKind::Hold, ..self }
    }

    #[must_use]
    pub const fn scan(self, scan: i32) -> Self {
        Self { kind: TriggerKind::Scan(scan), ..self }
    }

    #[must_use]
    pub const fn release(self, release: &'static [u16]) -> Self {
        Self { release, ..self }
    }

    #[must_use]
    pub const fn residual(self, residual: &'static [u16]) -> Self {
        Self { residual, ..self }
    }

    #[must_use]
    pub const fn supersedes(self, supersedes: &'static [LogicalButton]) -> Self {
        Self { supersedes, ..self }
    }

    #[must_use]
    pub const fn haptic_on_arm(self, ms: u64) -> Self {
        Self {
            haptic: Some(ChordHaptic { timing: HapticTiming::OnArm, cue: HapticCue::millis(ms) }),
            ..self
        }
    }

    #[must_use]
    pub const fn haptic_on_press(self, ms: u64) -> Self {
        Self {
            haptic: Some(ChordHaptic { timing: HapticTiming::OnPress, cue: HapticCue::millis(ms) }),
            ..self
        }
    }

    #[must_use]
    pub const fn gated(self, gate: Gate) -> Self {
        Self { gate: Some(gate), ..self }
    }

    #[must_use]
    pub const fn deferred(self) -> Self {
        Self { deferred: true, ..self }
    }

    /// Trigger set equal to `active`, if any
    ///
    /// `active` must be sorted ascending, as reported by the kernel key state.
    #[must_use]
    pub fn trigger_matching(&self, active: &[u16]) -> Option<&'static [u16]> {
        self.triggers.iter().copied().find(|set| *set == active)
    }

    /// Whether a key-up of `code` can resolve this chord
    #[must_use]
    pub fn releases_on(&self, code: u16) -> bool {
        if self.release.is_empty() {
            self.triggers.iter().any(|set| set.contains(&code))
        } else {
            self.release.contains(&code)
        }
    }

    /// Whether `active` is the residual set this chord resolves into
    #[must_use]
    pub fn residual_matches(&self, active: &[u16]) -> bool {
        self.residual == active
    }

    /// Whether one of this chord's trigger sets is a strict subset of `keys`
    #[must_use]
    pub fn is_strict_subset_of(&self, keys: &[u16]) -> bool {
        self.triggers
            .iter()
            .any(|set| set.len() < keys.len() && set.iter().all(|code| keys.contains(code)))
    }

    /// Haptic cue fired at `timing`, if configured
    #[must_use]
    pub fn haptic_at(&self, timing: HapticTiming) -> Option<HapticCue> {
        self.haptic.filter(|h| h.timing == timing).map(|h| h.cue)
    }
}

/// Chord table carried by a hardware profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordTable {
    pub chords: &'static [ChordDefinition],
    /// Codes forwarded verbatim to the virtual controller
    pub pass_through: &'static [u16],
}

impl ChordTable {
    /// Chord bound to `button`
    #[must_use]
    pub fn chord_for(&self, button: LogicalButton) -> Option<&'static ChordDefinition> {
        self.chords.iter().find(|chord| chord.button == button)
    }
}
