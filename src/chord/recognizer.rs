//! # Chord Recognizer
//!
//! Turns raw keyboard events plus the kernel's active key set into logical
//! button commands, driven by the active profile's [`ChordTable`].
//!
//! ## Rules (applied in order for every event)
//!
//! | Step | Condition | Effect |
//! |------|-----------|--------|
//! | Pass-through | code in the profile's pass-through list | forward verbatim, nothing else |
//! | Self-heal | previous event left no keys held and this one too | resolve the first armed chord |
//! | Arm | trigger kind matches, set equals active keys, gate open | disarm superseded chords, arm |
//! | Autorepeat | value 2 while an instant chord is pressed | dispatch hold |
//! | Resolve | key-up of a release code, active equals residual | queued: latch + press; instant: release |
//! | Pending release | a button is latched and nothing latched this event | release + unlatch |
//! | Suspend clear | `KEY_LEFTMETA` up, no keys held, queue idle | clear the suspend-pending flag |
//!
//! ## Usage
//!
//! ```
//! use evdev::{EventType, InputEvent};
//! use handycon::chord::recognizer::{ChordRecognizer, ChordState};
//! use handycon::profile;
//!
//! let profile = profile::identify("AYANEO 2021", "AuthenticAMD")?;
//! let recognizer = ChordRecognizer::new(&profile.chords);
//! let mut state = ChordState::new(profile.gyro.is_some());
//!
//! let esc_down = InputEvent::new(EventType::KEY.0, 1, 1);
//! let commands = recognizer.process(&mut state, &esc_down, &[1]);
//! assert!(commands.is_empty());
//! # Ok::<(), handycon::error::HandyconError>(())
//! ```

use evdev::{EventType, InputEvent};
use tracing::{debug, warn};

use super::codes::KEY_LEFTMETA;
use super::definition::{ChordDefinition, ChordTable, FireMode, Gate, HapticCue, HapticTiming};
use super::queue::EventQueue;
use crate::action::{LogicalButton, Polarity};

/// Work produced by the recognizer, executed outside the session lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Dispatch the action bound to `button`
    Dispatch {
        button: LogicalButton,
        polarity: Polarity,
    },
    /// Play a rumble pulse and wait for it
    Haptic(HapticCue),
    /// Re-emit the raw event on the virtual controller
    Forward(InputEvent),
}

impl Command {
    fn press(button: LogicalButton) -> Self {
        Command::Dispatch { button, polarity: Polarity::Press }
    }

    fn release(button: LogicalButton) -> Self {
        Command::Dispatch { button, polarity: Polarity::Release }
    }
}

/// Chord state shared between keyboard loops.
#[derive(Debug, Clone, Default)]
pub struct ChordState {
    queue: EventQueue,
    /// Instant chords whose press has been dispatched
    pressed: Vec<LogicalButton>,
    /// The previous event saw no keys held
    previous_idle: bool,
    /// A power-button sequence is in flight
    pub suspend_pending: bool,
    /// The gyro answered its last probe
    pub gyro_available: bool,
    pub companion_installed: bool,
}

impl ChordState {
    #[must_use]
    pub fn new(gyro_available: bool) -> Self {
        Self { gyro_available, ..Self::default() }
    }

    #[must_use]
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Instant chords currently pressed on the virtual controller
    #[must_use]
    pub fn pressed(&self) -> &[LogicalButton] {
        &self.pressed
    }

    fn take_pressed(&mut self, button: LogicalButton) -> bool {
        match self.pressed.iter().position(|held| *held == button) {
            Some(index) => {
                self.pressed.remove(index);
                true
            }
            None => false,
        }
    }

    /// Buttons armed, pressed or latched right now
    #[must_use]
    pub fn in_flight(&self) -> Vec<LogicalButton> {
        let mut buttons = self.queue.armed().to_vec();
        for button in self.pressed.iter().copied().chain(self.queue.latched()) {
            if !buttons.contains(&button) {
                buttons.push(button);
            }
        }
        buttons
    }

    /// Release and forget `buttons` wherever they are in flight.
    ///
    /// Used when a keyboard is lost so nothing it started stays stuck down.
    /// Buttons owned by another keyboard are left alone.
    pub fn drain(&mut self, buttons: &[LogicalButton]) -> Vec<Command> {
        let mut commands = Vec::new();
        for &button in buttons {
            self.queue.disarm(button);
            if self.take_pressed(button) {
                commands.push(Command::release(button));
            }
        }
        if self.queue.latched().is_some_and(|held| buttons.contains(&held)) {
            if let Some(held) = self.queue.unlatch() {
                commands.push(Command::release(held));
            }
        }
        self.previous_idle = false;
        commands
    }
}

/// Generic recognizer driven by a profile's chord table.
#[derive(Debug, Clone, Copy)]
pub struct ChordRecognizer {
    table: &'static ChordTable,
}

impl ChordRecognizer {
    #[must_use]
    pub fn new(table: &'static ChordTable) -> Self {
        Self { table }
    }

    /// Process one raw keyboard event.
    ///
    /// # Arguments
    ///
    /// * `state` - Shared chord state, mutated in place
    /// * `event` - Event as read from the keyboard device
    /// * `active` - Keys currently held, sorted ascending
    ///
    /// # Returns
    ///
    /// Commands to execute in order once the session lock is released.
    pub fn process(&self, state: &mut ChordState, event: &InputEvent, active: &[u16]) -> Vec<Command> {
        let is_key = event.event_type() == EventType::KEY;

        if is_key && self.table.pass_through.contains(&event.code()) {
            return vec![Command::Forward(*event)];
        }

        let mut commands = Vec::new();

        if state.previous_idle && active.is_empty() {
            self.self_heal(state, &mut commands);
        }

        self.arm(state, event, active, &mut commands);

        if is_key && event.value() == 2 {
            self.autorepeat(state, active, &mut commands);
        }

        let mut latched_now = false;
        if is_key && event.value() == 0 {
            latched_now = self.resolve(state, event.code(), active, &mut commands);
        }

        if !latched_now {
            if let Some(button) = state.queue.unlatch() {
                commands.push(Command::release(button));
            }
        }

        if is_key
            && event.code() == KEY_LEFTMETA
            && event.value() == 0
            && active.is_empty()
            && state.queue.is_idle()
            && state.suspend_pending
        {
            debug!("Power button sequence finished");
            state.suspend_pending = false;
        }

        state.previous_idle = active.is_empty();
        commands
    }

    fn self_heal(&self, state: &mut ChordState, commands: &mut Vec<Command>) {
        let stale = state
            .queue
            .armed()
            .iter()
            .filter_map(|button| self.table.chord_for(*button))
            .find(|chord| !chord.deferred);

        let Some(chord) = stale else {
            return;
        };

        debug!("Recovering missed release of {}", chord.button);
        state.queue.disarm(chord.button);
        match chord.mode {
            // No keys remain held, so the gesture is complete.
            FireMode::Queued => {
                if let Some(held) = state.queue.unlatch() {
                    commands.push(Command::release(held));
                }
                commands.push(Command::press(chord.button));
                if let Some(cue) = chord.haptic_at(HapticTiming::OnPress) {
                    commands.push(Command::Haptic(cue));
                }
                commands.push(Command::release(chord.button));
            }
            FireMode::Instant => {
                if state.take_pressed(chord.button) {
                    commands.push(Command::release(chord.button));
                }
            }
        }
    }

    fn gate_open(gate: Option<Gate>, state: &ChordState) -> bool {
        match gate {
            None => true,
            Some(Gate::Gyro) => state.gyro_available,
            Some(Gate::Companion) => state.companion_installed,
            Some(Gate::NoCompanion) => !state.companion_installed,
            Some(Gate::NoSuspendPending) => !state.suspend_pending,
            Some(Gate::Idle) => state.queue.is_idle(),
        }
    }

    fn arm(&self, state: &mut ChordState, event: &InputEvent, active: &[u16], commands: &mut Vec<Command>) {
        for chord in self.table.chords {
            if !chord.kind.accepts(event) || state.queue.is_armed(chord.button) {
                continue;
            }
            let Some(matched) = chord.trigger_matching(active) else {
                continue;
            };
            if !Self::gate_open(chord.gate, state) {
                debug!("{} gated by {:?}", chord.button, chord.gate);
                continue;
            }

            self.supersede(state, chord, matched, commands);

            state.queue.arm(chord.button);
            debug!("Armed {} from {:?}", chord.button, matched);

            if let Some(cue) = chord.haptic_at(HapticTiming::OnArm) {
                commands.push(Command::Haptic(cue));
            }
            if chord.mode == FireMode::Instant {
                state.pressed.push(chord.button);
                commands.push(Command::press(chord.button));
                if let Some(cue) = chord.haptic_at(HapticTiming::OnPress) {
                    commands.push(Command::Haptic(cue));
                }
            }
        }
    }

    /// Disarm explicitly superseded chords and armed strict subsets of `matched`
    fn supersede(
        &self,
        state: &mut ChordState,
        winner: &ChordDefinition,
        matched: &[u16],
        commands: &mut Vec<Command>,
    ) {
        let armed: Vec<LogicalButton> = state.queue.armed().to_vec();
        for button in armed {
            if button == winner.button {
                continue;
            }
            let subset = self
                .table
                .chord_for(button)
                .is_some_and(|chord| chord.is_strict_subset_of(matched));
            if !subset && !winner.supersedes.contains(&button) {
                continue;
            }

            state.queue.disarm(button);
            debug!("{} superseded by {}", button, winner.button);
            if state.take_pressed(button) {
                commands.push(Command::release(button));
            }
        }
    }

    fn autorepeat(&self, state: &ChordState, active: &[u16], commands: &mut Vec<Command>) {
        for chord in self.table.chords {
            if chord.mode == FireMode::Instant
                && state.pressed.contains(&chord.button)
                && chord.trigger_matching(active).is_some()
            {
                commands.push(Command::Dispatch { button: chord.button, polarity: Polarity::Hold });
            }
        }
    }

    /// Returns true if a queued chord latched on this event
    fn resolve(&self, state: &mut ChordState, code: u16, active: &[u16], commands: &mut Vec<Command>) -> bool {
        let mut latched_now = false;

        for chord in self.table.chords {
            if !state.queue.is_armed(chord.button)
                || !chord.releases_on(code)
                || !chord.residual_matches(active)
            {
                continue;
            }

            state.queue.disarm(chord.button);
            match chord.mode {
                FireMode::Queued => {
                    if state.queue.latch(chord.button) {
                        commands.push(Command::press(chord.button));
                        if let Some(cue) = chord.haptic_at(HapticTiming::OnPress) {
                            commands.push(Command::Haptic(cue));
                        }
                        latched_now = true;
                    } else {
                        warn!("Dropping resolution of {}", chord.button);
                    }
                }
                FireMode::Instant => {
                    if state.take_pressed(chord.button) {
                        commands.push(Command::release(chord.button));
                    }
                }
            }
        }

        latched_now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::codes::*;
    use crate::chord::definition::TriggerKind;
    use crate::profile;
    use evdev::MiscCode;
    use LogicalButton::*;

    fn key(code: u16, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY.0, code, value)
    }

    fn syn() -> InputEvent {
        InputEvent::new(EventType::SYNCHRONIZATION.0, 0, 0)
    }

    fn scan(value: i32) -> InputEvent {
        InputEvent::new(EventType::MISC.0, MiscCode::MSC_SCAN.0, value)
    }

    fn press(button: LogicalButton) -> Command {
        Command::press(button)
    }

    fn release(button: LogicalButton) -> Command {
        Command::release(button)
    }

    /// Feeds `(event, active)` pairs and collects every command
    fn feed(
        recognizer: &ChordRecognizer,
        state: &mut ChordState,
        events: &[(InputEvent, &[u16])],
    ) -> Vec<Command> {
        events
            .iter()
            .flat_map(|(event, active)| recognizer.process(state, event, active))
            .collect()
    }

    fn setup(product: &str) -> (ChordRecognizer, ChordState) {
        let profile = profile::identify(product, "AuthenticAMD").unwrap();
        (ChordRecognizer::new(&profile.chords), ChordState::new(profile.gyro.is_some()))
    }

    const fn chord_table(chords: &'static [ChordDefinition]) -> ChordTable {
        ChordTable { chords, pass_through: VOLUME_KEYS }
    }

    // ==================== Queued Resolution Tests ====================

    #[test]
    fn test_aya_gen1_esc_press_then_release() {
        let (recognizer, mut state) = setup("AYANEO 2021");

        let armed = recognizer.process(&mut state, &key(KEY_ESC, 1), &[KEY_ESC]);
        assert!(armed.is_empty());
        assert!(state.queue().is_armed(Button3));

        let resolved = recognizer.process(&mut state, &key(KEY_ESC, 0), &[]);
        assert_eq!(resolved, vec![press(Button3)]);
        assert_eq!(state.queue().latched(), Some(Button3));

        let released = recognizer.process(&mut state, &syn(), &[]);
        assert_eq!(released, vec![release(Button3)]);
        assert!(state.queue().is_idle());
        assert_eq!(state.queue().latched(), None);
    }

    #[test]
    fn test_qam_chord_with_haptic() {
        let (recognizer, mut state) = setup("AYANEO 2021");
        let qam: &[u16] = &[KEY_RIGHTCTRL, KEY_RIGHTALT, KEY_DELETE];

        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_RIGHTCTRL, 1), &[KEY_RIGHTCTRL]),
                (key(KEY_RIGHTALT, 1), &[KEY_RIGHTCTRL, KEY_RIGHTALT]),
                (key(KEY_DELETE, 1), qam),
                (key(KEY_DELETE, 0), &[KEY_RIGHTCTRL, KEY_RIGHTALT]),
                (key(KEY_RIGHTALT, 0), &[KEY_RIGHTCTRL]),
                (key(KEY_RIGHTCTRL, 0), &[]),
                (syn(), &[]),
            ],
        );

        assert_eq!(
            commands,
            vec![press(Button2), Command::Haptic(HapticCue::millis(150)), release(Button2)]
        );
        assert!(state.queue().is_idle());
    }

    #[test]
    fn test_release_without_arm_is_ignored() {
        let (recognizer, mut state) = setup("AYANEO 2021");
        let commands = recognizer.process(&mut state, &key(KEY_ESC, 0), &[]);
        assert!(commands.is_empty());
        assert_eq!(state.queue().latched(), None);
    }

    // ==================== Supersession Tests ====================

    #[test]
    fn test_subset_disarmed_before_superset_arms() {
        let (recognizer, mut state) = setup("AYANEO 2021");

        // Meta alone arms button1, the keyboard chord supersedes it
        recognizer.process(&mut state, &key(KEY_LEFTMETA, 1), &[KEY_LEFTMETA]);
        assert!(state.queue().is_armed(Button1));

        recognizer.process(&mut state, &key(KEY_RIGHTCTRL, 1), &[KEY_RIGHTCTRL, KEY_LEFTMETA]);
        recognizer.process(&mut state, &key(KEY_O, 1), &[KEY_O, KEY_RIGHTCTRL, KEY_LEFTMETA]);
        assert!(!state.queue().is_armed(Button1));
        assert!(state.queue().is_armed(Button4));

        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_O, 0), &[KEY_RIGHTCTRL, KEY_LEFTMETA]),
                (key(KEY_RIGHTCTRL, 0), &[KEY_LEFTMETA]),
                (key(KEY_LEFTMETA, 0), &[]),
                (syn(), &[]),
            ],
        );
        assert_eq!(commands, vec![press(Button4), release(Button4)]);
    }

    #[test]
    fn test_aya_gen3_gyro_superset() {
        let (recognizer, mut state) = setup("AIR");

        // F11 + RightCtrl + Meta arms instant button1
        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_F11, 1), &[KEY_F11]),
                (key(KEY_RIGHTCTRL, 1), &[KEY_F11, KEY_RIGHTCTRL]),
                (key(KEY_LEFTMETA, 1), &[KEY_F11, KEY_RIGHTCTRL, KEY_LEFTMETA]),
            ],
        );
        assert_eq!(commands, vec![press(Button1)]);

        // F10 completes the superset: button1 is released and disarmed first
        let commands = recognizer.process(
            &mut state,
            &key(KEY_F10, 1),
            &[KEY_F10, KEY_F11, KEY_RIGHTCTRL, KEY_LEFTMETA],
        );
        assert_eq!(commands, vec![release(Button1)]);
        assert!(!state.queue().is_armed(Button1));
        assert!(!state.queue().is_armed(Button4));
        assert!(state.queue().is_armed(Button3));

        // Only the superset resolves
        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_F10, 0), &[KEY_F11, KEY_RIGHTCTRL, KEY_LEFTMETA]),
                (key(KEY_F11, 0), &[KEY_RIGHTCTRL, KEY_LEFTMETA]),
                (key(KEY_RIGHTCTRL, 0), &[KEY_LEFTMETA]),
                (key(KEY_LEFTMETA, 0), &[]),
                (syn(), &[]),
            ],
        );
        assert_eq!(commands, vec![press(Button3), release(Button3)]);
    }

    #[test]
    fn test_lc_opens_companion_when_installed() {
        let (recognizer, mut state) = setup("AIR");
        state.companion_installed = true;
        let lc: &[u16] = &[KEY_F11, KEY_RIGHTCTRL, KEY_LEFTMETA];

        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_F11, 1), &[KEY_F11]),
                (key(KEY_RIGHTCTRL, 1), &[KEY_F11, KEY_RIGHTCTRL]),
                (key(KEY_LEFTMETA, 1), lc),
            ],
        );
        assert!(commands.is_empty());
        assert_eq!(state.queue().armed(), &[Companion]);

        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_F11, 0), &[KEY_RIGHTCTRL, KEY_LEFTMETA]),
                (key(KEY_RIGHTCTRL, 0), &[KEY_LEFTMETA]),
                (key(KEY_LEFTMETA, 0), &[]),
                (syn(), &[]),
            ],
        );
        assert_eq!(commands, vec![press(Companion), release(Companion)]);
    }

    #[test]
    fn test_gyro_gate_blocks_superset_without_gyro() {
        let (recognizer, _) = setup("AIR");
        let mut state = ChordState::new(false);

        recognizer.process(&mut state, &key(KEY_F10, 1), &[KEY_F10, KEY_F11, KEY_RIGHTCTRL, KEY_LEFTMETA]);

        assert!(!state.queue().is_armed(Button3));
    }

    #[test]
    fn test_explicit_supersession() {
        static CHORDS: [ChordDefinition; 2] = [
            ChordDefinition::instant(Button5, &[&[KEY_G, KEY_LEFTMETA]]),
            ChordDefinition::queued(Button2, &[&[KEY_D, KEY_LEFTMETA]]).supersedes(&[Button5]),
        ];
        static TABLE: ChordTable = chord_table(&CHORDS);
        let recognizer = ChordRecognizer::new(&TABLE);
        let mut state = ChordState::default();

        let commands = feed(
            &recognizer,
            &mut state,
            &[(key(KEY_G, 1), &[KEY_G]), (key(KEY_LEFTMETA, 1), &[KEY_G, KEY_LEFTMETA])],
        );
        assert_eq!(commands, vec![press(Button5)]);

        // Not a subset, but listed as superseded
        recognizer.process(&mut state, &key(KEY_G, 0), &[KEY_LEFTMETA]);
        let commands = recognizer.process(&mut state, &key(KEY_D, 1), &[KEY_D, KEY_LEFTMETA]);

        assert_eq!(commands, vec![release(Button5)]);
        assert_eq!(state.queue().armed(), &[Button2]);
    }

    // ==================== Hold Upgrade Tests ====================

    #[test]
    fn test_hold_upgrade_replaces_short_press() {
        let (recognizer, mut state) = setup("Win600");
        let held: &[u16] = &[KEY_O, KEY_LEFTCTRL, KEY_LEFTMETA];

        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_LEFTMETA, 1), &[KEY_LEFTMETA]),
                (key(KEY_LEFTCTRL, 1), &[KEY_LEFTCTRL, KEY_LEFTMETA]),
                (key(KEY_O, 1), held),
            ],
        );
        assert!(commands.is_empty());
        assert_eq!(state.queue().armed(), &[Button4]);

        // Long press: the short binding is replaced without any dispatch
        let commands = recognizer.process(&mut state, &key(KEY_O, 2), held);
        assert!(commands.is_empty());
        assert_eq!(state.queue().armed(), &[Button1]);

        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_O, 0), &[KEY_LEFTCTRL, KEY_LEFTMETA]),
                (key(KEY_LEFTCTRL, 0), &[KEY_LEFTMETA]),
                (key(KEY_LEFTMETA, 0), &[]),
                (syn(), &[]),
            ],
        );
        assert_eq!(commands, vec![press(Button1), release(Button1)]);
    }

    #[test]
    fn test_haptic_on_arm() {
        let (recognizer, mut state) = setup("Win600");

        let commands = recognizer.process(&mut state, &key(KEY_ESC, 1), &[KEY_ESC]);

        assert_eq!(commands, vec![Command::Haptic(HapticCue::millis(75))]);
    }

    // ==================== Instant Mode Tests ====================

    #[test]
    fn test_instant_press_on_arm_release_on_resolve() {
        let (recognizer, mut state) = setup("G1618-03");
        let chord: &[u16] = &[KEY_LEFTCTRL, KEY_LEFTALT, KEY_DELETE];

        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_LEFTCTRL, 1), &[KEY_LEFTCTRL]),
                (key(KEY_LEFTALT, 1), &[KEY_LEFTCTRL, KEY_LEFTALT]),
                (key(KEY_DELETE, 1), chord),
                (key(KEY_DELETE, 2), chord),
            ],
        );
        assert_eq!(
            commands,
            vec![press(Button1), Command::Dispatch { button: Button1, polarity: Polarity::Hold }]
        );

        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_DELETE, 0), &[KEY_LEFTCTRL, KEY_LEFTALT]),
                (key(KEY_LEFTALT, 0), &[KEY_LEFTCTRL]),
                (key(KEY_LEFTCTRL, 0), &[]),
                (syn(), &[]),
            ],
        );
        assert_eq!(commands, vec![release(Button1)]);
        assert!(state.pressed().is_empty());
    }

    #[test]
    fn test_scan_triggers_need_idle_queue() {
        let (recognizer, mut state) = setup("AIR Plus");
        let held: &[u16] = &[KEY_LEFTCTRL, KEY_LEFTMETA];

        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_LEFTCTRL, 1), &[KEY_LEFTCTRL]),
                (key(KEY_LEFTMETA, 1), held),
                (scan(SCAN_RIGHT_CUSTOM), held),
                (scan(SCAN_AYA_SPACE), held),
            ],
        );
        assert_eq!(commands, vec![press(Button4)]);

        let commands = feed(
            &recognizer,
            &mut state,
            &[(key(KEY_LEFTCTRL, 0), &[KEY_LEFTMETA]), (key(KEY_LEFTMETA, 0), &[])],
        );
        assert_eq!(commands, vec![release(Button4)]);
    }

    // ==================== Pass-through Tests ====================

    #[test]
    fn test_pass_through_is_verbatim() {
        for product in ["AYANEO 2021", "Win600", "ONEXPLAYER 2 ARP23", "G1617-01", "KUN"] {
            let (recognizer, mut state) = setup(product);
            for event in [key(KEY_VOLUMEUP, 1), key(KEY_VOLUMEUP, 2), key(KEY_VOLUMEDOWN, 0)] {
                let commands = recognizer.process(&mut state, &event, &[]);
                assert_eq!(commands, vec![Command::Forward(event)], "{}", product);
            }
            assert!(state.queue().is_idle());
        }
    }

    #[test]
    fn test_pass_through_skips_chord_state() {
        let (recognizer, mut state) = setup("AYANEO 2021");
        recognizer.process(&mut state, &key(KEY_ESC, 1), &[KEY_ESC]);

        let commands = recognizer.process(&mut state, &key(KEY_VOLUMEDOWN, 1), &[KEY_ESC, KEY_VOLUMEDOWN]);

        assert_eq!(commands.len(), 1);
        assert!(state.queue().is_armed(Button3));
    }

    // ==================== Self-heal Tests ====================

    #[test]
    fn test_self_heal_resolves_missed_release() {
        let (recognizer, mut state) = setup("ONEXPLAYER 2 ARP23");

        feed(
            &recognizer,
            &mut state,
            &[(key(KEY_D, 1), &[KEY_D]), (key(KEY_LEFTMETA, 1), &[KEY_D, KEY_LEFTMETA])],
        );
        assert!(state.queue().is_armed(VolumeUp));

        // Meta comes up last and is not a release code for this chord
        let commands = feed(
            &recognizer,
            &mut state,
            &[(key(KEY_D, 0), &[KEY_LEFTMETA]), (key(KEY_LEFTMETA, 0), &[])],
        );
        assert!(commands.is_empty());

        let commands = recognizer.process(&mut state, &syn(), &[]);
        assert_eq!(commands, vec![press(VolumeUp), release(VolumeUp)]);
        assert!(state.queue().is_idle());
        assert_eq!(state.queue().latched(), None);
    }

    #[test]
    fn test_self_heal_releases_instant_chord() {
        let (recognizer, mut state) = setup("AIR");

        let commands = feed(
            &recognizer,
            &mut state,
            &[
                (key(KEY_F11, 1), &[KEY_F11]),
                (key(KEY_RIGHTCTRL, 1), &[KEY_F11, KEY_RIGHTCTRL]),
                (key(KEY_LEFTMETA, 1), &[KEY_F11, KEY_RIGHTCTRL, KEY_LEFTMETA]),
            ],
        );
        assert_eq!(commands, vec![press(Button1)]);

        // Every key-up was lost, the kernel reports nothing held
        let commands = feed(&recognizer, &mut state, &[(syn(), &[]), (syn(), &[]), (syn(), &[])]);

        assert_eq!(commands, vec![release(Button1)]);
        assert!(state.pressed().is_empty());
        assert!(state.queue().is_idle());
    }

    #[test]
    fn test_self_heal_on_every_profile() {
        for product in ["AYANEO 2021", "Win600", "G1618-03", "KUN", "ROG Ally RC71L"] {
            let profile = profile::identify(product, "AuthenticAMD").unwrap();
            let recognizer = ChordRecognizer::new(&profile.chords);
            let Some(chord) = profile.chords.chords.iter().find(|chord| {
                !chord.deferred && chord.kind == TriggerKind::Press && chord.gate.is_none()
            }) else {
                continue;
            };
            let trigger = chord.triggers[0];
            let mut state = ChordState::new(false);
            let last = trigger[trigger.len() - 1];

            recognizer.process(&mut state, &key(last, 1), trigger);
            assert!(state.queue().is_armed(chord.button), "{}", product);

            feed(&recognizer, &mut state, &[(syn(), &[]), (syn(), &[])]);
            assert!(!state.queue().is_armed(chord.button), "{}", product);
            assert!(state.pressed().is_empty(), "{}", product);
        }
    }

    #[test]
    fn test_deferred_chord_resolves_on_follow_up_code() {
        let (recognizer, mut state) = setup("ROG Ally RC71L");

        let commands = feed(
            &recognizer,
            &mut state,
            &[(key(KEY_F17, 1), &[KEY_F17]), (key(KEY_F17, 0), &[]), (syn(), &[])],
        );
        assert!(commands.is_empty());
        assert!(state.queue().is_armed(Button7));

        let commands = feed(
            &recognizer,
            &mut state,
            &[(key(KEY_F18, 1), &[KEY_F18]), (key(KEY_F18, 0), &[]), (syn(), &[])],
        );
        assert_eq!(commands, vec![press(Button7), release(Button7)]);
    }

    // ==================== Suspend Gate Tests ====================

    #[test]
    fn test_suspend_pending_gates_meta_chord() {
        let (recognizer, mut state) = setup("AYANEO 2021");
        state.suspend_pending = true;

        recognizer.process(&mut state, &key(KEY_LEFTMETA, 1), &[KEY_LEFTMETA]);
        assert!(!state.queue().is_armed(Button1));

        let commands = recognizer.process(&mut state, &key(KEY_LEFTMETA, 0), &[]);
        assert!(commands.is_empty());
        assert!(!state.suspend_pending);

        recognizer.process(&mut state, &key(KEY_LEFTMETA, 1), &[KEY_LEFTMETA]);
        assert!(state.queue().is_armed(Button1));
    }

    // ==================== Invariant Tests ====================

    #[test]
    fn test_single_latch_and_pairing_over_mixed_sequence() {
        let (recognizer, mut state) = setup("ROG Ally RC71L");
        let sequence: Vec<(InputEvent, &[u16])> = vec![
            (key(KEY_F14, 1), &[KEY_F14]),
            (key(KEY_PROG1, 1), &[KEY_PROG1, KEY_F14]),
            (key(KEY_F14, 0), &[KEY_PROG1]),
            (key(KEY_PROG1, 0), &[]),
            (key(KEY_F16, 1), &[KEY_F16]),
            (key(KEY_F16, 0), &[]),
            (syn(), &[]),
            (key(KEY_F12, 1), &[KEY_F12]),
            (key(KEY_F12, 0), &[]),
            (syn(), &[]),
        ];

        let mut held: Option<LogicalButton> = None;
        for (event, active) in &sequence {
            for command in recognizer.process(&mut state, event, active) {
                if let Command::Dispatch { button, polarity } = command {
                    match polarity {
                        Polarity::Press => {
                            assert_eq!(held, None, "{} pressed while another is held", button);
                            held = Some(button);
                        }
                        Polarity::Release => {
                            assert_eq!(held, Some(button));
                            held = None;
                        }
                        Polarity::Hold => {}
                    }
                }
            }
        }
        assert_eq!(held, None);
    }

    #[test]
    fn test_drain_releases_everything() {
        let (recognizer, mut state) = setup("G1618-03");
        recognizer.process(&mut state, &key(KEY_ESC, 1), &[KEY_ESC]);
        assert_eq!(state.pressed(), &[Button2]);

        let in_flight = state.in_flight();
        let commands = state.drain(&in_flight);

        assert_eq!(commands, vec![release(Button2)]);
        assert!(state.queue().is_idle());
    }

    #[test]
    fn test_drain_leaves_other_buttons() {
        let (recognizer, mut state) = setup("AYANEO 2021");
        recognizer.process(&mut state, &key(KEY_ESC, 1), &[KEY_ESC]);
        recognizer.process(&mut state, &key(KEY_ESC, 0), &[]);
        assert_eq!(state.in_flight(), vec![Button3]);

        let commands = state.drain(&[Button1]);

        assert!(commands.is_empty());
        assert_eq!(state.queue().latched(), Some(Button3));

        assert_eq!(state.drain(&[Button3]), vec![release(Button3)]);
        assert!(state.in_flight().is_empty());
    }
}
