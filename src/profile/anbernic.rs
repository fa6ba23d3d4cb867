//! ANBERNIC Win600.
//!
//! The keyboard button doubles as a long-press screenshot key: holding it
//! upgrades the short-press chord in place.

use std::time::Duration;

use super::{CpuMatch, DeviceSelector, HardwareProfile, SystemType, AT_KEYBOARD, XBOX_PAD};
use crate::action::LogicalButton::*;
use crate::chord::codes::*;
use crate::chord::definition::{ChordDefinition, ChordTable};

const CHORDS: &[ChordDefinition] = &[
    // Keyboard button, long press
    ChordDefinition::queued(Button1, &[&[KEY_O, KEY_LEFTCTRL, KEY_LEFTMETA]])
        .hold()
        .supersedes(&[Button4, Button5]),
    // Home
    ChordDefinition::queued(Button2, &[&[KEY_G, KEY_LEFTMETA]]).supersedes(&[Button5]),
    // Home alternate mode
    ChordDefinition::queued(Button3, &[&[KEY_ESC]])
        .supersedes(&[Button2])
        .haptic_on_arm(75),
    // Keyboard button, short press
    ChordDefinition::queued(Button4, &[&[KEY_O, KEY_LEFTCTRL, KEY_LEFTMETA]]).supersedes(&[Button5]),
    // Meta
    ChordDefinition::queued(Button5, &[&[KEY_LEFTMETA]]),
    // Meta alternate mode
    ChordDefinition::instant(Button7, &[&[KEY_ESC, KEY_LEFTCTRL, KEY_LEFTSHIFT]]).supersedes(&[Button5]),
];

pub(super) static ANB_GEN1: HardwareProfile = HardwareProfile {
    system: SystemType::ANB_GEN1,
    product_names: &["Win600"],
    cpu: CpuMatch::Any,
    button_delay: Duration::from_millis(40),
    gamepad: DeviceSelector::new(XBOX_PAD, "usb-0000:02:00.3-5/input0"),
    keyboard: AT_KEYBOARD,
    keyboard_2: None,
    gyro: None,
    turbo_takeover: false,
    thermal_policy: false,
    chords: ChordTable { chords: CHORDS, pass_through: VOLUME_KEYS },
};
