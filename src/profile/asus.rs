//! ASUS ROG Ally.
//!
//! The Ally reports its extra buttons on two "Asus Keyboard" interfaces. Every
//! chord is queued. The Armory Crate long press sends F17 once held and F18
//! when let go, so that chord resolves on the F18 key-up.

use std::time::Duration;

use super::{CpuMatch, DeviceSelector, HardwareProfile, SystemType, XBOX_PAD};
use crate::action::LogicalButton::*;
use crate::chord::codes::*;
use crate::chord::definition::{ChordDefinition, ChordTable};

const CHORDS: &[ChordDefinition] = &[
    // Paddle + Y
    ChordDefinition::queued(Button1, &[&[KEY_F14]]),
    // Armory Crate short press
    ChordDefinition::queued(Button2, &[&[KEY_PROG1]]),
    // Paddle + B
    ChordDefinition::queued(Button3, &[&[KEY_N, KEY_LEFTMETA]]),
    // Paddle + D-pad up
    ChordDefinition::queued(Button4, &[&[KEY_F12]]),
    // Home short press
    ChordDefinition::queued(Button5, &[&[KEY_F16]]),
    // Paddle + A
    ChordDefinition::queued(Button6, &[&[KEY_F10]]),
    // Armory Crate long press
    ChordDefinition::queued(Button7, &[&[KEY_F17]]).release(&[KEY_F18]).deferred(),
    // Home long press
    ChordDefinition::queued(Button8, &[&[KEY_LEFTCTRL, KEY_LEFTALT, KEY_DELETE]]),
    // Paddle + D-pad down
    ChordDefinition::queued(Button9, &[&[KEY_ESC, KEY_LEFTCTRL, KEY_LEFTSHIFT]]),
    // Paddle + D-pad left
    ChordDefinition::queued(Button10, &[&[KEY_D, KEY_LEFTMETA]]),
    // Paddle + D-pad right
    ChordDefinition::queued(Button11, &[&[KEY_TAB, KEY_LEFTMETA]]),
    // Paddle + X
    ChordDefinition::queued(Button12, &[&[KEY_P, KEY_LEFTMETA]]),
];

pub(super) static ALY_GEN1: HardwareProfile = HardwareProfile {
    system: SystemType::ALY_GEN1,
    product_names: &["ROG Ally RC71L_RC71L", "ROG Ally RC71L"],
    cpu: CpuMatch::Any,
    button_delay: Duration::from_millis(200),
    gamepad: DeviceSelector::new(XBOX_PAD, "usb-0000:0a:00.3-2/input0"),
    keyboard: DeviceSelector::new("Asus Keyboard", "usb-0000:0a:00.3-3/input0"),
    keyboard_2: Some(DeviceSelector::new("Asus Keyboard", "usb-0000:0a:00.3-3/input2")),
    gyro: None,
    turbo_takeover: false,
    thermal_policy: true,
    chords: ChordTable { chords: CHORDS, pass_through: &[] },
};
