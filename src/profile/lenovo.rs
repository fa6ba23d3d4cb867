//! Lenovo Legion Go.

use std::time::Duration;

use super::{CpuMatch, DeviceSelector, HardwareProfile, SystemType};
use crate::action::LogicalButton::*;
use crate::chord::codes::*;
use crate::chord::definition::{ChordDefinition, ChordTable};

const CHORDS: &[ChordDefinition] = &[
    ChordDefinition::queued(Button2, &[&[KEY_LEFTCTRL, KEY_LEFTALT, KEY_DELETE]]),
    ChordDefinition::queued(Button4, &[&[KEY_O, KEY_LEFTCTRL, KEY_LEFTMETA]]),
    ChordDefinition::queued(Button5, &[&[KEY_SYSRQ]]),
];

pub(super) static GO_GEN1: HardwareProfile = HardwareProfile {
    system: SystemType::GO_GEN1,
    product_names: &["83E1"],
    cpu: CpuMatch::Any,
    button_delay: Duration::from_millis(200),
    gamepad: DeviceSelector::new("Generic X-Box pad", "usb-0000:c2:00.3-3/input0"),
    keyboard: DeviceSelector::new("  Legion Controller for Windows  Keyboard", "usb-0000:c2:00.3-3/input3"),
    keyboard_2: None,
    gyro: None,
    turbo_takeover: false,
    thermal_policy: false,
    chords: ChordTable { chords: CHORDS, pass_through: &[] },
};
