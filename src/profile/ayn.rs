//! AYN Loki family.

use std::time::Duration;

use super::{CpuMatch, DeviceSelector, HardwareProfile, SystemType, AT_KEYBOARD, XBOX_PAD};
use crate::action::LogicalButton::*;
use crate::chord::codes::*;
use crate::chord::definition::{ChordDefinition, ChordTable};

const HOME: ChordDefinition =
    ChordDefinition::queued(Button2, &[&[KEY_T, KEY_LEFTCTRL, KEY_LEFTSHIFT, KEY_LEFTALT]]);

const LOKI_MAX: &[ChordDefinition] = &[HOME];

const LOKI_MINI_PRO: &[ChordDefinition] = &[ChordDefinition::queued(Button1, &[&[KEY_DELETE]]), HOME];

pub(super) static AYN_GEN1: HardwareProfile = HardwareProfile {
    system: SystemType::AYN_GEN1,
    product_names: &["Loki Max"],
    cpu: CpuMatch::Any,
    button_delay: Duration::from_millis(110),
    gamepad: DeviceSelector::new(XBOX_PAD, "usb-0000:74:00.0-1/input0"),
    keyboard: AT_KEYBOARD,
    keyboard_2: None,
    gyro: None,
    turbo_takeover: false,
    thermal_policy: false,
    chords: ChordTable { chords: LOKI_MAX, pass_through: VOLUME_KEYS },
};

pub(super) static AYN_GEN3: HardwareProfile = HardwareProfile {
    system: SystemType::AYN_GEN3,
    product_names: &["Loki MiniPro"],
    cpu: CpuMatch::Any,
    button_delay: Duration::from_millis(110),
    gamepad: DeviceSelector::new(XBOX_PAD, "usb-0000:04:00.4-2/input0"),
    keyboard: AT_KEYBOARD,
    keyboard_2: None,
    gyro: None,
    turbo_takeover: false,
    thermal_policy: false,
    chords: ChordTable { chords: LOKI_MINI_PRO, pass_through: VOLUME_KEYS },
};
