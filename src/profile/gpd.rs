//! GPD Win family.
//!
//! GPD wires its back buttons through a "Mouse for Windows" keyboard
//! interface rather than the AT keyboard.

use std::time::Duration;

use super::{CpuMatch, DeviceSelector, HardwareProfile, SystemType, BUS1_GYRO, XBOX_PAD};
use crate::action::LogicalButton::*;
use crate::chord::codes::*;
use crate::chord::definition::{ChordDefinition, ChordTable, Gate};

const GPD_KEYBOARD: &str = "  Mouse for Windows";

const WIN_3: &[ChordDefinition] = &[
    ChordDefinition::instant(Button1, &[&[KEY_LEFTCTRL, KEY_LEFTALT, KEY_DELETE]]),
    ChordDefinition::instant(Button2, &[&[KEY_ESC]]),
];

const WIN_MAX_2: &[ChordDefinition] = &[
    ChordDefinition::queued(Button1, &[&[KEY_PAUSE]]).gated(Gate::Gyro),
    ChordDefinition::instant(Button2, &[&[KEY_SYSRQ]]),
];

const WIN_4: &[ChordDefinition] = &[
    ChordDefinition::queued(Button1, &[&[KEY_PAUSE]]),
    ChordDefinition::queued(Button2, &[&[KEY_SYSRQ]]),
];

pub(super) static GPD_GEN1: HardwareProfile = HardwareProfile {
    system: SystemType::GPD_GEN1,
    product_names: &["G1618-03"],
    cpu: CpuMatch::Any,
    button_delay: Duration::from_millis(90),
    gamepad: DeviceSelector::new(XBOX_PAD, "usb-0000:00:14.0-7/input0"),
    keyboard: DeviceSelector::new(GPD_KEYBOARD, "usb-0000:00:14.0-5/input0"),
    keyboard_2: None,
    gyro: None,
    turbo_takeover: false,
    thermal_policy: false,
    chords: ChordTable { chords: WIN_3, pass_through: VOLUME_KEYS },
};

pub(super) static GPD_GEN2: HardwareProfile = HardwareProfile {
    system: SystemType::GPD_GEN2,
    product_names: &["G1618-04"],
    cpu: CpuMatch::Any,
    button_delay: Duration::from_millis(110),
    gamepad: DeviceSelector::new(XBOX_PAD, "usb-0000:63:00.3-5/input0"),
    keyboard: DeviceSelector::new(GPD_KEYBOARD, "usb-0000:63:00.3-3/input1"),
    keyboard_2: None,
    gyro: None,
    turbo_takeover: false,
    thermal_policy: false,
    chords: ChordTable { chords: WIN_4, pass_through: VOLUME_KEYS },
};

pub(super) static GPD_GEN3: HardwareProfile = HardwareProfile {
    system: SystemType::GPD_GEN3,
    product_names: &["G1619-04"],
    cpu: CpuMatch::Any,
    button_delay: Duration::from_millis(90),
    gamepad: DeviceSelector::new(XBOX_PAD, "usb-0000:73:00.3-4/input0"),
    keyboard: DeviceSelector::new(GPD_KEYBOARD, "usb-0000:73:00.4-2/input0"),
    keyboard_2: None,
    gyro: Some(BUS1_GYRO),
    turbo_takeover: false,
    thermal_policy: false,
    chords: ChordTable { chords: WIN_MAX_2, pass_through: VOLUME_KEYS },
};

pub(super) static GPD_GEN4: HardwareProfile = HardwareProfile {
    system: SystemType::GPD_GEN4,
    product_names: &["G1617-01"],
    cpu: CpuMatch::Any,
    button_delay: Duration::from_millis(110),
    gamepad: DeviceSelector::new(XBOX_PAD, "usb-0000:63:00.3-5/input0"),
    keyboard: DeviceSelector::new(GPD_KEYBOARD, "usb-0000:63:00.3-3/input1"),
    keyboard_2: None,
    gyro: None,
    turbo_takeover: false,
    thermal_policy: false,
    chords: ChordTable { chords: WIN_4, pass_through: VOLUME_KEYS },
};
