//! ONEXPLAYER and AOKZOE family.
//!
//! The original ONEXPLAYER shipped with both Intel and AMD boards under the
//! same DMI name, so those two profiles are split on CPU vendor.

use std::time::Duration;

use super::{CpuMatch, DeviceSelector, HardwareProfile, SystemType, AT_KEYBOARD, BUS1_GYRO, XBOX_PAD};
use crate::action::LogicalButton::*;
use crate::chord::codes::*;
use crate::chord::definition::{ChordDefinition, ChordTable, Gate};

const INTEL_VENDOR: &str = "GenuineIntel";
const OXP_PAD: &str = "OneXPlayer Gamepad";

const ORIGINAL: &[ChordDefinition] = &[
    ChordDefinition::queued(Button1, &[&[KEY_SYSRQ, KEY_LEFTMETA]]),
    ChordDefinition::queued(Button2, &[&[KEY_D, KEY_LEFTMETA]]).haptic_on_press(150),
    ChordDefinition::queued(Button3, &[&[KEY_RIGHTCTRL, KEY_RIGHTALT, KEY_DELETE]])
        .release(&[KEY_RIGHTALT, KEY_DELETE]),
    ChordDefinition::queued(Button4, &[&[KEY_O, KEY_RIGHTCTRL, KEY_LEFTMETA]]),
];

const MINI: &[ChordDefinition] = &[
    // Turbo + meta
    ChordDefinition::queued(Button7, &[&[KEY_SYSRQ, KEY_LEFTMETA]]),
    ChordDefinition::queued(Button2, &[&[KEY_G, KEY_LEFTMETA]]).haptic_on_press(150),
    ChordDefinition::queued(Button3, &[&[KEY_RIGHTCTRL, KEY_RIGHTALT, KEY_DELETE]])
        .release(&[KEY_RIGHTALT, KEY_DELETE])
        .gated(Gate::Gyro),
    ChordDefinition::queued(Button4, &[&[KEY_O, KEY_RIGHTCTRL, KEY_LEFTMETA]]),
    ChordDefinition::queued(Button5, &[&[KEY_D, KEY_LEFTMETA]]),
];

const MINI_PRO: &[ChordDefinition] = &[
    ChordDefinition::queued(Button1, &[&[KEY_SYSRQ, KEY_LEFTMETA]]),
    ChordDefinition::queued(Button2, &[&[KEY_G, KEY_LEFTMETA]]).haptic_on_press(150),
    ChordDefinition::queued(Button3, &[&[KEY_RIGHTCTRL, KEY_RIGHTALT, KEY_DELETE]])
        .release(&[KEY_RIGHTALT, KEY_DELETE]),
    ChordDefinition::queued(Button4, &[&[KEY_O, KEY_RIGHTCTRL, KEY_LEFTMETA]]),
    ChordDefinition::queued(Button5, &[&[KEY_D, KEY_LEFTMETA]]),
];

const TWO: &[ChordDefinition] = &[
    ChordDefinition::queued(VolumeUp, &[&[KEY_D, KEY_LEFTMETA]]).release(&[KEY_D]),
    ChordDefinition::queued(VolumeDown, &[&[KEY_O, KEY_LEFTCTRL, KEY_LEFTMETA]]).release(&[KEY_O, KEY_LEFTCTRL]),
    ChordDefinition::queued(Button2, &[&[KEY_LEFTCTRL, KEY_LEFTALT, KEY_LEFTMETA]])
        .release(&[KEY_LEFTCTRL, KEY_LEFTALT]),
];

const F1: &[ChordDefinition] = &[
    ChordDefinition::queued(Button1, &[&[KEY_SYSRQ, KEY_LEFTMETA]]).release(&[KEY_SYSRQ]),
    ChordDefinition::queued(Button2, &[&[KEY_LEFTCTRL, KEY_LEFTALT, KEY_LEFTMETA]])
        .release(&[KEY_LEFTCTRL, KEY_LEFTALT]),
    ChordDefinition::queued(Button3, &[&[KEY_RIGHTCTRL, KEY_RIGHTALT, KEY_DELETE]]),
    ChordDefinition::queued(Button4, &[&[KEY_O, KEY_RIGHTCTRL, KEY_LEFTMETA]])
        .release(&[KEY_O, KEY_RIGHTCTRL]),
    ChordDefinition::queued(Button5, &[&[KEY_D, KEY_LEFTMETA]]).release(&[KEY_D]),
    ChordDefinition::queued(Button6, &[&[KEY_G, KEY_LEFTMETA]]).release(&[KEY_G]),
];

const ONEXPLAYER: HardwareProfile = HardwareProfile {
    system: SystemType::OXP_GEN1,
    product_names: &["ONE XPLAYER", "ONEXPLAYER"],
    cpu: CpuMatch::Is(INTEL_VENDOR),
    button_delay: Duration::from_millis(110),
    gamepad: DeviceSelector::new(OXP_PAD, "usb-0000:00:14.0-9/input0"),
    keyboard: AT_KEYBOARD,
    keyboard_2: None,
    gyro: None,
    turbo_takeover: false,
    thermal_policy: false,
    chords: ChordTable { chords: ORIGINAL, pass_through: VOLUME_KEYS },
};

pub(super) static OXP_GEN1: HardwareProfile = ONEXPLAYER;

pub(super) static OXP_GEN2: HardwareProfile = HardwareProfile {
    system: SystemType::OXP_GEN2,
    cpu: CpuMatch::Not(INTEL_VENDOR),
    ..ONEXPLAYER
};

const MINI_BASE: HardwareProfile = HardwareProfile {
    system: SystemType::OXP_GEN3,
    product_names: &["ONEXPLAYER mini A07"],
    cpu: CpuMatch::Any,
    button_delay: Duration::from_millis(90),
    gamepad: DeviceSelector::new(XBOX_PAD, "usb-0000:e3:00.3-4/input0"),
    keyboard: AT_KEYBOARD,
    keyboard_2: None,
    gyro: Some(BUS1_GYRO),
    turbo_takeover: false,
    thermal_policy: false,
    chords: ChordTable { chords: MINI, pass_through: VOLUME_KEYS },
};

pub(super) static OXP_GEN3: HardwareProfile = MINI_BASE;

pub(super) static OXP_GEN4: HardwareProfile = HardwareProfile {
    system: SystemType::OXP_GEN4,
    product_names: &["ONEXPLAYER Mini Pro", "AOKZOE A1 AR07", "AOKZOE A1 Pro"],
    gyro: None,
    chords: ChordTable { chords: MINI_PRO, pass_through: VOLUME_KEYS },
    ..MINI_BASE
};

const TWO_BASE: HardwareProfile = HardwareProfile {
    system: SystemType::OXP_GEN5,
    product_names: &["ONEXPLAYER 2 ARP23"],
    cpu: CpuMatch::Any,
    button_delay: Duration::from_millis(90),
    gamepad: DeviceSelector::new(XBOX_PAD, "usb-0000:74:00.3-4/input0"),
    keyboard: AT_KEYBOARD,
    keyboard_2: None,
    gyro: None,
    turbo_takeover: true,
    thermal_policy: false,
    chords: ChordTable { chords: TWO, pass_through: VOLUME_KEYS },
};

pub(super) static OXP_GEN5: HardwareProfile = TWO_BASE;

pub(super) static OXP_GEN7: HardwareProfile = HardwareProfile {
    system: SystemType::OXP_GEN7,
    product_names: &["ONEXPLAYER F1", "ONEXPLAYER F1 EVA-01"],
    gamepad: DeviceSelector::new(XBOX_PAD, "usb-0000:c4:00.3-4/input0"),
    chords: ChordTable { chords: F1, pass_through: VOLUME_KEYS },
    ..TWO_BASE
};
