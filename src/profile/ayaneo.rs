//! AYANEO family.
//!
//! Older models report their buttons as Ctrl/Meta chords on the AT keyboard.
//! The AIR Plus line reuses one chord for three buttons and tells them apart
//! with a vendor `MSC_SCAN` code. Later models moved to F15-F18.

use std::time::Duration;

use super::{CpuMatch, DeviceSelector, HardwareProfile, SystemType, AT_KEYBOARD, BUS1_GYRO, XBOX_PAD};
use crate::action::LogicalButton::*;
use crate::chord::codes::*;
use crate::chord::definition::{ChordDefinition, ChordTable, Gate};

const FOUNDER: &[ChordDefinition] = &[
    // Meta key, held back while a power sequence is in flight
    ChordDefinition::queued(Button1, &[&[KEY_LEFTMETA]]).gated(Gate::NoSuspendPending),
    // Quick access menu
    ChordDefinition::queued(Button2, &[&[KEY_RIGHTCTRL, KEY_RIGHTALT, KEY_DELETE]]).haptic_on_press(150),
    ChordDefinition::queued(Button3, &[&[KEY_ESC]]),
    // Keyboard
    ChordDefinition::queued(Button4, &[&[KEY_O, KEY_RIGHTCTRL, KEY_LEFTMETA]]),
];

const NEXT: &[ChordDefinition] = &[
    // AYANEO button, two firmware variants
    ChordDefinition::instant(Button2, &[&[KEY_APOSTROPHE, KEY_COPY], &[KEY_D, KEY_LEFTMETA]])
        .release(&[KEY_D, KEY_APOSTROPHE, KEY_LEFTMETA, KEY_COPY])
        .haptic_on_press(150),
    // Big button, two firmware variants
    ChordDefinition::instant(
        Button5,
        &[&[KEY_KPENTER, KEY_LEFT, KEY_COPY], &[KEY_F12, KEY_RIGHTCTRL, KEY_LEFTMETA]],
    )
    .release(&[KEY_F12, KEY_KPENTER, KEY_RIGHTCTRL, KEY_LEFT, KEY_LEFTMETA, KEY_COPY]),
];

const LC: &[&[u16]] = &[&[KEY_F11, KEY_RIGHTCTRL, KEY_LEFTMETA]];

const AIR: &[ChordDefinition] = &[
    // LC opens the companion app when it is installed
    ChordDefinition::queued(Companion, LC).gated(Gate::Companion),
    ChordDefinition::instant(Button1, LC).gated(Gate::NoCompanion),
    // AYA
    ChordDefinition::instant(Button2, &[&[KEY_D, KEY_LEFTMETA]])
        .release(&[KEY_D, KEY_APOSTROPHE, KEY_LEFTMETA, KEY_COPY])
        .haptic_on_press(150),
    // LC + RC
    ChordDefinition::queued(Button3, &[&[KEY_F10, KEY_F11, KEY_RIGHTCTRL, KEY_LEFTMETA]])
        .gated(Gate::Gyro)
        .supersedes(&[Button1, Button4]),
    // RC
    ChordDefinition::instant(Button4, &[&[KEY_F10, KEY_RIGHTCTRL, KEY_LEFTMETA]]),
    // Big button
    ChordDefinition::instant(Button5, &[&[KEY_F12, KEY_RIGHTCTRL, KEY_LEFTMETA]]),
    // AYA + big button
    ChordDefinition::queued(Button7, &[&[KEY_D, KEY_F12, KEY_RIGHTCTRL, KEY_LEFTMETA]]),
];

const CUSTOM_KEY: &[&[u16]] = &[&[KEY_LEFTCTRL, KEY_LEFTMETA], &[KEY_RIGHTCTRL, KEY_LEFTMETA]];
const CUSTOM_RELEASE: &[u16] = &[KEY_RIGHTCTRL, KEY_LEFTMETA];

const AIR_PLUS: &[ChordDefinition] = &[
    ChordDefinition::instant(Button1, CUSTOM_KEY)
        .scan(SCAN_LEFT_CUSTOM)
        .release(CUSTOM_RELEASE)
        .gated(Gate::Idle),
    ChordDefinition::instant(Button2, &[&[KEY_D, KEY_LEFTMETA]]),
    ChordDefinition::instant(Button4, CUSTOM_KEY)
        .scan(SCAN_RIGHT_CUSTOM)
        .release(CUSTOM_RELEASE)
        .gated(Gate::Idle),
    ChordDefinition::instant(Button5, CUSTOM_KEY)
        .scan(SCAN_AYA_SPACE)
        .release(CUSTOM_RELEASE)
        .gated(Gate::Idle),
];

const F_KEYS: &[ChordDefinition] = &[
    ChordDefinition::queued(Button1, &[&[KEY_RIGHTCTRL, KEY_LEFTMETA, KEY_F15]]),
    ChordDefinition::queued(Button2, &[&[KEY_D, KEY_LEFTMETA]]),
    ChordDefinition::queued(Button4, &[&[KEY_RIGHTCTRL, KEY_LEFTMETA, KEY_F16]]),
    ChordDefinition::queued(Button5, &[&[KEY_RIGHTCTRL, KEY_LEFTMETA, KEY_F17]]),
    ChordDefinition::queued(Button6, &[&[KEY_RIGHTCTRL, KEY_LEFTMETA, KEY_F18]]),
];

const fn ayaneo(
    system: SystemType,
    product_names: &'static [&'static str],
    delay_ms: u64,
    gamepad_phys: &'static str,
    chords: &'static [ChordDefinition],
) -> HardwareProfile {
    HardwareProfile {
        system,
        product_names,
        cpu: CpuMatch::Any,
        button_delay: Duration::from_millis(delay_ms),
        gamepad: DeviceSelector::new(XBOX_PAD, gamepad_phys),
        keyboard: AT_KEYBOARD,
        keyboard_2: None,
        gyro: None,
        turbo_takeover: false,
        thermal_policy: false,
        chords: ChordTable { chords, pass_through: VOLUME_KEYS },
    }
}

pub(super) static AYA_GEN1: HardwareProfile = ayaneo(
    SystemType::AYA_GEN1,
    &["AYA NEO FOUNDER", "AYA NEO 2021", "AYANEO 2021", "AYANEO 2021 Pro", "AYANEO 2021 Pro Retro Power"],
    90,
    "usb-0000:03:00.3-4/input0",
    FOUNDER,
);

pub(super) static AYA_GEN2: HardwareProfile = ayaneo(
    SystemType::AYA_GEN2,
    &["NEXT", "NEXT Pro", "NEXT Advance", "AYANEO NEXT", "AYANEO NEXT Pro", "AYANEO NEXT Advance"],
    100,
    "usb-0000:03:00.3-4/input0",
    NEXT,
);

pub(super) static AYA_GEN3: HardwareProfile = HardwareProfile {
    gyro: Some(BUS1_GYRO),
    ..ayaneo(SystemType::AYA_GEN3, &["AIR", "AIR Pro"], 75, "usb-0000:04:00.3-4/input0", AIR)
};

pub(super) static AYA_GEN4: HardwareProfile =
    ayaneo(SystemType::AYA_GEN4, &["AYANEO 2", "GEEK"], 90, "usb-0000:64:00.3-3/input0", AIR_PLUS);

pub(super) static AYA_GEN5: HardwareProfile =
    ayaneo(SystemType::AYA_GEN5, &["AIR Plus"], 90, "usb-0000:64:00.3-3/input0", AIR_PLUS);

pub(super) static AYA_GEN6: HardwareProfile = ayaneo(
    SystemType::AYA_GEN6,
    &["AYANEO 2S", "GEEK 1S", "AIR 1S", "AIR 1S Limited"],
    110,
    "usb-0000:c4:00.3-4.1/input0",
    F_KEYS,
);

pub(super) static AYA_GEN8: HardwareProfile =
    ayaneo(SystemType::AYA_GEN8, &["KUN"], 110, "usb-0000:c4:00.3-4.1/input0", F_KEYS);
