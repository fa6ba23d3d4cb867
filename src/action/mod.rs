//! # Action Module
//!
//! Logical buttons and the actions they are bound to.
//!
//! This module handles:
//! - The vendor-independent [`LogicalButton`] identities chords resolve to
//! - Symbolic action names as they appear in the configuration file
//! - Resolving each logical button to a [`ButtonAction`] once, at config load
//! - Dispatching resolved buttons (see [`dispatcher`])
//!
//! ## Key Bindings
//!
//! | Action | Emitted codes |
//! |--------|---------------|
//! | `SCR` | BTN_MODE, BTN_TR |
//! | `QAM` | BTN_MODE, BTN_SOUTH |
//! | `ESC` | KEY_ESC |
//! | `OSK` | BTN_MODE, BTN_NORTH |
//! | `MODE` | BTN_MODE |
//! | `ALT_TAB` | KEY_LEFTALT, KEY_TAB |
//! | `KILL` | KEY_LEFTCTRL, KEY_LEFTMETA, KEY_ESC |

pub mod dispatcher;

use std::collections::HashMap;
use std::fmt;

use evdev::{EventType, KeyCode};
use serde::{Deserialize, Serialize};

use crate::config::ButtonMapConfig;

/// Symbolic action names accepted for `button1`..`button12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionName {
    Scr,
    Qam,
    Esc,
    Osk,
    Mode,
    OpenChimera,
    TogglePerformance,
    ToggleMouse,
    AltTab,
    Kill,
    ToggleGyro,
}

/// Actions accepted for `power_button`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerAction {
    Suspend,
    Hibernate,
    Shutdown,
}

impl PowerAction {
    /// `systemctl` verb that carries out this action
    #[must_use]
    pub fn systemctl_verb(self) -> &'static str {
        match self {
            PowerAction::Suspend => "suspend",
            PowerAction::Hibernate => "hibernate",
            PowerAction::Shutdown => "poweroff",
        }
    }
}

/// Vendor-independent identity of a mapped button.
///
/// `Button1`..`Button12` are bound from the configuration file. The volume
/// identities are hard-wired for devices whose volume rocker arrives as a
/// chord, `Companion` always opens the companion app, and `Power` is bound
/// from `power_button`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalButton {
    Button1,
    Button2,
    Button3,
    Button4,
    Button5,
    Button6,
    Button7,
    Button8,
    Button9,
    Button10,
    Button11,
    Button12,
    VolumeUp,
    VolumeDown,
    Companion,
    Power,
}

impl fmt::Display for LogicalButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalButton::Button1 => "button1",
            LogicalButton::Button2 => "button2",
            LogicalButton::Button3 => "button3",
            LogicalButton::Button4 => "button4",
            LogicalButton::Button5 => "button5",
            LogicalButton::Button6 => "button6",
            LogicalButton::Button7 => "button7",
            LogicalButton::Button8 => "button8",
            LogicalButton::Button9 => "button9",
            LogicalButton::Button10 => "button10",
            LogicalButton::Button11 => "button11",
            LogicalButton::Button12 => "button12",
            LogicalButton::VolumeUp => "volume_up",
            LogicalButton::VolumeDown => "volume_down",
            LogicalButton::Companion => "companion",
            LogicalButton::Power => "power_button",
        };
        f.write_str(name)
    }
}

/// Named side effects a button can trigger instead of emitting events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    TogglePerformance,
    OpenCompanion,
    ToggleGyro,
    ToggleMouse,
    Power(PowerAction),
}

/// What a logical button does when dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Ordered `(event type, code)` pairs emitted on the virtual controller
    Keys(Vec<(EventType, u16)>),
    /// Side effect run once per press
    Effect(EffectKind),
}

impl ButtonAction {
    fn keys(codes: &[KeyCode]) -> Self {
        ButtonAction::Keys(codes.iter().map(|key| (EventType::KEY, key.code())).collect())
    }
}

/// Press/release polarity passed to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Release,
    Press,
    Hold,
}

impl Polarity {
    /// evdev key value for this polarity
    #[must_use]
    pub fn value(self) -> i32 {
        match self {
            Polarity::Release => 0,
            Polarity::Press => 1,
            Polarity::Hold => 2,
        }
    }
}

impl From<ActionName> for ButtonAction {
    fn from(name: ActionName) -> Self {
        match name {
            ActionName::Scr => ButtonAction::keys(&[KeyCode::BTN_MODE, KeyCode::BTN_TR]),
            ActionName::Qam => ButtonAction::keys(&[KeyCode::BTN_MODE, KeyCode::BTN_SOUTH]),
            ActionName::Esc => ButtonAction::keys(&[KeyCode::KEY_ESC]),
            ActionName::Osk => ButtonAction::keys(&[KeyCode::BTN_MODE, KeyCode::BTN_NORTH]),
            ActionName::Mode => ButtonAction::keys(&[KeyCode::BTN_MODE]),
            ActionName::AltTab => ButtonAction::keys(&[KeyCode::KEY_LEFTALT, KeyCode::KEY_TAB]),
            ActionName::Kill => ButtonAction::keys(&[
                KeyCode::KEY_LEFTCTRL,
                KeyCode::KEY_LEFTMETA,
                KeyCode::KEY_ESC,
            ]),
            ActionName::OpenChimera => ButtonAction::Effect(EffectKind::OpenCompanion),
            ActionName::TogglePerformance => ButtonAction::Effect(EffectKind::TogglePerformance),
            ActionName::ToggleMouse => ButtonAction::Effect(EffectKind::ToggleMouse),
            ActionName::ToggleGyro => ButtonAction::Effect(EffectKind::ToggleGyro),
        }
    }
}

/// Logical button bindings, resolved once from the configuration.
#[derive(Debug, Clone)]
pub struct ButtonMap {
    bindings: HashMap<LogicalButton, ButtonAction>,
}

impl ButtonMap {
    /// Resolve every configurable and fixed logical button.
    #[must_use]
    pub fn from_config(config: &ButtonMapConfig) -> Self {
        let configured = [
            (LogicalButton::Button1, config.button1),
            (LogicalButton::Button2, config.button2),
            (LogicalButton::Button3, config.button3),
            (LogicalButton::Button4, config.button4),
            (LogicalButton::Button5, config.button5),
            (LogicalButton::Button6, config.button6),
            (LogicalButton::Button7, config.button7),
            (LogicalButton::Button8, config.button8),
            (LogicalButton::Button9, config.button9),
            (LogicalButton::Button10, config.button10),
            (LogicalButton::Button11, config.button11),
            (LogicalButton::Button12, config.button12),
        ];

        let mut bindings: HashMap<LogicalButton, ButtonAction> = configured
            .into_iter()
            .map(|(button, name)| (button, ButtonAction::from(name)))
            .collect();

        bindings.insert(LogicalButton::VolumeUp, ButtonAction::keys(&[KeyCode::KEY_VOLUMEUP]));
        bindings.insert(LogicalButton::VolumeDown, ButtonAction::keys(&[KeyCode::KEY_VOLUMEDOWN]));
        bindings.insert(LogicalButton::Companion, ButtonAction::Effect(EffectKind::OpenCompanion));
        bindings.insert(
            LogicalButton::Power,
            ButtonAction::Effect(EffectKind::Power(config.power_button)),
        );

        Self { bindings }
    }

    /// Action bound to `button`
    #[must_use]
    pub fn get(&self, button: LogicalButton) -> Option<&ButtonAction> {
        self.bindings.get(&button)
    }
}
