//! Raw keyboard codes used by the vendor chord tables.
//!
//! Vendors wire their extra buttons to ordinary keyboard scancodes, so the
//! tables are written in terms of the Linux `KEY_*` numbering.

#![allow(missing_docs)]

pub const KEY_ESC: u16 = 1;
pub const KEY_TAB: u16 = 15;
pub const KEY_T: u16 = 20;
pub const KEY_O: u16 = 24;
pub const KEY_P: u16 = 25;
pub const KEY_LEFTCTRL: u16 = 29;
pub const KEY_D: u16 = 32;
pub const KEY_G: u16 = 34;
pub const KEY_APOSTROPHE: u16 = 40;
pub const KEY_LEFTSHIFT: u16 = 42;
pub const KEY_N: u16 = 49;
pub const KEY_LEFTALT: u16 = 56;
pub const KEY_F10: u16 = 68;
pub const KEY_F11: u16 = 87;
pub const KEY_F12: u16 = 88;
pub const KEY_KPENTER: u16 = 96;
pub const KEY_RIGHTCTRL: u16 = 97;
pub const KEY_SYSRQ: u16 = 99;
pub const KEY_RIGHTALT: u16 = 100;
pub const KEY_LEFT: u16 = 105;
pub const KEY_DELETE: u16 = 111;
pub const KEY_VOLUMEDOWN: u16 = 114;
pub const KEY_VOLUMEUP: u16 = 115;
pub const KEY_POWER: u16 = 116;
pub const KEY_PAUSE: u16 = 119;
pub const KEY_LEFTMETA: u16 = 125;
pub const KEY_COPY: u16 = 133;
pub const KEY_PROG1: u16 = 148;
pub const KEY_F14: u16 = 184;
pub const KEY_F15: u16 = 185;
pub const KEY_F16: u16 = 186;
pub const KEY_F17: u16 = 187;
pub const KEY_F18: u16 = 188;

/// Vendor scancodes reported through `MSC_SCAN` by the AYANEO AIR Plus family
pub const SCAN_LEFT_CUSTOM: i32 = 102;
pub const SCAN_RIGHT_CUSTOM: i32 = 103;
pub const SCAN_AYA_SPACE: i32 = 104;

/// Volume rocker, forwarded untouched on most devices
pub const VOLUME_KEYS: &[u16] = &[KEY_VOLUMEDOWN, KEY_VOLUMEUP];

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::KeyCode;

    #[test]
    fn test_codes_match_kernel_numbering() {
        assert_eq!(KeyCode::KEY_LEFTMETA.code(), KEY_LEFTMETA);
        assert_eq!(KeyCode::KEY_RIGHTCTRL.code(), KEY_RIGHTCTRL);
        assert_eq!(KeyCode::KEY_DELETE.code(), KEY_DELETE);
        assert_eq!(KeyCode::KEY_PROG1.code(), KEY_PROG1);
        assert_eq!(KeyCode::KEY_F18.code(), KEY_F18);
        assert_eq!(KeyCode::KEY_POWER.code(), KEY_POWER);
    }
}
