//! # Hardware Profile Registry
//!
//! Static table of supported handhelds, selected once at startup from the DMI
//! product name (and CPU vendor where the product name is ambiguous).
//!
//! This module handles:
//! - Device selectors (name + physical path) for the gamepad and keyboards
//! - Per-model timing, gyro and platform quirks
//! - Each model's chord table
//!
//! Unknown hardware is an error. Running with the wrong chord table would emit
//! the wrong buttons, so there is no fallback profile.

mod anbernic;
mod asus;
mod ayaneo;
mod ayn;
mod gpd;
mod lenovo;
mod onexplayer;

use std::fmt;
use std::time::Duration;

use tracing::{debug, info};

use crate::chord::definition::ChordTable;
use crate::error::{HandyconError, Result};

/// Name and physical path of an input device to grab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSelector {
    pub name: &'static str,
    pub phys: &'static str,
}

impl DeviceSelector {
    #[must_use]
    pub const fn new(name: &'static str, phys: &'static str) -> Self {
        Self { name, phys }
    }

    /// Whether a device reporting `name` and `phys` is this one
    #[must_use]
    pub fn matches(&self, name: Option<&str>, phys: Option<&str>) -> bool {
        name == Some(self.name) && phys == Some(self.phys)
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name.trim(), self.phys)
    }
}

/// I2C location of an onboard gyro
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GyroAddress {
    pub bus: u8,
    pub address: u16,
}

/// CPU vendor requirement, for product names shared across CPU variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuMatch {
    Any,
    Is(&'static str),
    Not(&'static str),
}

impl CpuMatch {
    #[must_use]
    pub fn accepts(self, vendor: &str) -> bool {
        match self {
            CpuMatch::Any => true,
            CpuMatch::Is(expected) => vendor == expected,
            CpuMatch::Not(excluded) => vendor != excluded,
        }
    }
}

/// Supported hardware families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum SystemType {
    ALY_GEN1,
    ANB_GEN1,
    AYA_GEN1,
    AYA_GEN2,
    AYA_GEN3,
    AYA_GEN4,
    AYA_GEN5,
    AYA_GEN6,
    AYA_GEN8,
    AYN_GEN1,
    AYN_GEN3,
    GO_GEN1,
    GPD_GEN1,
    GPD_GEN2,
    GPD_GEN3,
    GPD_GEN4,
    OXP_GEN1,
    OXP_GEN2,
    OXP_GEN3,
    OXP_GEN4,
    OXP_GEN5,
    OXP_GEN7,
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything the daemon needs to know about one hardware family.
#[derive(Debug)]
pub struct HardwareProfile {
    pub system: SystemType,
    /// DMI `product_name` values identifying this family
    pub product_names: &'static [&'static str],
    pub cpu: CpuMatch,
    /// Pause between events of a multi-key action
    pub button_delay: Duration,
    pub gamepad: DeviceSelector,
    pub keyboard: DeviceSelector,
    /// Some models split their chords across two keyboard devices
    pub keyboard_2: Option<DeviceSelector>,
    pub gyro: Option<GyroAddress>,
    /// Write the OXP platform turbo takeover switch at startup
    pub turbo_takeover: bool,
    /// Toggle the ASUS thermal policy along with the performance mode
    pub thermal_policy: bool,
    pub chords: ChordTable,
}

/// Power button nodes. Both are grabbed when present but never hidden.
pub const POWER_BUTTONS: [DeviceSelector; 2] = [
    DeviceSelector::new("Power Button", "LNXPWRBN/button/input0"),
    DeviceSelector::new("Power Button", "PNP0C0C/button/input0"),
];

const XBOX_PAD: &str = "Microsoft X-Box 360 pad";
const AT_KEYBOARD: DeviceSelector = DeviceSelector::new("AT Translated Set 2 keyboard", "isa0060/serio0/input0");
const BUS1_GYRO: GyroAddress = GyroAddress { bus: 1, address: 0x68 };

static REGISTRY: [&HardwareProfile; 22] = [
    &asus::ALY_GEN1,
    &anbernic::ANB_GEN1,
    &ayaneo::AYA_GEN1,
    &ayaneo::AYA_GEN2,
    &ayaneo::AYA_GEN3,
    &ayaneo::AYA_GEN4,
    &ayaneo::AYA_GEN5,
    &ayaneo::AYA_GEN6,
    &ayaneo::AYA_GEN8,
    &ayn::AYN_GEN1,
    &ayn::AYN_GEN3,
    &lenovo::GO_GEN1,
    &gpd::GPD_GEN1,
    &gpd::GPD_GEN2,
    &gpd::GPD_GEN3,
    &gpd::GPD_GEN4,
    &onexplayer::OXP_GEN1,
    &onexplayer::OXP_GEN2,
    &onexplayer::OXP_GEN3,
    &onexplayer::OXP_GEN4,
    &onexplayer::OXP_GEN5,
    &onexplayer::OXP_GEN7,
];

/// Every supported profile
#[must_use]
pub fn all() -> &'static [&'static HardwareProfile] {
    &REGISTRY
}

/// Select the hardware profile for this machine
///
/// # Arguments
///
/// * `product_name` - DMI product name
/// * `cpu_vendor` - `vendor_id` from `/proc/cpuinfo`
///
/// # Errors
///
/// Returns `UnsupportedDevice` naming both identifiers when no profile matches.
///
/// # Examples
///
/// ```
/// use handycon::profile::{self, SystemType};
///
/// let profile = profile::identify("ONEXPLAYER", "GenuineIntel")?;
/// assert_eq!(profile.system, SystemType::OXP_GEN1);
///
/// let profile = profile::identify("ONEXPLAYER", "AuthenticAMD")?;
/// assert_eq!(profile.system, SystemType::OXP_GEN2);
/// # Ok::<(), handycon::error::HandyconError>(())
/// ```
pub fn identify(product_name: &str, cpu_vendor: &str) -> Result<&'static HardwareProfile> {
    let product_name = product_name.trim();
    let cpu_vendor = cpu_vendor.trim();
    debug!("Identifying system: {} (CPU vendor: {})", product_name, cpu_vendor);

    let profile = REGISTRY
        .iter()
        .copied()
        .find(|profile| {
            profile.product_names.iter().any(|name| *name == product_name)
                && profile.cpu.accepts(cpu_vendor)
        })
        .ok_or_else(|| HandyconError::UnsupportedDevice {
            product_name: product_name.to_string(),
            cpu_vendor: cpu_vendor.to_string(),
        })?;

    info!("Identified {} as {}", product_name, profile.system);
    Ok(profile)
}
