//! Host identification inputs, read once at startup.

use std::path::Path;

use tracing::warn;

use crate::error::Result;

/// DMI product name exposed by the firmware
pub const PRODUCT_NAME_PATH: &str = "/sys/devices/virtual/dmi/id/product_name";

pub const CPUINFO_PATH: &str = "/proc/cpuinfo";

/// Identifiers used to select a hardware profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemIdentity {
    pub product_name: String,
    pub cpu_vendor: String,
}

impl SystemIdentity {
    /// Read the identity of the running machine
    ///
    /// # Errors
    ///
    /// Returns `Io` if the DMI product name cannot be read. A missing CPU
    /// vendor is logged and left empty.
    pub fn read() -> Result<Self> {
        Self::read_from(Path::new(PRODUCT_NAME_PATH), Path::new(CPUINFO_PATH))
    }

    /// Read the identity from explicit file locations
    pub fn read_from(product_name_path: &Path, cpuinfo_path: &Path) -> Result<Self> {
        let product_name = std::fs::read_to_string(product_name_path)?.trim().to_string();

        let cpu_vendor = match std::fs::read_to_string(cpuinfo_path) {
            Ok(cpuinfo) => parse_cpu_vendor(&cpuinfo).unwrap_or_default().to_string(),
            Err(e) => {
                warn!("Could not read {}: {}", cpuinfo_path.display(), e);
                String::new()
            }
        };

        Ok(Self { product_name, cpu_vendor })
    }
}

/// Value of the first `vendor_id` line in `/proc/cpuinfo` content
#[must_use]
pub fn parse_cpu_vendor(cpuinfo: &str) -> Option<&str> {
    cpuinfo.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "vendor_id").then(|| value.trim())
    })
}
