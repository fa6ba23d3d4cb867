//! # Gyro Presence
//!
//! Models with an onboard BMI160 expose it through i2c-dev. The gyro counts
//! as present while its bus node opens read/write. The `Gyro` chord gate and
//! the gyro toggle both read the last poll.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::profile::GyroAddress;

/// Where i2c-dev bus nodes live
pub const DEV_DIR: &str = "/dev";

/// Bus node and last known presence of the gyro
#[derive(Debug, Clone)]
pub struct GyroProbe {
    node: Option<PathBuf>,
    available: Arc<AtomicBool>,
}

impl GyroProbe {
    /// Probe for `gyro` under `dev_dir`. `None` means the model has no gyro.
    #[must_use]
    pub fn new(dev_dir: &Path, gyro: Option<GyroAddress>) -> Self {
        let node = gyro.map(|gyro| dev_dir.join(format!("i2c-{}", gyro.bus)));
        Self { node, available: Arc::new(AtomicBool::new(false)) }
    }

    /// Presence as of the last poll
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn probe(&self) -> bool {
        self.node
            .as_ref()
            .is_some_and(|node| OpenOptions::new().read(true).write(true).open(node).is_ok())
    }

    /// Re-check the bus node once, logging transitions
    pub fn refresh(&self) -> bool {
        let now = self.probe();
        let before = self.available.swap(now, Ordering::Relaxed);
        if now != before {
            if now {
                info!("Found gyro device. Gyro support enabled.");
            } else {
                warn!("Gyro device lost, gyro chords disabled");
            }
        }
        now
    }

    /// Poll presence every `interval` until shutdown
    pub async fn poll(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let Some(node) = self.node.clone() else {
            return;
        };
        if !self.refresh() {
            warn!("Gyro device not initialized at {}. Ensure the i2c_dev module is loaded.", node.display());
        }
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => break,
            }
            self.refresh();
        }
        debug!("Gyro poll stopped");
    }
}
