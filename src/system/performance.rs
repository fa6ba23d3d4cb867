//! # Performance Mode
//!
//! The power-limit helper (ryzenadj) listens on a unix socket. Each toggle
//! connects, writes one flag and closes. The socket is polled so a toggle
//! pressed while the helper is down is a logged no-op.
//!
//! ## Protocol
//!
//! | Mode | Payload |
//! |------|---------|
//! | Power saving | `--power-saving` |
//! | Max performance | `--max-performance` |

use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::chord::definition::HapticCue;
use crate::error::{HandyconError, Result};

/// ASUS platform thermal policy switch
pub const THERMAL_POLICY_PATH: &str = "/sys/devices/platform/asus-nb-wmi/throttle_thermal_policy";

/// OXP platform switch handing the turbo button to the OS
pub const TURBO_TAKEOVER_PATH: &str = "/sys/devices/platform/oxp-platform/tt_toggle";

/// Power-limit profile requested from the helper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PerformanceMode {
    #[default]
    PowerSaving,
    MaxPerformance,
}

impl PerformanceMode {
    /// Helper command-line flag for this mode
    #[must_use]
    pub fn flag(self) -> &'static str {
        match self {
            PerformanceMode::PowerSaving => "--power-saving",
            PerformanceMode::MaxPerformance => "--max-performance",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            PerformanceMode::PowerSaving => PerformanceMode::MaxPerformance,
            PerformanceMode::MaxPerformance => PerformanceMode::PowerSaving,
        }
    }

    /// Rumble pulses announcing a switch into this mode
    #[must_use]
    pub fn announcement(self) -> &'static [HapticCue] {
        const SAVING: &[HapticCue] = &[HapticCue::millis(100), HapticCue::millis(100)];
        const MAX: &[HapticCue] = &[HapticCue::millis(500), HapticCue::millis(75), HapticCue::millis(75)];
        match self {
            PerformanceMode::PowerSaving => SAVING,
            PerformanceMode::MaxPerformance => MAX,
        }
    }

    /// `throttle_thermal_policy` value matching this mode
    #[must_use]
    pub fn thermal_policy(self) -> &'static str {
        match self {
            PerformanceMode::PowerSaving => "0",
            PerformanceMode::MaxPerformance => "1",
        }
    }
}

/// Connection details and last known availability of the helper socket
#[derive(Debug, Clone)]
pub struct PerformanceChannel {
    socket: PathBuf,
    available: Arc<AtomicBool>,
}

impl PerformanceChannel {
    #[must_use]
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self { socket: socket.into(), available: Arc::new(AtomicBool::new(false)) }
    }

    /// Availability as of the last poll
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn probe(&self) -> bool {
        std::fs::metadata(&self.socket).is_ok_and(|meta| meta.file_type().is_socket())
    }

    /// Re-check the socket once, logging transitions
    pub fn refresh(&self) -> bool {
        let now = self.probe();
        let before = self.available.swap(now, Ordering::Relaxed);
        if now != before {
            if now {
                info!("Performance helper available at {}", self.socket.display());
            } else {
                info!("Performance helper went away");
            }
        }
        now
    }

    /// Poll availability every `interval` until shutdown
    pub async fn poll(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        loop {
            self.refresh();
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => break,
            }
        }
        debug!("Performance poll stopped");
    }

    /// Ask the helper to switch to `mode`
    ///
    /// # Errors
    ///
    /// Returns `Ipc` if the socket refuses the connection or the write fails.
    pub async fn send(&self, mode: PerformanceMode) -> Result<()> {
        let mut stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|e| HandyconError::Ipc(format!("Failed to connect to {}: {}", self.socket.display(), e)))?;
        write_mode(&mut stream, mode)
            .await
            .map_err(|e| HandyconError::Ipc(format!("Failed to send {}: {}", mode.flag(), e)))
    }
}

/// Write one mode request and close the write side
pub async fn write_mode<W: AsyncWrite + Unpin>(writer: &mut W, mode: PerformanceMode) -> std::io::Result<()> {
    writer.write_all(mode.flag().as_bytes()).await?;
    writer.shutdown().await
}

/// Write `value` to a sysfs attribute
pub async fn write_sysfs(path: &Path, value: &str) -> Result<()> {
    tokio::fs::write(path, value).await?;
    debug!("Wrote {} to {}", value, path.display());
    Ok(())
}

/// Hand the turbo button to the OS on OXP devices that support it
pub async fn enable_turbo_takeover(path: &Path) {
    match write_sysfs(path, "1").await {
        Ok(()) => info!("Turbo button takeover enabled"),
        Err(e) => warn!("{} | Could not enable turbo takeover, is oxp-platform loaded?", e),
    }
}
