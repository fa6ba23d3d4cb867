//! # System Module
//!
//! Everything the daemon needs from the host outside of input devices.
//!
//! This module handles:
//! - Reading the DMI product name and CPU vendor ([`identity`])
//! - Running OS commands behind a mockable seam ([`command`])
//! - Session user discovery and the Steam Game Mode handoff ([`steam`])
//! - The performance-mode helper socket and platform quirks ([`performance`])
//! - Whether the onboard gyro is reachable ([`gyro`])

pub mod command;
pub mod gyro;
pub mod identity;
pub mod performance;
pub mod steam;

use std::path::Path;

use tracing::debug;

/// Default procfs mount
pub const PROC_DIR: &str = "/proc";

/// Whether a process whose `comm` is `name` is running
///
/// Processes that exit while being scanned are skipped.
#[must_use]
pub fn process_running(proc_dir: &Path, name: &str) -> bool {
    let entries = match std::fs::read_dir(proc_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Could not read {}: {}", proc_dir.display(), e);
            return false;
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|entry| std::fs::read_to_string(entry.path().join("comm")).ok())
        .any(|comm| comm.trim() == name)
}
