//! # Device Module
//!
//! Finds, grabs and hides the handheld's built-in input devices.
//!
//! This module handles:
//! - Scanning `/dev/input/event*` in sorted order for a name + phys match
//! - Exclusive grabs so the desktop never sees the raw vendor chords
//! - Moving grabbed nodes into a hidden directory, and moving them back
//!
//! Hiding keeps other input stacks (Steam, SDL) from opening the raw device
//! alongside the virtual controller. Restoring is idempotent: every loop and
//! the shutdown path may attempt it, and a node that is already back is left
//! alone.

use std::io;
use std::path::{Path, PathBuf};

use evdev::{Device, EventStream, InputEvent};
use tracing::{debug, info, warn};

use crate::error::{HandyconError, Result};
use crate::profile::DeviceSelector;

/// Directory scanned for event nodes
pub const INPUT_DIR: &str = "/dev/input";

/// A node moved out of `/dev/input`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenNode {
    original: PathBuf,
    hidden: PathBuf,
}

impl HiddenNode {
    /// Move `original` into `hide_dir`
    ///
    /// # Errors
    ///
    /// Returns `Device` if the node cannot be moved.
    pub fn hide(original: &Path, hide_dir: &Path) -> Result<Self> {
        let name = original
            .file_name()
            .ok_or_else(|| HandyconError::Device(format!("{} has no file name", original.display())))?;
        let hidden = hide_dir.join(name);

        std::fs::rename(original, &hidden).map_err(|e| {
            HandyconError::Device(format!("Failed to hide {}: {}", original.display(), e))
        })?;
        debug!("Hid {} at {}", original.display(), hidden.display());

        Ok(Self { original: original.to_path_buf(), hidden })
    }

    /// Move the node back where it was
    ///
    /// A hidden node that no longer exists is treated as already restored.
    pub fn restore(&self) -> Result<()> {
        match std::fs::rename(&self.hidden, &self.original) {
            Ok(()) => {
                debug!("Restored {}", self.original.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HandyconError::Device(format!(
                "Failed to restore {}: {}",
                self.original.display(),
                e
            ))),
        }
    }

    #[must_use]
    pub fn original(&self) -> &Path {
        &self.original
    }

    #[must_use]
    pub fn hidden(&self) -> &Path {
        &self.hidden
    }
}

/// A grabbed input device, read as an async event stream
pub struct AcquiredDevice {
    stream: EventStream,
    path: PathBuf,
    hidden: Option<HiddenNode>,
    released: bool,
}

impl std::fmt::Debug for AcquiredDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquiredDevice")
            .field("path", &self.path)
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}

impl AcquiredDevice {
    /// Next event from the device
    ///
    /// # Errors
    ///
    /// Returns the read error once the device is gone.
    pub async fn next_event(&mut self) -> io::Result<InputEvent> {
        self.stream.next_event().await
    }

    /// Keys currently held, in ascending code order
    #[must_use]
    pub fn active_keys(&self) -> Vec<u16> {
        match self.stream.device().get_key_state() {
            Ok(keys) => keys.iter().map(|key| key.code()).collect(),
            Err(e) => {
                debug!("{} | Could not read key state of {}", e, self.path.display());
                Vec::new()
            }
        }
    }

    #[must_use]
    pub fn device(&self) -> &Device {
        self.stream.device()
    }

    pub fn device_mut(&mut self) -> &mut Device {
        self.stream.device_mut()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ungrab and restore the node. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Err(e) = self.stream.device_mut().ungrab() {
            warn!("{} | Device wasn't grabbed.", e);
        }
        if let Some(hidden) = &self.hidden {
            if let Err(e) = hidden.restore() {
                warn!("{}", e);
            }
        }
        info!("Released {}", self.path.display());
    }
}

impl Drop for AcquiredDevice {
    fn drop(&mut self) {
        self.release();
    }
}

/// Event nodes under `input_dir`, sorted by path
pub fn event_nodes(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut nodes: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .map_err(|e| HandyconError::Device(format!("Failed to read {}: {}", input_dir.display(), e)))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("event"))
        })
        .collect();

    // Sort entries for deterministic device selection
    nodes.sort();
    Ok(nodes)
}

/// Find, grab and optionally hide the device matching `selector`
///
/// # Arguments
///
/// * `selector` - Name and physical path to look for
/// * `hide_dir` - Where to move the node, or `None` to leave it visible
///
/// # Returns
///
/// `Ok(None)` when no device matches yet.
///
/// # Errors
///
/// Returns `Device` if `/dev/input` is unreadable or the match cannot be
/// grabbed.
pub fn acquire(selector: &DeviceSelector, hide_dir: Option<&Path>) -> Result<Option<AcquiredDevice>> {
    acquire_from(Path::new(INPUT_DIR), selector, hide_dir)
}

/// [`acquire`] against an explicit input directory
pub fn acquire_from(
    input_dir: &Path,
    selector: &DeviceSelector,
    hide_dir: Option<&Path>,
) -> Result<Option<AcquiredDevice>> {
    for path in event_nodes(input_dir)? {
        let mut device = match Device::open(&path) {
            Ok(device) => device,
            Err(e) => {
                // Permission denied or other errors - skip device
                debug!("Could not open {}: {}", path.display(), e);
                continue;
            }
        };

        if !selector.matches(device.name(), device.physical_path()) {
            continue;
        }

        info!("Found {} at {}", selector, path.display());
        device
            .grab()
            .map_err(|e| HandyconError::Device(format!("Failed to grab {}: {}", path.display(), e)))?;

        let hidden = match hide_dir {
            Some(dir) => match HiddenNode::hide(&path, dir) {
                Ok(hidden) => Some(hidden),
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            },
            None => None,
        };

        let stream = device
            .into_event_stream()
            .map_err(|e| HandyconError::Device(format!("Failed to stream {}: {}", path.display(), e)))?;

        return Ok(Some(AcquiredDevice { stream, path, hidden, released: false }));
    }

    Ok(None)
}

/// Create the hide directory
pub fn prepare_hide_dir(hide_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(hide_dir)?;
    Ok(())
}

/// Move back nodes left hidden by a previous run
///
/// Returns the number of nodes restored.
pub fn restore_stale(hide_dir: &Path, input_dir: &Path) -> Result<usize> {
    let mut restored = 0;
    for hidden in event_nodes(hide_dir)? {
        let Some(name) = hidden.file_name() else {
            continue;
        };
        let node = HiddenNode { original: input_dir.join(name), hidden: hidden.clone() };
        if node.original.exists() {
            debug!("{} already exists, leaving {}", node.original.display(), hidden.display());
            continue;
        }
        match node.restore() {
            Ok(()) => restored += 1,
            Err(e) => warn!("{}", e),
        }
    }

    if restored > 0 {
        info!("Restored {} hidden devices from a previous run", restored);
    }
    Ok(restored)
}
