//! # Keyboard Loop
//!
//! Grabs and hides one vendor keyboard, feeding its events to the session.
//! A lost keyboard has its held buttons released before the loop goes back
//! to acquisition.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::Session;
use crate::device::{self, AcquiredDevice};
use crate::profile::DeviceSelector;

/// Acquisition and event loop for one keyboard device
#[derive(Debug)]
pub struct KeyboardLoop {
    selector: DeviceSelector,
    hide_dir: PathBuf,
    detect_delay: Duration,
    session: Session,
}

impl KeyboardLoop {
    #[must_use]
    pub fn new(selector: DeviceSelector, hide_dir: PathBuf, detect_delay: Duration, session: Session) -> Self {
        Self { selector, hide_dir, detect_delay, session }
    }

    /// Run until shutdown, re-acquiring the keyboard whenever it is lost
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        while !*shutdown.borrow() {
            match device::acquire(&self.selector, Some(&self.hide_dir)) {
                Ok(Some(mut keyboard)) => {
                    info!("Keyboard connected: {}", keyboard.path().display());
                    let stopped = self.read(&mut keyboard, &mut shutdown).await;
                    self.session.keyboard_lost(self.selector).await;
                    keyboard.release();
                    if stopped {
                        break;
                    }
                }
                Ok(None) => debug!("Attempting to grab keyboard {}...", self.selector),
                Err(e) => warn!("{}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.detect_delay) => {}
                _ = shutdown.changed() => break,
            }
        }
        debug!("Keyboard loop for {} stopped", self.selector);
    }

    /// Feed events until the device fails. True on shutdown.
    async fn read(&self, keyboard: &mut AcquiredDevice, shutdown: &mut watch::Receiver<bool>) -> bool {
        loop {
            tokio::select! {
                event = keyboard.next_event() => {
                    match event {
                        Ok(event) => {
                            let active = keyboard.active_keys();
                            self.session.key_event(self.selector, event, active).await;
                        }
                        Err(e) => {
                            error!("{} | Error reading events from {}", e, self.selector);
                            return false;
                        }
                    }
                }
                _ = shutdown.changed() => return true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::dispatcher::Dispatcher;
    use crate::config::Config;
    use crate::controller::{GamepadHandle, VirtualControllerHandle};
    use crate::profile;
    use crate::system::command::MockCommandRunner;
    use crate::system::performance::PerformanceChannel;
    use crate::system::steam::{SessionUser, SteamClient};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    // ==================== Loop Tests ====================

    #[tokio::test]
    async fn test_missing_keyboard_stops_on_shutdown() {
        let root = TempDir::new().unwrap();
        let profile = profile::identify("AYANEO 2021", "AuthenticAMD").unwrap();
        let (event_tx, _events) = mpsc::unbounded_channel();
        let (ff_tx, _ff) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            profile,
            &Config::default(),
            VirtualControllerHandle::new(event_tx),
            GamepadHandle::new(ff_tx),
            Arc::new(MockCommandRunner::new()),
            SteamClient::with_proc_dir(SessionUser::new("deck"), root.path()),
            PerformanceChannel::new(root.path().join("socket")),
        );
        let keyboard = KeyboardLoop::new(
            DeviceSelector::new("No Such Keyboard", "nowhere/input0"),
            root.path().join(".hidden"),
            Duration::from_secs(60),
            Session::new(profile, Arc::new(dispatcher)),
        );
        let (shutdown_tx, shutdown) = watch::channel(false);

        let task = tokio::spawn(keyboard.run(shutdown));
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
