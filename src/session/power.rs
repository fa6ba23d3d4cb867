//! # Power Button Loop
//!
//! Grabs one ACPI power button node (left visible) so a short press goes
//! through the daemon instead of logind.

use std::time::Duration;

use evdev::{EventType, InputEvent, KeyCode};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::Session;
use crate::device;
use crate::profile::DeviceSelector;

/// Acquisition and event loop for one power button node
#[derive(Debug)]
pub struct PowerLoop {
    selector: DeviceSelector,
    detect_delay: Duration,
    session: Session,
}

/// The event completing a power press
fn is_power_release(event: &InputEvent) -> bool {
    event.event_type() == EventType::KEY && event.code() == KeyCode::KEY_POWER.code() && event.value() == 0
}

impl PowerLoop {
    #[must_use]
    pub fn new(selector: DeviceSelector, detect_delay: Duration, session: Session) -> Self {
        Self { selector, detect_delay, session }
    }

    /// Run until shutdown, re-acquiring the node whenever it is lost
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        while !*shutdown.borrow() {
            match device::acquire(&self.selector, None) {
                Ok(Some(mut button)) => {
                    info!("Power button connected: {}", button.path().display());
                    loop {
                        tokio::select! {
                            event = button.next_event() => {
                                match event {
                                    Ok(event) if is_power_release(&event) => self.session.power_released().await,
                                    Ok(_) => {}
                                    Err(e) => {
                                        error!("{} | Error reading events from power device", e);
                                        break;
                                    }
                                }
                            }
                            _ = shutdown.changed() => break,
                        }
                    }
                    button.release();
                }
                Ok(None) => debug!("Attempting to grab power device {}...", self.selector),
                Err(e) => warn!("{}", e),
            }

            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.detect_delay) => {}
                _ = shutdown.changed() => break,
            }
        }
        debug!("Power loop for {} stopped", self.selector);
    }
}
