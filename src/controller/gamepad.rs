//! # Gamepad Loop
//!
//! Owns the real gamepad: forwards its reports to the virtual controller and
//! plays the force feedback games send to the virtual one. While the gamepad
//! is missing, FF requests are still answered so uinput never blocks.

use std::path::PathBuf;
use std::time::Duration;

use evdev::{EventType, InputEvent};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::ff_relay::{FfRequest, ForceFeedbackRelay};
use super::virtual_device::VirtualControllerHandle;
use crate::device::{self, AcquiredDevice};
use crate::error::{HandyconError, Result};
use crate::profile::DeviceSelector;

/// Sending side for haptic cues on the real gamepad
#[derive(Debug, Clone)]
pub struct GamepadHandle {
    tx: mpsc::UnboundedSender<FfRequest>,
}

impl GamepadHandle {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<FfRequest>) -> Self {
        Self { tx }
    }

    /// Play a rumble of `duration` without waiting for it
    ///
    /// # Errors
    ///
    /// Returns `Device` once the gamepad loop has stopped.
    pub fn pulse(&self, duration: Duration) -> Result<()> {
        self.tx
            .send(FfRequest::Pulse(duration))
            .map_err(|_| HandyconError::Device("Gamepad loop is gone".to_string()))
    }
}

/// Gamepad acquisition and forwarding loop
#[derive(Debug)]
pub struct GamepadLoop {
    selector: DeviceSelector,
    hide_dir: PathBuf,
    detect_delay: Duration,
    controller: VirtualControllerHandle,
    requests: mpsc::UnboundedReceiver<FfRequest>,
    relay: ForceFeedbackRelay,
}

enum Exit {
    Lost,
    Shutdown,
}

impl GamepadLoop {
    #[must_use]
    pub fn new(
        selector: DeviceSelector,
        hide_dir: PathBuf,
        detect_delay: Duration,
        controller: VirtualControllerHandle,
        requests: mpsc::UnboundedReceiver<FfRequest>,
    ) -> Self {
        Self { selector, hide_dir, detect_delay, controller, requests, relay: ForceFeedbackRelay::new() }
    }

    /// Run until shutdown, re-acquiring the gamepad whenever it is lost
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        while !*shutdown.borrow() {
            match device::acquire(&self.selector, Some(&self.hide_dir)) {
                Ok(Some(mut pad)) => {
                    info!("Gamepad connected: {}", pad.path().display());
                    let exit = self.forward(&mut pad, &mut shutdown).await;
                    pad.release();
                    self.relay.clear();
                    if matches!(exit, Exit::Shutdown) {
                        break;
                    }
                }
                Ok(None) => debug!("Attempting to grab gamepad {}...", self.selector),
                Err(e) => warn!("{}", e),
            }

            if !self.wait_without_gamepad(&mut shutdown).await {
                break;
            }
        }
        debug!("Gamepad loop stopped");
    }

    /// Answer FF requests until the retry delay passes. False on shutdown.
    async fn wait_without_gamepad(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let retry = tokio::time::sleep(self.detect_delay);
        tokio::pin!(retry);
        loop {
            tokio::select! {
                _ = &mut retry => return true,
                Some(request) = self.requests.recv() => self.relay.handle(request, None),
                _ = shutdown.changed() => return false,
            }
        }
    }

    async fn forward(&mut self, pad: &mut AcquiredDevice, shutdown: &mut watch::Receiver<bool>) -> Exit {
        let mut report: Vec<InputEvent> = Vec::new();
        loop {
            tokio::select! {
                event = pad.next_event() => {
                    let event = match event {
                        Ok(event) => event,
                        Err(e) => {
                            error!("{} | Error reading events from gamepad", e);
                            return Exit::Lost;
                        }
                    };
                    if let Some(batch) = accumulate(&mut report, event) {
                        if let Err(e) = self.controller.emit_batch(batch) {
                            error!("{}", e);
                            return Exit::Shutdown;
                        }
                    }
                }
                Some(request) = self.requests.recv() => self.relay.handle(request, Some(pad.device_mut())),
                _ = shutdown.changed() => return Exit::Shutdown,
            }
        }
    }
}

/// Accumulate `event` into `report`, returning the report at its sync
///
/// The virtual controller adds its own sync after each batch, and FF status
/// from the real pad is not forwarded.
fn accumulate(report: &mut Vec<InputEvent>, event: InputEvent) -> Option<Vec<InputEvent>> {
    match event.event_type() {
        EventType::SYNCHRONIZATION => (!report.is_empty()).then(|| std::mem::take(report)),
        EventType::FORCEFEEDBACK => None,
        _ => {
            report.push(event);
            None
        }
    }
}
