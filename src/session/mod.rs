//! # Session Module
//!
//! Shared chord state and the loops that feed it.
//!
//! This module handles:
//! - The [`SessionState`] every keyboard and power loop reads and writes
//! - Running one event through the recognizer under the session lock
//! - Starting every device loop and waiting for them at shutdown ([`Daemon`])
//!
//! The state lock is taken for the synchronous recognizer step only. A
//! second, async lock is held from that step until its commands have run, so
//! batches from different loops never interleave on the virtual controller.

pub mod keyboard;
pub mod power;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use evdev::InputEvent;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::action::dispatcher::Dispatcher;
use crate::action::{LogicalButton, Polarity};
use crate::chord::codes::KEY_LEFTMETA;
use crate::chord::{ChordRecognizer, ChordState};
use crate::config::Config;
use crate::controller::{virtual_device, GamepadHandle, GamepadLoop, VirtualControllerHandle};
use crate::error::Result;
use crate::profile::{DeviceSelector, HardwareProfile, POWER_BUTTONS};
use crate::system::command::CommandRunner;
use crate::system::performance::PerformanceChannel;
use crate::system::steam::{SessionUser, SteamClient};

use keyboard::KeyboardLoop;
use power::PowerLoop;

/// State shared by the keyboard and power loops
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub chords: ChordState,
    /// Keys held on the keyboard that sent the last event
    pub keyboard_active: Vec<u16>,
    /// Keyboard that sent the last event
    active_source: Option<DeviceSelector>,
    /// Keyboard each in-flight button came from
    owners: Vec<(LogicalButton, DeviceSelector)>,
}

impl SessionState {
    /// Credit buttons that just went in flight to `source`, forget finished ones
    fn track(&mut self, source: DeviceSelector) {
        let in_flight = self.chords.in_flight();
        self.owners.retain(|(button, _)| in_flight.contains(button));
        for button in in_flight {
            if !self.owners.iter().any(|(owned, _)| *owned == button) {
                self.owners.push((button, source));
            }
        }
    }

    /// Buttons `source` put in flight
    #[must_use]
    pub fn owned_by(&self, source: DeviceSelector) -> Vec<LogicalButton> {
        self.owners.iter().filter(|(_, owner)| *owner == source).map(|(button, _)| *button).collect()
    }
}

pub type SharedSession = Arc<Mutex<SessionState>>;

/// Recognizer, shared state and dispatcher for one running daemon
#[derive(Debug, Clone)]
pub struct Session {
    state: SharedSession,
    recognizer: ChordRecognizer,
    dispatcher: Arc<Dispatcher>,
    executing: Arc<tokio::sync::Mutex<()>>,
}

impl Session {
    #[must_use]
    pub fn new(profile: &'static HardwareProfile, dispatcher: Arc<Dispatcher>) -> Self {
        let state = SessionState { chords: ChordState::new(dispatcher.gyro().is_available()), ..Default::default() };
        Self {
            state: Arc::new(Mutex::new(state)),
            recognizer: ChordRecognizer::new(&profile.chords),
            dispatcher,
            executing: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Lock the shared state. A poisoned lock is recovered, not propagated.
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one event from `source` through the recognizer, then execute the result
    ///
    /// `active` is the keyboard's held key set after `event`, ascending.
    pub async fn key_event(&self, source: DeviceSelector, event: InputEvent, active: Vec<u16>) {
        let _executing = self.executing.lock().await;
        let commands = {
            let mut guard = self.lock();
            let state = &mut *guard;
            state.keyboard_active = active;
            state.active_source = Some(source);
            state.chords.gyro_available = self.dispatcher.gyro().is_available();
            state.chords.companion_installed = self.dispatcher.companion_installed();
            let commands = self.recognizer.process(&mut state.chords, &event, &state.keyboard_active);
            state.track(source);
            commands
        };
        self.dispatcher.execute(commands).await;
    }

    /// Release whatever the lost keyboard left held
    ///
    /// Buttons put in flight by another keyboard stay as they are.
    pub async fn keyboard_lost(&self, source: DeviceSelector) {
        let _executing = self.executing.lock().await;
        let commands = {
            let mut state = self.lock();
            if state.active_source == Some(source) {
                state.keyboard_active.clear();
                state.active_source = None;
            }
            let owned = state.owned_by(source);
            let commands = state.chords.drain(&owned);
            state.owners.retain(|(_, owner)| *owner != source);
            commands
        };
        if !commands.is_empty() {
            debug!("Releasing {} held buttons from {}", commands.len(), source);
        }
        self.dispatcher.execute(commands).await;
    }

    /// Power key released
    ///
    /// With only the meta key held this is a long press (power menu), otherwise
    /// the `power_button` action. Either way a suspend sequence is now pending.
    pub async fn power_released(&self) {
        let _executing = self.executing.lock().await;
        let meta_only = {
            let mut state = self.lock();
            state.chords.suspend_pending = true;
            state.keyboard_active == [KEY_LEFTMETA]
        };

        if meta_only {
            info!("Meta + power: opening the power menu");
            self.dispatcher.long_power_press().await;
        } else {
            self.dispatcher.dispatch(LogicalButton::Power, Polarity::Press).await;
        }
    }
}

/// Everything the device loops need, gathered at startup
pub struct Daemon {
    pub profile: &'static HardwareProfile,
    pub config: Config,
    pub runner: Arc<dyn CommandRunner>,
    pub user: SessionUser,
}

impl Daemon {
    /// Create the virtual controller, start every loop and wait for them
    ///
    /// # Errors
    ///
    /// Returns `VirtualDevice` if the virtual controller cannot be created.
    /// Failures inside a loop are logged and retried by that loop.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let device = virtual_device::build()?;
        let timing = &self.config.timing;
        let hide_dir: PathBuf = self.config.paths.hide_dir.clone();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (ff_tx, ff_rx) = mpsc::unbounded_channel();
        let controller = VirtualControllerHandle::new(event_tx);
        let gamepad = GamepadHandle::new(ff_tx.clone());

        let performance = PerformanceChannel::new(self.config.paths.performance_socket.clone());
        performance.refresh();

        let dispatcher = Arc::new(Dispatcher::new(
            self.profile,
            &self.config,
            controller.clone(),
            gamepad,
            Arc::clone(&self.runner),
            SteamClient::new(self.user.clone()),
            performance.clone(),
        ));
        let gyro = dispatcher.gyro().clone();
        let session = Session::new(self.profile, dispatcher);

        let mut tasks = JoinSet::new();

        let rx = shutdown.clone();
        tasks.spawn(async move {
            if let Err(e) = virtual_device::run(device, event_rx, ff_tx, rx).await {
                error!("{}", e);
            }
        });

        let gamepad_loop = GamepadLoop::new(
            self.profile.gamepad,
            hide_dir.clone(),
            timing.detect_delay(),
            controller,
            ff_rx,
        );
        tasks.spawn(gamepad_loop.run(shutdown.clone()));

        let keyboards = std::iter::once(self.profile.keyboard).chain(self.profile.keyboard_2);
        for selector in keyboards {
            let keyboard = KeyboardLoop::new(selector, hide_dir.clone(), timing.detect_delay(), session.clone());
            tasks.spawn(keyboard.run(shutdown.clone()));
        }

        for selector in POWER_BUTTONS {
            let power = PowerLoop::new(selector, timing.detect_delay(), session.clone());
            tasks.spawn(power.run(shutdown.clone()));
        }

        tasks.spawn(performance.poll(timing.ipc_poll(), shutdown.clone()));
        tasks.spawn(gyro.poll(timing.detect_delay(), shutdown.clone()));

        info!("Handheld controller running on {}", self.profile.system);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("{} | Loop task failed", e);
            }
        }

        info!("All loops stopped");
        Ok(())
    }
}
