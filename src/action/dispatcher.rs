//! # Action Dispatcher
//!
//! Executes recognizer commands: key actions become events on the virtual
//! controller, effect actions run their side effect once per press.
//!
//! Keyboard and power loops share one dispatcher. The toggles it owns sit
//! behind a mutex that is only held for the flip itself, never across an
//! await.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use evdev::{EventType, InputEvent};
use tracing::{debug, error, info, warn};

use super::{ButtonAction, ButtonMap, EffectKind, LogicalButton, Polarity, PowerAction};
use crate::chord::definition::HapticCue;
use crate::chord::Command;
use crate::config::Config;
use crate::controller::{GamepadHandle, VirtualControllerHandle};
use crate::profile::HardwareProfile;
use crate::system::command::CommandRunner;
use crate::system::gyro::{GyroProbe, DEV_DIR};
use crate::system::performance::{self, PerformanceChannel, PerformanceMode, THERMAL_POLICY_PATH};
use crate::system::steam::{self, SteamClient, LONG_POWER_PRESS, SHORT_POWER_PRESS};

const GYRO_ON: &[HapticCue] = &[HapticCue::millis(250)];
const GYRO_OFF: &[HapticCue] = &[HapticCue::millis(100), HapticCue::millis(100)];

/// Runtime switches flipped by effect buttons
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Toggles {
    pub performance: PerformanceMode,
    pub gyro_enabled: bool,
    pub mouse_mode: bool,
}

/// Resolves logical buttons to events and side effects
pub struct Dispatcher {
    buttons: ButtonMap,
    power_action: PowerAction,
    button_delay: Duration,
    ff_delay: Duration,
    /// Written along with each performance mode change when set
    thermal_policy: Option<PathBuf>,
    gyro: GyroProbe,
    controller: VirtualControllerHandle,
    gamepad: GamepadHandle,
    runner: Arc<dyn CommandRunner>,
    steam: SteamClient,
    performance: PerformanceChannel,
    companion_launcher: PathBuf,
    toggles: Mutex<Toggles>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("power_action", &self.power_action)
            .field("button_delay", &self.button_delay)
            .field("thermal_policy", &self.thermal_policy)
            .field("toggles", &self.toggles())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        profile: &HardwareProfile,
        config: &Config,
        controller: VirtualControllerHandle,
        gamepad: GamepadHandle,
        runner: Arc<dyn CommandRunner>,
        steam: SteamClient,
        performance: PerformanceChannel,
    ) -> Self {
        Self {
            buttons: ButtonMap::from_config(&config.button_map),
            power_action: config.button_map.power_button,
            button_delay: profile.button_delay,
            ff_delay: config.timing.ff_delay(),
            thermal_policy: profile.thermal_policy.then(|| PathBuf::from(THERMAL_POLICY_PATH)),
            gyro: GyroProbe::new(Path::new(DEV_DIR), profile.gyro),
            controller,
            gamepad,
            runner,
            steam,
            performance,
            companion_launcher: config.paths.companion_launcher.clone(),
            toggles: Mutex::new(Toggles::default()),
        }
    }

    /// Replace the gyro probe, e.g. to look for the bus node elsewhere
    #[must_use]
    pub fn with_gyro(mut self, gyro: GyroProbe) -> Self {
        self.gyro = gyro;
        self
    }

    /// Gyro presence shared with the chord gate and the poll task
    #[must_use]
    pub fn gyro(&self) -> &GyroProbe {
        &self.gyro
    }

    /// Whether the companion launcher is on disk
    #[must_use]
    pub fn companion_installed(&self) -> bool {
        self.companion_launcher.is_file()
    }

    /// Snapshot of the current toggles
    #[must_use]
    pub fn toggles(&self) -> Toggles {
        *self.toggles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_toggles<R>(&self, f: impl FnOnce(&mut Toggles) -> R) -> R {
        f(&mut self.toggles.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run recognizer commands in order
    pub async fn execute(&self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Dispatch { button, polarity } => self.dispatch(button, polarity).await,
                Command::Haptic(cue) => self.haptic(cue).await,
                Command::Forward(event) => {
                    if let Err(e) = self.controller.emit(event) {
                        error!("{} | Error forwarding event", e);
                    }
                }
            }
        }
    }

    /// Perform the action bound to `button`
    pub async fn dispatch(&self, button: LogicalButton, polarity: Polarity) {
        let Some(action) = self.buttons.get(button) else {
            warn!("No action bound to {}", button);
            return;
        };
        debug!("Dispatch {} {:?}", button, polarity);

        match action {
            ButtonAction::Keys(codes) => self.emit_keys(codes, polarity).await,
            ButtonAction::Effect(effect) if polarity == Polarity::Press => self.run_effect(*effect).await,
            ButtonAction::Effect(_) => {}
        }
    }

    async fn emit_keys(&self, codes: &[(EventType, u16)], polarity: Polarity) {
        let mut events: Vec<InputEvent> = codes
            .iter()
            .map(|(kind, code)| InputEvent::new(kind.0, *code, polarity.value()))
            .collect();
        if polarity == Polarity::Release {
            events.reverse();
        }

        let last = events.len().saturating_sub(1);
        for (index, event) in events.into_iter().enumerate() {
            if let Err(e) = self.controller.emit(event) {
                error!("{} | Error emitting key", e);
                return;
            }
            if index < last {
                tokio::time::sleep(self.button_delay).await;
            }
        }
    }

    async fn run_effect(&self, effect: EffectKind) {
        match effect {
            EffectKind::TogglePerformance => self.toggle_performance().await,
            EffectKind::OpenCompanion => {
                steam::launch_as_user(Arc::clone(&self.runner), self.steam.user(), &self.companion_launcher);
            }
            EffectKind::ToggleGyro => self.toggle_gyro().await,
            EffectKind::ToggleMouse => {
                let enabled = self.update_toggles(|toggles| {
                    toggles.mouse_mode = !toggles.mouse_mode;
                    toggles.mouse_mode
                });
                info!("Mouse mode {}", if enabled { "enabled" } else { "disabled" });
            }
            EffectKind::Power(action) => self.short_power_press(action).await,
        }
    }

    async fn toggle_performance(&self) {
        if !self.performance.is_available() {
            info!("Performance helper not available, ignoring toggle");
            return;
        }

        let mode = self.update_toggles(|toggles| {
            toggles.performance = toggles.performance.toggled();
            toggles.performance
        });
        info!("Performance mode: {}", mode.flag());

        self.play_pattern(mode.announcement()).await;

        if let Err(e) = self.performance.send(mode).await {
            error!("{} | Error setting performance mode", e);
        }

        if let Some(path) = &self.thermal_policy {
            if let Err(e) = performance::write_sysfs(path, mode.thermal_policy()).await {
                error!("{} | Error setting thermal policy", e);
            }
        }
    }

    async fn toggle_gyro(&self) {
        if !self.gyro.is_available() {
            info!("No gyro available, ignoring toggle");
            return;
        }

        let enabled = self.update_toggles(|toggles| {
            toggles.gyro_enabled = !toggles.gyro_enabled;
            toggles.gyro_enabled
        });
        info!("Gyro {}", if enabled { "enabled" } else { "disabled" });
        self.play_pattern(if enabled { GYRO_ON } else { GYRO_OFF }).await;
    }

    /// Play a rumble pulse on the real gamepad and wait for it to finish
    pub async fn haptic(&self, cue: HapticCue) {
        if let Err(e) = self.gamepad.pulse(cue.duration) {
            warn!("{} | Haptic cue dropped", e);
        }
        tokio::time::sleep(cue.duration).await;
    }

    async fn play_pattern(&self, cues: &[HapticCue]) {
        for (index, cue) in cues.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.ff_delay).await;
            }
            self.haptic(*cue).await;
        }
    }

    async fn short_power_press(&self, action: PowerAction) {
        if self.steam.send_if_gamepadui(self.runner.as_ref(), SHORT_POWER_PRESS).await {
            return;
        }
        self.run_power_action(action).await;
    }

    /// Open the Steam power menu, or run the configured power action
    /// outside Game Mode
    pub async fn long_power_press(&self) {
        if self.steam.send_if_gamepadui(self.runner.as_ref(), LONG_POWER_PRESS).await {
            return;
        }
        self.run_power_action(self.power_action).await;
    }

    async fn run_power_action(&self, action: PowerAction) {
        let verb = action.systemctl_verb();
        info!("Power button action: systemctl {}", verb);
        match self.runner.run("systemctl", &[verb.to_string()]).await {
            Ok(true) => {}
            Ok(false) => warn!("systemctl {} failed", verb),
            Err(e) => error!("{} | Error running power action", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::FfRequest;
    use crate::profile;
    use crate::system::command::MockCommandRunner;
    use crate::system::steam::SessionUser;
    use evdev::KeyCode;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::UnixListener;
    use tokio::sync::mpsc;

    struct Fixture {
        dispatcher: Dispatcher,
        events: mpsc::UnboundedReceiver<Vec<InputEvent>>,
        ff: mpsc::UnboundedReceiver<FfRequest>,
        root: TempDir,
    }

    fn fixture(product_name: &str, runner: MockCommandRunner) -> Fixture {
        let root = TempDir::new().unwrap();
        let profile = profile::identify(product_name, "AuthenticAMD").unwrap();

        let mut config = Config::default();
        config.timing.ff_delay_ms = 1;
        config.paths.performance_socket = root.path().join("ryzenadj_socket");
        config.paths.companion_launcher = root.path().join("launcher");

        let (event_tx, events) = mpsc::unbounded_channel();
        let (ff_tx, ff) = mpsc::unbounded_channel();
        let user = SessionUser { name: "deck".to_string(), home: root.path().join("home") };

        let mut dispatcher = Dispatcher::new(
            profile,
            &config,
            VirtualControllerHandle::new(event_tx),
            GamepadHandle::new(ff_tx),
            Arc::new(runner),
            SteamClient::with_proc_dir(user, root.path().join("proc")),
            PerformanceChannel::new(config.paths.performance_socket.clone()),
        );
        dispatcher.button_delay = Duration::from_millis(1);
        dispatcher.gyro = GyroProbe::new(root.path(), profile.gyro);
        if dispatcher.thermal_policy.is_some() {
            dispatcher.thermal_policy = Some(root.path().join("throttle_thermal_policy"));
        }

        Fixture { dispatcher, events, ff, root }
    }

    fn emitted(rx: &mut mpsc::UnboundedReceiver<Vec<InputEvent>>) -> Vec<(u16, i32)> {
        let mut out = Vec::new();
        while let Ok(batch) = rx.try_recv() {
            out.extend(batch.iter().map(|event| (event.code(), event.value())));
        }
        out
    }

    fn pulses(rx: &mut mpsc::UnboundedReceiver<FfRequest>) -> Vec<Duration> {
        let mut out = Vec::new();
        while let Ok(request) = rx.try_recv() {
            if let FfRequest::Pulse(duration) = request {
                out.push(duration);
            }
        }
        out
    }

    // ==================== Key Action Tests ====================

    #[tokio::test]
    async fn test_press_emits_in_order() {
        let mut fx = fixture("AYANEO 2021", MockCommandRunner::new());

        fx.dispatcher.dispatch(LogicalButton::Button2, Polarity::Press).await;

        assert_eq!(
            emitted(&mut fx.events),
            vec![(KeyCode::BTN_MODE.code(), 1), (KeyCode::BTN_SOUTH.code(), 1)]
        );
    }

    #[tokio::test]
    async fn test_release_emits_in_reverse() {
        let mut fx = fixture("AYANEO 2021", MockCommandRunner::new());

        fx.dispatcher.dispatch(LogicalButton::Button11, Polarity::Release).await;

        assert_eq!(
            emitted(&mut fx.events),
            vec![
                (KeyCode::KEY_ESC.code(), 0),
                (KeyCode::KEY_LEFTMETA.code(), 0),
                (KeyCode::KEY_LEFTCTRL.code(), 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_each_key_is_its_own_report() {
        let mut fx = fixture("AYANEO 2021", MockCommandRunner::new());

        fx.dispatcher.dispatch(LogicalButton::Button10, Polarity::Hold).await;

        let first = fx.events.try_recv().unwrap();
        let second = fx.events.try_recv().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].value(), 2);
    }

    #[tokio::test]
    async fn test_forward_emits_unchanged() {
        let mut fx = fixture("AYANEO 2021", MockCommandRunner::new());
        let event = InputEvent::new(EventType::KEY.0, KeyCode::KEY_VOLUMEUP.code(), 1);

        fx.dispatcher.execute(vec![Command::Forward(event)]).await;

        assert_eq!(emitted(&mut fx.events), vec![(KeyCode::KEY_VOLUMEUP.code(), 1)]);
    }

    // ==================== Effect Tests ====================

    #[tokio::test]
    async fn test_effects_ignore_release() {
        // No expectations: running systemctl would panic the mock
        let mut fx = fixture("AYANEO 2021", MockCommandRunner::new());

        fx.dispatcher.dispatch(LogicalButton::Power, Polarity::Release).await;
        fx.dispatcher.dispatch(LogicalButton::Button9, Polarity::Release).await;

        assert_eq!(fx.dispatcher.toggles(), Toggles::default());
        assert!(emitted(&mut fx.events).is_empty());
    }

    #[tokio::test]
    async fn test_power_falls_back_to_systemctl() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|program, args| program == "systemctl" && args.len() == 1 && args[0] == "suspend")
            .times(1)
            .returning(|_, _| Ok(true));
        let fx = fixture("AYANEO 2021", runner);

        fx.dispatcher.dispatch(LogicalButton::Power, Polarity::Press).await;
    }

    #[tokio::test]
    async fn test_long_press_uses_configured_action() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|program, args| program == "systemctl" && args.len() == 1 && args[0] == "suspend")
            .times(1)
            .returning(|_, _| Ok(false));
        let fx = fixture("AYANEO 2021", runner);

        fx.dispatcher.long_power_press().await;
    }

    #[tokio::test]
    async fn test_toggle_mouse() {
        let fx = fixture("AYANEO 2021", MockCommandRunner::new());

        fx.dispatcher.dispatch(LogicalButton::Button9, Polarity::Press).await;
        assert!(fx.dispatcher.toggles().mouse_mode);

        fx.dispatcher.dispatch(LogicalButton::Button9, Polarity::Press).await;
        assert!(!fx.dispatcher.toggles().mouse_mode);
    }

    #[tokio::test]
    async fn test_gyro_toggle_without_gyro_is_noop() {
        let mut fx = fixture("AYANEO 2021", MockCommandRunner::new());

        fx.dispatcher.dispatch(LogicalButton::Button12, Polarity::Press).await;

        assert!(!fx.dispatcher.toggles().gyro_enabled);
        assert!(pulses(&mut fx.ff).is_empty());
    }

    #[tokio::test]
    async fn test_gyro_toggle_with_missing_bus_node_is_noop() {
        let mut fx = fixture("AIR Pro", MockCommandRunner::new());
        assert!(!fx.dispatcher.gyro().refresh());

        fx.dispatcher.dispatch(LogicalButton::Button12, Polarity::Press).await;

        assert!(!fx.dispatcher.toggles().gyro_enabled);
        assert!(pulses(&mut fx.ff).is_empty());
    }

    #[tokio::test]
    async fn test_gyro_toggle_cues() {
        let mut fx = fixture("AIR Pro", MockCommandRunner::new());
        std::fs::write(fx.root.path().join("i2c-1"), b"").unwrap();
        assert!(fx.dispatcher.gyro().refresh());

        fx.dispatcher.dispatch(LogicalButton::Button12, Polarity::Press).await;
        assert!(fx.dispatcher.toggles().gyro_enabled);
        assert_eq!(pulses(&mut fx.ff), vec![Duration::from_millis(250)]);

        fx.dispatcher.dispatch(LogicalButton::Button12, Polarity::Press).await;
        assert!(!fx.dispatcher.toggles().gyro_enabled);
        assert_eq!(pulses(&mut fx.ff), vec![Duration::from_millis(100), Duration::from_millis(100)]);
    }

    #[tokio::test]
    async fn test_performance_toggle_without_helper_is_noop() {
        let mut fx = fixture("AYANEO 2021", MockCommandRunner::new());

        fx.dispatcher.dispatch(LogicalButton::Button7, Polarity::Press).await;

        assert_eq!(fx.dispatcher.toggles().performance, PerformanceMode::PowerSaving);
        assert!(pulses(&mut fx.ff).is_empty());
    }

    #[tokio::test]
    async fn test_performance_toggle_sends_mode_and_thermal_policy() {
        let mut fx = fixture("ROG Ally RC71L", MockCommandRunner::new());
        let socket = fx.root.path().join("ryzenadj_socket");
        let listener = UnixListener::bind(&socket).unwrap();
        assert!(fx.dispatcher.performance.refresh());

        fx.dispatcher.dispatch(LogicalButton::Button7, Polarity::Press).await;

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut payload = String::new();
        stream.read_to_string(&mut payload).await.unwrap();
        assert_eq!(payload, "--max-performance");

        assert_eq!(fx.dispatcher.toggles().performance, PerformanceMode::MaxPerformance);
        assert_eq!(
            pulses(&mut fx.ff),
            vec![Duration::from_millis(500), Duration::from_millis(75), Duration::from_millis(75)]
        );

        let policy = std::fs::read_to_string(fx.root.path().join("throttle_thermal_policy")).unwrap();
        assert_eq!(policy, "1");
    }

    #[tokio::test]
    async fn test_companion_not_installed_is_ignored() {
        let fx = fixture("AYANEO 2021", MockCommandRunner::new());
        fx.dispatcher.dispatch(LogicalButton::Button6, Polarity::Press).await;
    }

    // ==================== Haptic Tests ====================

    #[tokio::test]
    async fn test_haptic_command_pulses_gamepad() {
        let mut fx = fixture("AYANEO 2021", MockCommandRunner::new());

        fx.dispatcher.execute(vec![Command::Haptic(HapticCue::millis(5))]).await;

        assert_eq!(pulses(&mut fx.ff), vec![Duration::from_millis(5)]);
    }
}
