//! # Session User and Steam Handoff
//!
//! Power presses go to Steam when it runs in Game Mode, so its own power
//! menu and suspend handling stay in charge. Game Mode is recognised by the
//! `-gamepadui` flag on the Steam process found through `~/.steam/steam.pid`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use super::command::{su_args, CommandRunner};

/// Steam URL for a short power press
pub const SHORT_POWER_PRESS: &str = "steam://shortpowerpress";

/// Steam URL opening the power menu
pub const LONG_POWER_PRESS: &str = "steam://longpowerpress";

const GAMEPADUI_FLAG: &[u8] = b"-gamepadui";

/// The logged-in user side effects run as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub name: String,
    pub home: PathBuf,
}

impl SessionUser {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let home = PathBuf::from("/home").join(&name);
        Self { name, home }
    }
}

/// First user name, in sorted order, from `who` output
#[must_use]
pub fn parse_who(output: &str) -> Option<String> {
    let mut users: Vec<&str> = output.lines().filter_map(|line| line.split_whitespace().next()).collect();
    users.sort_unstable();
    users.first().map(|user| (*user).to_string())
}

/// Wait for a user to log in.
///
/// Polls `who` every `retry` until it names someone. Returns `None` if
/// shutdown is requested first.
pub async fn discover_user(
    runner: &dyn CommandRunner,
    retry: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<SessionUser> {
    loop {
        match runner.output("who", &[]).await {
            Ok(output) => {
                if let Some(name) = parse_who(&output) {
                    info!("Session user: {}", name);
                    return Some(SessionUser::new(name));
                }
                debug!("No user logged in yet");
            }
            Err(e) => error!("{} | Error getting user", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(retry) => {}
            _ = shutdown.changed() => return None,
        }
    }
}

/// Sends `-ifrunning` commands to the session user's Steam client
#[derive(Debug, Clone)]
pub struct SteamClient {
    user: SessionUser,
    proc_dir: PathBuf,
}

impl SteamClient {
    #[must_use]
    pub fn new(user: SessionUser) -> Self {
        Self::with_proc_dir(user, super::PROC_DIR)
    }

    #[must_use]
    pub fn with_proc_dir(user: SessionUser, proc_dir: impl Into<PathBuf>) -> Self {
        Self { user, proc_dir: proc_dir.into() }
    }

    #[must_use]
    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    fn pid_path(&self) -> PathBuf {
        self.user.home.join(".steam/steam.pid")
    }

    fn steam_binary(&self) -> PathBuf {
        self.user.home.join(".steam/root/ubuntu12_32/steam")
    }

    /// Whether Steam is running in Game Mode
    #[must_use]
    pub fn is_gamepadui(&self) -> bool {
        let pid = match std::fs::read_to_string(self.pid_path()) {
            Ok(pid) => pid.trim().to_string(),
            Err(e) => {
                debug!("{} | Could not read the Steam PID", e);
                return false;
            }
        };

        let cmdline_path = self.proc_dir.join(&pid).join("cmdline");
        match std::fs::read(&cmdline_path) {
            Ok(cmdline) => contains(&cmdline, GAMEPADUI_FLAG),
            Err(e) => {
                debug!("{} | Steam is not running ({})", e, cmdline_path.display());
                false
            }
        }
    }

    /// Forward `url` to Steam if it runs in Game Mode
    ///
    /// Returns true when Steam accepted the command. False means the caller
    /// should fall back to its own handling.
    pub async fn send_if_gamepadui(&self, runner: &dyn CommandRunner, url: &str) -> bool {
        if !self.is_gamepadui() {
            return false;
        }

        let command = format!("{} -ifrunning {}", self.steam_binary().display(), url);
        match runner.run("su", &su_args(&self.user.name, &command)).await {
            Ok(accepted) => {
                debug!("Steam {} {}", url, if accepted { "accepted" } else { "refused" });
                accepted
            }
            Err(e) => {
                error!("{} | Error sending command to Steam", e);
                false
            }
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Launch `launcher` as `user` if it is installed
///
/// The launcher stays open for as long as the user keeps it, so it runs on
/// its own task.
pub fn launch_as_user(runner: std::sync::Arc<dyn CommandRunner>, user: &SessionUser, launcher: &Path) {
    if !launcher.is_file() {
        debug!("{} is not installed", launcher.display());
        return;
    }

    let args = su_args(&user.name, &launcher.display().to_string());
    tokio::spawn(async move {
        if let Err(e) = runner.run("su", &args).await {
            error!("{} | Error launching companion", e);
        }
    });
}
