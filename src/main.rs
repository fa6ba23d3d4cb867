//! # Handycon
//!
//! Unify handheld gaming PC buttons into one virtual game controller.
//!
//! # Control Flow
//!
//! 1. **Startup guards**
//!    - Step aside if OpenGamepadUI (which does its own input handling) runs
//!    - Identify the hardware; unknown hardware exits with status 1
//!    - Load or generate the configuration
//!    - Move back device nodes hidden by a previous crash
//!
//! 2. **Session**
//!    - Wait for a user to log in (Steam commands run as that user)
//!    - Start the virtual controller, gamepad, keyboard and power loops
//!
//! 3. **Shutdown**
//!    - SIGHUP, SIGTERM, SIGINT or SIGQUIT stops every loop
//!    - Devices are ungrabbed and their nodes restored
//!    - Exit status 0, or 1 after an interactive interrupt; 2 on error
//!
//! # Examples
//!
//! ```bash
//! handycon --config /etc/handycon/handycon.toml --log-level debug
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use handycon::config::{Config, DEFAULT_CONFIG_PATH};
use handycon::device::{self, INPUT_DIR};
use handycon::error::HandyconError;
use handycon::profile;
use handycon::session::Daemon;
use handycon::system::command::{CommandRunner, SystemCommandRunner};
use handycon::system::identity::SystemIdentity;
use handycon::system::performance::{enable_turbo_takeover, TURBO_TAKEOVER_PATH};
use handycon::system::steam::discover_user;
use handycon::system::{process_running, PROC_DIR};

/// Interval between `who` polls while nobody is logged in
const USER_RETRY: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(name = "handycon", version, about)]
struct Cli {
    /// Configuration file, generated with defaults if missing
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

/// How the daemon ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Stopped,
    Interrupted,
    Unsupported,
}

impl Outcome {
    fn status(self) -> u8 {
        match self {
            Outcome::Stopped => 0,
            Outcome::Interrupted | Outcome::Unsupported => 1,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(EnvFilter::from_default_env().add_directive(cli.log_level.into()))
        .init();

    info!("Handycon v{} starting...", env!("CARGO_PKG_VERSION"));

    match run(&cli).await {
        Ok(outcome) => ExitCode::from(outcome.status()),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: &Cli) -> Result<Outcome> {
    if process_running(Path::new(PROC_DIR), "opengamepadui") {
        warn!("OpenGamepadUI is running and handles this device, exiting");
        return Ok(Outcome::Stopped);
    }

    let identity = SystemIdentity::read().context("Failed to identify the system")?;
    let profile = match profile::identify(&identity.product_name, &identity.cpu_vendor) {
        Ok(profile) => profile,
        Err(e @ HandyconError::UnsupportedDevice { .. }) => {
            error!("{}", e);
            error!("Please capture the device's input events with the handycon capture tool and report them");
            return Ok(Outcome::Unsupported);
        }
        Err(e) => return Err(e.into()),
    };

    let config = Config::load_or_init(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    let hide_dir = &config.paths.hide_dir;
    device::prepare_hide_dir(hide_dir).with_context(|| format!("Failed to create {}", hide_dir.display()))?;
    match device::restore_stale(hide_dir, Path::new(INPUT_DIR)) {
        Ok(0) => {}
        Ok(restored) => info!("Restored {} device nodes hidden by a previous run", restored),
        Err(e) => warn!("{} | Could not restore hidden devices", e),
    }

    let (shutdown_tx, mut shutdown) = watch::channel(false);
    let signals = tokio::spawn(async move {
        let outcome = match wait_for_signal().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{} | Signal handling failed", e);
                Outcome::Stopped
            }
        };
        let _ = shutdown_tx.send(true);
        outcome
    });

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);
    let Some(user) = discover_user(runner.as_ref(), USER_RETRY, &mut shutdown).await else {
        return Ok(signals.await?);
    };

    if profile.turbo_takeover {
        enable_turbo_takeover(Path::new(TURBO_TAKEOVER_PATH)).await;
    }

    let daemon = Daemon { profile, config, runner, user };
    daemon.run(shutdown).await?;

    let outcome = signals.await?;
    info!("Handycon stopped");
    Ok(outcome)
}

/// Wait for the first termination signal
async fn wait_for_signal() -> std::io::Result<Outcome> {
    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut quit = signal(SignalKind::quit())?;

    let outcome = tokio::select! {
        _ = hangup.recv() => {
            info!("Received SIGHUP, shutting down...");
            Outcome::Stopped
        }
        _ = terminate.recv() => {
            info!("Received SIGTERM, shutting down...");
            Outcome::Stopped
        }
        _ = interrupt.recv() => {
            info!("Interrupted, shutting down...");
            Outcome::Interrupted
        }
        _ = quit.recv() => {
            info!("Received SIGQUIT, shutting down...");
            Outcome::Stopped
        }
    };
    Ok(outcome)
}
