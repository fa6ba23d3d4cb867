//! # Configuration Module
//!
//! Handles loading, generating and validating the TOML configuration file.
//!
//! ## File Layout
//!
//! ```toml
//! [button_map]
//! button1 = "SCR"
//! button2 = "QAM"
//! # ... button3 through button12
//! power_button = "SUSPEND"
//!
//! [paths]
//! hide_dir = "/dev/input/.hidden"
//!
//! [timing]
//! detect_delay_ms = 500
//! ```
//!
//! A missing file is generated with the default button map. A file written by
//! an older release that lacks newer keys is completed from the defaults and
//! written back instead of failing.

use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::action::{ActionName, PowerAction};
use crate::error::{HandyconError, Result};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/handycon/handycon.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    pub button_map: ButtonMapConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

/// Button bindings. Every key is required so schema drift is detectable.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ButtonMapConfig {
    pub button1: ActionName,
    pub button2: ActionName,
    pub button3: ActionName,
    pub button4: ActionName,
    pub button5: ActionName,
    pub button6: ActionName,
    pub button7: ActionName,
    pub button8: ActionName,
    pub button9: ActionName,
    pub button10: ActionName,
    pub button11: ActionName,
    pub button12: ActionName,
    pub power_button: PowerAction,
}

impl Default for ButtonMapConfig {
    fn default() -> Self {
        Self {
            button1: ActionName::Scr,
            button2: ActionName::Qam,
            button3: ActionName::Esc,
            button4: ActionName::Osk,
            button5: ActionName::Mode,
            button6: ActionName::OpenChimera,
            button7: ActionName::TogglePerformance,
            button8: ActionName::Mode,
            button9: ActionName::ToggleMouse,
            button10: ActionName::AltTab,
            button11: ActionName::Kill,
            button12: ActionName::ToggleGyro,
            power_button: PowerAction::Suspend,
        }
    }
}

/// Filesystem locations
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PathsConfig {
    #[serde(default = "default_hide_dir")]
    pub hide_dir: PathBuf,

    #[serde(default = "default_performance_socket")]
    pub performance_socket: PathBuf,

    #[serde(default = "default_companion_launcher")]
    pub companion_launcher: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            hide_dir: default_hide_dir(),
            performance_socket: default_performance_socket(),
            companion_launcher: default_companion_launcher(),
        }
    }
}

/// Loop timing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_detect_delay_ms")]
    pub detect_delay_ms: u64,

    #[serde(default = "default_ff_delay_ms")]
    pub ff_delay_ms: u64,

    #[serde(default = "default_ipc_poll_ms")]
    pub ipc_poll_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            detect_delay_ms: default_detect_delay_ms(),
            ff_delay_ms: default_ff_delay_ms(),
            ipc_poll_ms: default_ipc_poll_ms(),
        }
    }
}

impl TimingConfig {
    /// Retry interval for device acquisition
    pub fn detect_delay(&self) -> Duration {
        Duration::from_millis(self.detect_delay_ms)
    }

    /// Pause between pulses of a haptic pattern
    pub fn ff_delay(&self) -> Duration {
        Duration::from_millis(self.ff_delay_ms)
    }

    pub fn ipc_poll(&self) -> Duration {
        Duration::from_millis(self.ipc_poll_ms)
    }
}

// Default value functions
fn default_hide_dir() -> PathBuf { PathBuf::from("/dev/input/.hidden") }
fn default_performance_socket() -> PathBuf { PathBuf::from("/tmp/ryzenadj_socket") }
fn default_companion_launcher() -> PathBuf { PathBuf::from("/usr/share/chimera/bin/chimera-web-launcher") }

fn default_detect_delay_ms() -> u64 { 500 }
fn default_ff_delay_ms() -> u64 { 200 }
fn default_ipc_poll_ms() -> u64 { 500 }

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails (including missing `button_map` keys)
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use handycon::config::Config;
    ///
    /// let config = Config::load("/etc/handycon/handycon.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration, creating or completing it as needed
    ///
    /// - Missing file: the defaults are written to `path` and returned.
    /// - Missing keys: filled from the defaults and the file is rewritten.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or written, is not valid TOML,
    /// names an unknown action, or fails validation.
    pub fn load_or_init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Config::default();
            config.save(path)?;
            info!("Created new config: {}", path.display());
            return Ok(config);
        }

        info!("Loading existing config: {}", path.display());
        let contents = fs::read_to_string(path)?;
        let mut table: toml::Table = contents.parse()?;

        let filled = fill_missing(&mut table, &Config::default().to_table()?, "");
        if !filled.is_empty() {
            warn!(
                "Config {} is missing {}; regenerating with defaults",
                path.display(),
                filled.join(", ")
            );
            fs::write(path, toml::to_string_pretty(&table)?)?;
        }

        let config: Config = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Write this configuration to `path`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns error if serialization or any filesystem operation fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    fn to_table(&self) -> Result<toml::Table> {
        match toml::Value::try_from(self)? {
            toml::Value::Table(table) => Ok(table),
            _ => Err(HandyconError::Config(toml::de::Error::custom(
                "configuration did not serialize to a table",
            ))),
        }
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if !self.paths.hide_dir.is_absolute() {
            return Err(HandyconError::Config(
                toml::de::Error::custom("hide_dir must be an absolute path")
            ));
        }

        if self.paths.performance_socket.as_os_str().is_empty() {
            return Err(HandyconError::Config(
                toml::de::Error::custom("performance_socket cannot be empty")
            ));
        }

        if self.paths.companion_launcher.as_os_str().is_empty() {
            return Err(HandyconError::Config(
                toml::de::Error::custom("companion_launcher cannot be empty")
            ));
        }

        if self.timing.detect_delay_ms == 0 || self.timing.detect_delay_ms > 60000 {
            return Err(HandyconError::Config(
                toml::de::Error::custom("detect_delay_ms must be between 1 and 60000")
            ));
        }

        if self.timing.ff_delay_ms > 5000 {
            return Err(HandyconError::Config(
                toml::de::Error::custom("ff_delay_ms must be between 0 and 5000")
            ));
        }

        if self.timing.ipc_poll_ms == 0 || self.timing.ipc_poll_ms > 60000 {
            return Err(HandyconError::Config(
                toml::de::Error::custom("ipc_poll_ms must be between 1 and 60000")
            ));
        }

        Ok(())
    }
}

/// Copy every key of `defaults` missing from `table`, recursing into tables.
/// Returns the dotted names of the keys that were filled.
fn fill_missing(table: &mut toml::Table, defaults: &toml::Table, prefix: &str) -> Vec<String> {
    let mut filled = Vec::new();

    for (key, default) in defaults {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match (table.get_mut(key), default) {
            (None, _) => {
                table.insert(key.clone(), default.clone());
                filled.push(name);
            }
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                filled.extend(fill_missing(existing, nested, &name));
            }
            _ => {}
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const FULL_BUTTON_MAP: &str = r#"
[button_map]
button1 = "SCR"
button2 = "QAM"
button3 = "ESC"
button4 = "OSK"
button5 = "MODE"
button6 = "OPEN_CHIMERA"
button7 = "TOGGLE_PERFORMANCE"
button8 = "MODE"
button9 = "TOGGLE_MOUSE"
button10 = "ALT_TAB"
button11 = "KILL"
button12 = "TOGGLE_GYRO"
power_button = "HIBERNATE"
"#;

    // ==================== Defaults Tests ====================

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.button_map.button1, ActionName::Scr);
        assert_eq!(config.button_map.button5, ActionName::Mode);
        assert_eq!(config.button_map.power_button, PowerAction::Suspend);
        assert_eq!(config.timing.detect_delay_ms, 500);
    }

    // ==================== Load Tests ====================

    #[test]
    fn test_load_full_config() {
        let file = write_config(FULL_BUTTON_MAP);
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.button_map.button10, ActionName::AltTab);
        assert_eq!(config.button_map.power_button, PowerAction::Hibernate);
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn test_load_rejects_unknown_action() {
        let file = write_config(&FULL_BUTTON_MAP.replace("\"KILL\"", "\"SELF_DESTRUCT\""));
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_rejects_missing_key() {
        let file = write_config(&FULL_BUTTON_MAP.replace("power_button = \"HIBERNATE\"", ""));
        assert!(matches!(Config::load(file.path()), Err(HandyconError::Config(_))));
    }

    #[test]
    fn test_timing_durations() {
        let timing = TimingConfig { detect_delay_ms: 500, ff_delay_ms: 200, ipc_poll_ms: 250 };
        assert_eq!(timing.detect_delay(), Duration::from_millis(500));
        assert_eq!(timing.ff_delay(), Duration::from_millis(200));
        assert_eq!(timing.ipc_poll(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_detect_delay() {
        let mut config = Config::default();
        config.timing.detect_delay_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_hide_dir() {
        let mut config = Config::default();
        config.paths.hide_dir = PathBuf::from("relative/.hidden");
        assert!(config.validate().is_err());
    }

    // ==================== First Run and Schema Tests ====================

    #[test]
    fn test_load_or_init_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("handycon").join("handycon.toml");

        let config = Config::load_or_init(&path).unwrap();

        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_load_or_init_fills_missing_power_button() {
        let legacy = r#"
[button_map]
button1 = "QAM"
button2 = "QAM"
button3 = "ESC"
button4 = "OSK"
button5 = "MODE"
"#;
        let file = write_config(legacy);

        let config = Config::load_or_init(file.path()).unwrap();

        // User values survive, new keys come from the defaults
        assert_eq!(config.button_map.button1, ActionName::Qam);
        assert_eq!(config.button_map.button12, ActionName::ToggleGyro);
        assert_eq!(config.button_map.power_button, PowerAction::Suspend);

        // The file on disk now loads strictly
        let reloaded = Config::load(file.path()).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_load_or_init_keeps_complete_file() {
        let file = write_config(FULL_BUTTON_MAP);
        let config = Config::load_or_init(file.path()).unwrap();
        assert_eq!(config.button_map.power_button, PowerAction::Hibernate);
    }

    #[test]
    fn test_fill_missing_reports_dotted_names() {
        let mut table: toml::Table = "[button_map]\nbutton1 = \"SCR\"\n".parse().unwrap();
        let defaults = Config::default().to_table().unwrap();

        let filled = fill_missing(&mut table, &defaults, "");

        assert!(filled.contains(&"button_map.power_button".to_string()));
        assert!(filled.contains(&"paths".to_string()));
        assert!(!filled.contains(&"button_map.button1".to_string()));
    }
}
