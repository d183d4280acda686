use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;

use crate::wireless::DEFAULT_BLUEUTIL_PATH;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub wireless: WirelessConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Layout of daemon log lines, on the console and in the log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MonitorConfig {
    /// Read the new device's running state after every (re)bind instead of
    /// assuming it is idle. A device that is already playing then does not
    /// trigger a switch until it goes quiet and starts again.
    #[serde(default)]
    pub seed_running_state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirelessConfig {
    #[serde(default = "default_blueutil_path")]
    pub blueutil_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub show_switch_results: bool, // Successful and partial switches
    #[serde(default = "default_true")]
    pub show_failures: bool, // Both steps failed
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_blueutil_path() -> PathBuf {
    PathBuf::from(DEFAULT_BLUEUTIL_PATH)
}

fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Default for WirelessConfig {
    fn default() -> Self {
        Self {
            blueutil_path: default_blueutil_path(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            show_switch_results: true,
            show_failures: true,
        }
    }
}

impl GeneralConfig {
    pub fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => bail!("Invalid log level: {}", other),
        }
    }
}

impl Config {
    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        self.general.level()?;
        if self.wireless.blueutil_path.as_os_str().is_empty() {
            bail!("wireless.blueutil_path must not be empty");
        }
        Ok(())
    }
}
