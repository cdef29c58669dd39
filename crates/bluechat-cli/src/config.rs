//! Configuration for the BlueChat CLI
//!
//! Layered: built-in defaults, then a TOML file, then `BLUECHAT_*` environment
//! variables, then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bluechat_ble::BleRadioConfig;
use bluechat_core::SessionConfig;
use bluechat_runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// File picked up from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "bluechat.toml";

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cli: CliConfig,
    pub session: SessionConfig,
    pub ble: BleRadioConfig,
    pub runtime: RuntimeConfig,
}

/// Terminal behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Enable verbose logging
    pub verbose: bool,
    /// Print role changes as they happen
    pub show_roles: bool,
    /// Print the device list whenever it changes
    pub show_devices: bool,
    /// How long `send` waits after the local echo for a radio write failure
    pub delivery_grace_ms: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            show_roles: true,
            show_devices: true,
            delivery_grace_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Defaults, then `path` (or `bluechat.toml` if present), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load_from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `BLUECHAT_*` overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("BLUECHAT_NAME") {
            self.ble.local_name = name;
        }
        if let Some(value) = lookup("BLUECHAT_VERBOSE") {
            self.cli.verbose = parse_flag("BLUECHAT_VERBOSE", &value)?;
        }
        if let Some(value) = lookup("BLUECHAT_AUTO_CONNECT") {
            self.session.auto_connect = parse_flag("BLUECHAT_AUTO_CONNECT", &value)?;
        }
        if let Some(value) = lookup("BLUECHAT_ADVERTISE_TIMEOUT_SECS") {
            let secs: u64 = value.parse().map_err(|_| {
                CliError::Config(format!(
                    "BLUECHAT_ADVERTISE_TIMEOUT_SECS must be a number of seconds, got {value:?}"
                ))
            })?;
            self.session.advertise_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.session.validate()?;
        self.runtime.validate()?;
        self.ble
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CliError::Config(format!(
            "{key} must be a boolean, got {value:?}"
        ))),
    }
}
