//! Configuration file handling.
//!
//! Configuration is stored in TOML format at `~/.config/qrgo/config.toml`
//! (or the platform equivalent). Every key is optional.
//!
//! # Example Configuration
//!
//! ```toml
//! data_dir = "/home/me/.qrgo"
//!
//! [defaults]
//! shape = "rounded"
//! fg_color = "#0f172a"
//! size = 512
//! error_correction = "Q"
//!
//! [live]
//! render_debounce_ms = 300
//! history_debounce_ms = 1000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::settings::{Settings, SettingsOverrides};

/// Default debounce for both re-rendering and history saves.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine a data directory")]
    NoDataDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "qrgo", "qrgo")
}

/// Debounce windows for the live editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveConfig {
    #[serde(default = "default_debounce")]
    pub render_debounce_ms: u64,
    #[serde(default = "default_debounce")]
    pub history_debounce_ms: u64,
}

fn default_debounce() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            render_debounce_ms: DEFAULT_DEBOUNCE_MS,
            history_debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl LiveConfig {
    pub fn render_debounce(&self) -> Duration {
        Duration::from_millis(self.render_debounce_ms)
    }

    pub fn history_debounce(&self) -> Duration {
        Duration::from_millis(self.history_debounce_ms)
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where history is stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Settings applied on top of the built-in defaults.
    #[serde(default)]
    pub defaults: SettingsOverrides,

    #[serde(default)]
    pub live: LiveConfig,
}

impl Config {
    /// Platform default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, or from [`Config::default_path`] when `None`.
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            debug!(path = %path.display(), "config: no file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), "config: loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that the configured defaults produce valid settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.initial_settings()
            .validate()
            .map_err(|e| ConfigError::Validation(format!("[defaults] {e}")))
    }

    /// Built-in defaults with `[defaults]` applied.
    pub fn initial_settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.apply(&self.defaults);
        settings
    }

    /// Resolve the data directory: explicit override, then config, then the
    /// platform data directory.
    pub fn resolve_data_dir(&self, explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = explicit {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(ConfigError::NoDataDir)
    }
}
