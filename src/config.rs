//! Configuration stored in `~/.covertly/config.toml`.
//!
//! ```toml
//! overflow_policy = "reject"   # or "truncate" (video only)
//! output_suffix = "_encoded"
//! log_filter = "covertly=info"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::EngineBuilder;
use crate::stego::video::OverflowPolicy;

/// Default suffix appended to the carrier's file stem on encode.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_encoded";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found. Unable to determine home directory.")]
    NoConfigDir,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// User configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// What the video adapter does when the payload does not fit.
    pub overflow_policy: OverflowPolicy,

    /// Appended to the carrier's file stem to name the encoded output.
    pub output_suffix: String,

    /// Default tracing filter, used when neither `RUST_LOG` nor `--log-level` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overflow_policy: OverflowPolicy::default(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            log_filter: None,
        }
    }
}

impl Config {
    /// Load the configuration from the default location.
    ///
    /// Returns defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load the configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(get_config_dir()?.join("config.toml"))
    }

    /// An engine builder with this configuration applied.
    pub fn engine_builder(&self) -> EngineBuilder {
        EngineBuilder::default().overflow_policy(self.overflow_policy)
    }
}

/// Get the covertly config directory (`~/.covertly`).
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".covertly"))
        .ok_or(ConfigError::NoConfigDir)
}
