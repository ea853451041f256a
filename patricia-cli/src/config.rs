//! Configuration file support for the CLI.
//!
//! Loads and saves CLI configuration from TOML files.

use patricia_error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Directory holding the node store and the state file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// State file name, relative to `data_dir`.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Required byte width of every key.
    #[serde(default = "default_key_size")]
    pub key_size: usize,

    /// Base log filter directive.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".patricia")
}

fn default_state_file() -> String {
    "state.json".to_string()
}

fn default_key_size() -> usize {
    32
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            state_file: default_state_file(),
            key_size: default_key_size(),
            log_filter: default_log_filter(),
        }
    }
}

impl CliConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("config::from_file")
                .with_context("path", path.display().to_string())
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            Error::config_invalid("failed to parse config file")
                .with_operation("config::from_file")
                .with_context("path", path.display().to_string())
                .set_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            Error::serialization_failed("failed to encode config")
                .with_operation("config::save")
                .set_source(e)
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::from(e).with_operation("config::save"))?;
        }

        std::fs::write(path, content).map_err(|e| {
            Error::from(e)
                .with_operation("config::save")
                .with_context("path", path.display().to_string())
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_size == 0 {
            return Err(Error::config_invalid("key_size must be at least one byte")
                .with_operation("config::validate"));
        }
        if self.state_file.is_empty() {
            return Err(Error::config_invalid("state_file must not be empty")
                .with_operation("config::validate"));
        }
        Ok(())
    }

    /// Directory of the file-backed node store.
    pub fn nodes_dir(&self) -> PathBuf {
        self.data_dir.join("nodes")
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(&self.state_file)
    }

    /// Returns a builder for configuration.
    pub fn builder() -> CliConfigBuilder {
        CliConfigBuilder::new()
    }
}

/// Builder for CLI configuration.
#[derive(Default)]
pub struct CliConfigBuilder {
    config: CliConfig,
}

impl CliConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = data_dir.into();
        self
    }

    pub fn state_file(mut self, state_file: impl Into<String>) -> Self {
        self.config.state_file = state_file.into();
        self
    }

    pub fn key_size(mut self, key_size: usize) -> Self {
        self.config.key_size = key_size;
        self
    }

    pub fn log_filter(mut self, log_filter: impl Into<String>) -> Self {
        self.config.log_filter = log_filter.into();
        self
    }

    pub fn build(self) -> CliConfig {
        self.config
    }
}
