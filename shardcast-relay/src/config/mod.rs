//! Configuration module for shardcast-relay.
//!
//! Loads the TOML file, applies CLI overrides, and builds the core
//! [`DispatchConfig`].

pub mod file;

use crate::config::file::FileConfig;
use shardcast_core::DispatchConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub dispatch: DispatchConfig,
    /// Default log filter, used when `RUST_LOG` is not set.
    pub log_filter: String,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    shards_override: Option<u32>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, shards_override: Option<u32>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            shards_override,
        }
    }

    /// Read the file, apply overrides, validate.
    ///
    /// A missing file is not an error: the relay then runs with defaults.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let content = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        self.load_str(&content)
    }

    fn load_str(&self, content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        if let Some(shards) = self.shards_override {
            file_config.dispatch.shard_count = shards;
        }

        self.validate(&file_config)?;
        Ok(Self::build_loaded_config(file_config))
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.dispatch.shard_count == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.shard_count must be at least 1".to_string(),
            ));
        }
        if config.logging.filter.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
        let mut dispatch = DispatchConfig::new(file_config.dispatch.shard_count);
        if let Some(ms) = file_config.dispatch.slow_handler_ms {
            dispatch = dispatch.with_slow_handler_threshold(Duration::from_millis(ms));
        }

        LoadedConfig {
            dispatch,
            log_filter: file_config.logging.filter,
        }
    }
}
