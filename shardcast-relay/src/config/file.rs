//! TOML file configuration structures.
//!
//! These structs directly map to the `shardcast.toml` file format. Every
//! section is optional; an empty file is a valid single-shard setup.

use serde::{Deserialize, Serialize};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub dispatch: DispatchSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Dispatch configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSection {
    /// Number of shard lanes to run.
    #[serde(default = "default_shard_count")]
    pub shard_count: u32,
    /// Warn when a single subscriber runs longer than this many milliseconds.
    #[serde(default)]
    pub slow_handler_ms: Option<u64>,
}

fn default_shard_count() -> u32 {
    1
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            shard_count: default_shard_count(),
            slow_handler_ms: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `EnvFilter` directives used when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}
