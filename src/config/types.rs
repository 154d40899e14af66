//! Configuration data model.
//!
//! File-facing structs deserialize straight from `enwis.toml`; the loader
//! resolves them into [`Config`] with every path made concrete.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::{DEFAULT_API_BASE_URL, DEFAULT_API_TIMEOUT_SECS};

/// Top-level runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub display: DisplayConfig,
}

/// Identity backend connection settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    /// Request timeout, never shorter than one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Where the encrypted token pair lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub token_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

/// Resolved configuration plus the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// `None` when built-in defaults were used.
    pub source: Option<PathBuf>,
}

/// Raw `enwis.toml` shape.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileConfig {
    pub(super) api: ApiConfig,
    pub(super) storage: FileStorageConfig,
    pub(super) display: DisplayConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileStorageConfig {
    pub(super) token_path: Option<String>,
}
