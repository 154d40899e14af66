//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`ENWIS_API_URL`, `ENWIS_API_TIMEOUT_SECS`,
//!    `ENWIS_TOKEN_PATH`).
//! 2. TOML file specified via --config CLI flag
//! 3. ./enwis.toml in the current directory
//! 4. $XDG_CONFIG_HOME/enwis/enwis.toml (or ~/.config/enwis/enwis.toml)
//! 5. Built-in defaults

mod defaults;
mod env;
mod loader;
mod sources;
mod types;

pub use loader::{load_config, load_config_with_source};
pub use sources::config_root_dir;
pub use types::{ApiConfig, Config, DisplayConfig, LoadedConfig, StorageConfig};
