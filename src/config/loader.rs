//! Top-level config loading pipeline.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::defaults::{APP_DIR_NAME, TOKEN_FILE_NAME};
use super::env::apply_runtime_env_overrides;
use super::sources::{config_root_dir_with, read_config_text_with_sources};
use super::types::FileConfig;
use super::{Config, LoadedConfig, StorageConfig};

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from --config flag).
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    Ok(load_config_with_source(path_override)?.config)
}

/// Load configuration and report which file it came from.
pub fn load_config_with_source(path_override: Option<&str>) -> Result<LoadedConfig, ConfigError> {
    let env_lookup = |name: &str| std::env::var(name).ok();
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        env_lookup,
        || config_root_dir_with(&env_lookup),
    )
}

pub(super) fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<LoadedConfig, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (config_text, source) =
        read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let parsed: FileConfig = toml::from_str(&config_text)?;
    let mut config = resolve_file_config(parsed, &config_root)?;
    apply_runtime_env_overrides(&mut config, &env_lookup)?;

    Ok(LoadedConfig {
        config,
        source: source.path(),
    })
}

pub(super) fn resolve_file_config<FRoot>(
    parsed: FileConfig,
    config_root: &FRoot,
) -> Result<Config, ConfigError>
where
    FRoot: Fn() -> Option<PathBuf>,
{
    let mut api = parsed.api;
    api.base_url = api.base_url.trim().trim_end_matches('/').to_string();
    if api.base_url.is_empty() {
        return Err(ConfigError::Invalid(
            "api.base_url must not be empty".to_string(),
        ));
    }
    api.timeout_secs = api.timeout_secs.max(1);

    let token_path = match parsed
        .storage
        .token_path
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
    {
        Some(path) => PathBuf::from(path),
        None => default_token_path(config_root),
    };

    Ok(Config {
        api,
        storage: StorageConfig { token_path },
        display: parsed.display,
    })
}

fn default_token_path<FRoot>(config_root: &FRoot) -> PathBuf
where
    FRoot: Fn() -> Option<PathBuf>,
{
    match config_root() {
        Some(dir) => dir.join(APP_DIR_NAME).join(TOKEN_FILE_NAME),
        None => PathBuf::from(format!(".{APP_DIR_NAME}-{TOKEN_FILE_NAME}")),
    }
}
