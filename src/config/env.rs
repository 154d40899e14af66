//! Environment overrides.
//!
//! `ENWIS_*` variables win over anything read from `enwis.toml`.

use std::path::PathBuf;

use crate::error::ConfigError;

use super::Config;

pub(super) const ENV_API_URL: &str = "ENWIS_API_URL";
pub(super) const ENV_API_TIMEOUT_SECS: &str = "ENWIS_API_TIMEOUT_SECS";
pub(super) const ENV_TOKEN_PATH: &str = "ENWIS_TOKEN_PATH";

pub(super) fn apply_runtime_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(url) = non_empty(env_lookup, ENV_API_URL) {
        config.api.base_url = url;
    }
    if let Some(timeout) = non_empty(env_lookup, ENV_API_TIMEOUT_SECS) {
        let parsed = timeout.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid {ENV_API_TIMEOUT_SECS} value `{timeout}`: expected positive integer seconds"
            ))
        })?;
        // Zero would mean "no timeout" to some transports.
        config.api.timeout_secs = parsed.max(1);
    }
    if let Some(path) = non_empty(env_lookup, ENV_TOKEN_PATH) {
        config.storage.token_path = PathBuf::from(path);
    }
    Ok(())
}

fn non_empty<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
