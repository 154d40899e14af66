//! Default configuration constants.

/// Identity backend base URL used when nothing else is configured.
pub(super) const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
/// Default timeout for identity API requests.
pub(super) const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
/// Directory under the config root holding `enwis.toml` and stored tokens.
pub(super) const APP_DIR_NAME: &str = "enwis";
pub(super) const CONFIG_FILE_NAME: &str = "enwis.toml";
pub(super) const TOKEN_FILE_NAME: &str = "tokens.json";
