//! Error types for configuration, token storage, and identity API calls.

use std::fmt;

/// Longest raw response body surfaced in an error message.
const MAX_BODY_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors from durable token storage.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Invalid(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Errors from calls against the identity backend.
#[derive(Debug)]
pub enum ApiError {
    /// Transport failure: no response was received.
    Network(reqwest::Error),
    /// Login or registration rejected by the backend.
    InvalidCredentials { detail: Option<String> },
    /// Backend field validation failed.
    Validation { detail: Option<String> },
    /// A 401 that could not be recovered by refreshing the session.
    Unauthorized { detail: Option<String> },
    /// The refresh token was rejected or unreachable; the session was ended.
    RefreshFailed(Box<ApiError>),
    /// Any other non-2xx response.
    Status {
        code: u16,
        detail: Option<String>,
        body: String,
    },
    /// A success response whose body could not be decoded.
    InvalidResponse(String),
    /// Reading or writing the stored token pair failed.
    Store(StoreError),
}

impl ApiError {
    /// Classify a non-success response from an ordinary endpoint.
    pub fn from_status(code: u16, body: &str) -> Self {
        let detail = extract_detail(body);
        match code {
            401 => Self::Unauthorized { detail },
            422 => Self::Validation { detail },
            _ => Self::Status {
                code,
                detail,
                body: sanitize_body(body),
            },
        }
    }

    /// Classify a non-success response from a credential exchange endpoint.
    ///
    /// Client errors become `InvalidCredentials`, except 422 which stays a
    /// validation failure.
    pub fn from_credential_status(code: u16, body: &str) -> Self {
        match code {
            422 => Self::Validation {
                detail: extract_detail(body),
            },
            400..=499 => Self::InvalidCredentials {
                detail: extract_detail(body),
            },
            _ => Self::from_status(code, body),
        }
    }

    /// HTTP status carried by this error, when one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Validation { .. } => Some(422),
            Self::Status { code, .. } => Some(*code),
            Self::Network(inner) => inner.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Structured `detail` supplied by the backend, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::InvalidCredentials { detail }
            | Self::Validation { detail }
            | Self::Unauthorized { detail }
            | Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Message to show the user: the backend detail, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network: {e}"),
            Self::InvalidCredentials { detail } => write!(
                f,
                "invalid credentials: {}",
                detail.as_deref().unwrap_or("login or password is incorrect")
            ),
            Self::Validation { detail } => write!(
                f,
                "validation failed: {}",
                detail.as_deref().unwrap_or("request was rejected")
            ),
            Self::Unauthorized { detail } => write!(
                f,
                "unauthorized: {}",
                detail.as_deref().unwrap_or("not signed in")
            ),
            Self::RefreshFailed(cause) => {
                write!(f, "session expired and could not be renewed: {cause}")
            }
            Self::Status { code, detail, body } => match detail {
                Some(detail) => write!(f, "status {code}: {detail}"),
                None => write!(f, "status {code}: {body}"),
            },
            Self::InvalidResponse(msg) => write!(f, "invalid response: {msg}"),
            Self::Store(e) => write!(f, "token storage: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Pull the human-readable `detail` out of a backend error body.
///
/// Accepts `{"detail": "text"}` and the field-error list shape
/// `{"detail": [{"msg": "text", ...}, ...]}`, where the first entry wins.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail")?;
    let text = match detail {
        serde_json::Value::String(text) => text.as_str(),
        serde_json::Value::Array(entries) => {
            let first = entries.first()?;
            match first {
                serde_json::Value::String(text) => text.as_str(),
                other => other.get("msg")?.as_str()?,
            }
        }
        _ => return None,
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trim and truncate a raw body for display.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed.chars().take(MAX_BODY_CHARS).collect()
    }
}
