//! Request descriptions and HTTP dispatch.
//!
//! An [`ApiRequest`] is a plain value rather than a `reqwest::RequestBuilder`
//! so the interceptor can rebuild the identical request for its one retry.

use reqwest::Method;
use serde::Serialize;
use std::time::Duration;

use crate::error::ApiError;

/// How a request takes part in the session protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    /// Ordinary call: a 401 triggers one refresh-and-retry.
    Standard,
    /// Login/registration: a 401 means bad credentials, never a stale token.
    CredentialExchange,
}

#[derive(Debug, Clone)]
pub(crate) struct FilePart {
    pub(crate) field: &'static str,
    pub(crate) file_name: String,
    pub(crate) mime: String,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub(crate) enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(FilePart),
}

#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: RequestBody,
    pub(crate) kind: RequestKind,
}

impl ApiRequest {
    pub(crate) fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            kind: RequestKind::Standard,
        }
    }

    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub(crate) fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub(crate) fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub(crate) fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub(crate) fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|err| {
            ApiError::InvalidResponse(format!("failed to encode request body: {err}"))
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub(crate) fn file(mut self, part: FilePart) -> Self {
        self.body = RequestBody::Multipart(part);
        self
    }

    pub(crate) fn credential_exchange(mut self) -> Self {
        self.kind = RequestKind::CredentialExchange;
        self
    }
}

/// Build an HTTP client with the configured timeout applied.
pub(crate) fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("enwis-id/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Join the configured base URL and an endpoint path.
pub(crate) fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Send one request, attaching `bearer` as the `Authorization` credential.
pub(crate) async fn dispatch(
    http: &reqwest::Client,
    base_url: &str,
    request: &ApiRequest,
    bearer: Option<&str>,
) -> Result<reqwest::Response, ApiError> {
    let mut builder = http.request(
        request.method.clone(),
        endpoint_url(base_url, &request.path),
    );
    if !request.query.is_empty() {
        builder = builder.query(&request.query);
    }
    if let Some(token) = bearer {
        builder = builder.bearer_auth(token);
    }
    builder = match &request.body {
        RequestBody::Empty => builder,
        RequestBody::Json(value) => builder.json(value),
        RequestBody::Multipart(part) => {
            let file = reqwest::multipart::Part::bytes(part.bytes.clone())
                .file_name(part.file_name.clone())
                .mime_str(&part.mime)?;
            builder.multipart(reqwest::multipart::Form::new().part(part.field, file))
        }
    };
    Ok(builder.send().await?)
}
