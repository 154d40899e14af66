//! Identity API client and its session-aware request interceptor.
//!
//! Every call goes through [`IdentityClient::execute`], which:
//! - attaches the stored access token as the bearer credential.
//! - on a 401, refreshes the token pair once and resubmits the request once.
//! - on a failed refresh, ends the session and routes the user to login.
//!
//! Concurrent 401s share one refresh: callers queue on a gate and a waiter
//! whose rejected token has already been replaced just retries.
//!
//! Each forced session end bumps a generation counter that observers such as
//! [`crate::session::Session`] follow through [`IdentityClient::session_ended`].

mod refresh;
mod retry;
mod transport;

pub(crate) use refresh::REFRESH_TOKEN_HEADER;
pub(crate) use transport::{ApiRequest, FilePart, RequestKind};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::auth::{TokenPair, TokenStore};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::navigation::{Destination, Navigator};
use retry::Attempt;

/// Client for the identity backend.
///
/// Cheap to clone; clones share the HTTP pool, token store, and refresh gate.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
    refresh_gate: Mutex<()>,
    session_ended: watch::Sender<u64>,
}

impl IdentityClient {
    /// Build a client from resolved API configuration.
    pub fn new(config: &ApiConfig, tokens: TokenStore, navigator: Arc<dyn Navigator>) -> Self {
        Self::with_timeout(config, tokens, navigator, config.timeout())
    }

    pub(crate) fn with_timeout(
        config: &ApiConfig,
        tokens: TokenStore,
        navigator: Arc<dyn Navigator>,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http: transport::build_http_client(timeout),
                base_url: config.base_url.trim_end_matches('/').to_string(),
                tokens,
                navigator,
                refresh_gate: Mutex::new(()),
                session_ended: watch::channel(0).0,
            }),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Receiver that changes every time a failed refresh ends the session.
    pub fn session_ended(&self) -> watch::Receiver<u64> {
        self.inner.session_ended.subscribe()
    }

    /// Send `request`, recovering one expired-token rejection.
    ///
    /// Returns the final response whatever its status; a 401 that survives
    /// the retry comes back as-is for the caller to classify.
    pub(crate) async fn execute(&self, request: &ApiRequest) -> Result<reqwest::Response, ApiError> {
        let mut attempt = Attempt::Initial;
        loop {
            let bearer = self.inner.tokens.access_token()?;
            debug!(
                method = %request.method,
                path = %request.path,
                authenticated = bearer.is_some(),
                "sending identity request"
            );
            let response = transport::dispatch(
                &self.inner.http,
                &self.inner.base_url,
                request,
                bearer.as_deref(),
            )
            .await?;

            if response.status() != StatusCode::UNAUTHORIZED
                || request.kind == RequestKind::CredentialExchange
            {
                return Ok(response);
            }
            let Some(next) = attempt.after_refresh() else {
                return Ok(response);
            };
            self.recover_unauthorized(bearer.as_deref(), response).await?;
            debug!(path = %request.path, "retrying request with renewed access token");
            attempt = next;
        }
    }

    /// Renew the token pair after `rejected` drew a 401.
    ///
    /// `Ok` means a fresh access token is stored and the request may be
    /// resubmitted.
    async fn recover_unauthorized(
        &self,
        rejected: Option<&str>,
        response: reqwest::Response,
    ) -> Result<(), ApiError> {
        let _gate = self.inner.refresh_gate.lock().await;

        let Some(pair) = self.inner.tokens.tokens()? else {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(StatusCode::UNAUTHORIZED.as_u16(), &body));
        };
        if rejected != Some(pair.access_token.as_str()) {
            debug!("access token already renewed by a concurrent request");
            return Ok(());
        }

        match refresh::request_new_pair(&self.inner.http, &self.inner.base_url, &pair.refresh_token)
            .await
        {
            Ok(renewed) => {
                self.inner.tokens.persist(renewed).await?;
                debug!("token pair renewed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed; ending session");
                self.end_session();
                Err(ApiError::RefreshFailed(Box::new(err)))
            }
        }
    }

    /// Renew the stored pair on demand.
    ///
    /// Unlike the interceptor path, a failure here leaves the stored pair
    /// and the user's location alone.
    pub async fn refresh(&self) -> Result<TokenPair, ApiError> {
        let _gate = self.inner.refresh_gate.lock().await;
        let Some(refresh_token) = self.inner.tokens.refresh_token()? else {
            return Err(ApiError::Unauthorized { detail: None });
        };
        let renewed =
            refresh::request_new_pair(&self.inner.http, &self.inner.base_url, &refresh_token)
                .await?;
        self.inner.tokens.persist(renewed.clone()).await?;
        Ok(renewed)
    }

    fn end_session(&self) {
        if let Err(err) = self.inner.tokens.logout() {
            warn!(error = %err, "failed to clear stored tokens");
        }
        self.inner
            .session_ended
            .send_modify(|generation| *generation += 1);
        self.inner.navigator.navigate(Destination::Login);
    }

    /// Execute and decode a JSON success body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let response = self.execute(&request).await?;
        let response = ensure_success(&request, response).await?;
        response.json::<T>().await.map_err(|err| {
            ApiError::InvalidResponse(format!("failed to decode {} response: {err}", request.path))
        })
    }

    /// Execute and discard any success body.
    pub(crate) async fn send_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        let response = self.execute(&request).await?;
        ensure_success(&request, response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

async fn ensure_success(
    request: &ApiRequest,
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match request.kind {
        RequestKind::CredentialExchange => ApiError::from_credential_status(status.as_u16(), &body),
        RequestKind::Standard => ApiError::from_status(status.as_u16(), &body),
    })
}
