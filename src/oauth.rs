//! OAuth consent handoff.
//!
//! A third-party client sends the user to the login screen with
//! `client_id`, `redirect_uri`, `scope` and `state` in the query. Those four
//! values travel unchanged through login and the consent screen to the
//! backend, which mints the `redirect_to` URL the user is finally sent to.

use serde::Serialize;
use tracing::warn;

use crate::api::IdentityClient;
use crate::error::ApiError;
use crate::navigation::Destination;

/// Shown when the backend cannot name the requesting client.
pub const UNKNOWN_CLIENT_NAME: &str = "Unknown application";
/// Scope forwarded when the incoming request names none.
pub const DEFAULT_SCOPE: &str = "profile";

/// A third-party client's pending access request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state: String,
}

impl AuthorizationRequest {
    /// Read the request from a URL query string (leading `?` optional).
    ///
    /// Returns `None` when `client_id` is absent or empty: that is an
    /// ordinary login, not an authorization handoff. For repeated keys the
    /// first value wins.
    pub fn from_query(query: &str) -> Option<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut client_id = None;
        let mut redirect_uri = None;
        let mut scope = None;
        let mut state = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "client_id" => &mut client_id,
                "redirect_uri" => &mut redirect_uri,
                "scope" => &mut scope,
                "state" => &mut state,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        let client_id = client_id.filter(|id: &String| !id.is_empty())?;
        Some(Self {
            client_id,
            redirect_uri: redirect_uri.unwrap_or_default(),
            scope: scope
                .filter(|scope| !scope.is_empty())
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            state: state.unwrap_or_default(),
        })
    }

    /// Read the request from a full URL, or from a bare query string.
    pub fn from_url(input: &str) -> Option<Self> {
        let input = input.trim();
        match url::Url::parse(input) {
            Ok(url) => Self::from_query(url.query().unwrap_or_default()),
            Err(_) => {
                let query = input.split_once('?').map_or(input, |(_, query)| query);
                Self::from_query(query)
            }
        }
    }

    /// Encode the request for handing it to the consent screen.
    pub fn to_query(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scope)
            .append_pair("state", &self.state)
            .finish()
    }
}

/// Where a successful login leads: consent for a pending request, else the
/// dashboard.
pub fn post_login_destination(pending: Option<&AuthorizationRequest>) -> Destination {
    match pending {
        Some(request) => Destination::Consent(request.clone()),
        None => Destination::Dashboard,
    }
}

/// The approve/deny decision for one authorization request.
pub struct ConsentScreen {
    client: IdentityClient,
    request: AuthorizationRequest,
    client_name: String,
}

impl ConsentScreen {
    /// Resolve the client's display name. Failure never blocks the flow.
    pub async fn load(client: IdentityClient, request: AuthorizationRequest) -> Self {
        let client_name = match client.validate_client(&request).await {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_CLIENT_NAME.to_string(),
            Err(err) => {
                warn!(
                    client_id = %request.client_id,
                    error = %err,
                    "could not resolve OAuth client name"
                );
                UNKNOWN_CLIENT_NAME.to_string()
            }
        };
        Self {
            client,
            request,
            client_name,
        }
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// Grant access and leave for the backend's `redirect_to`, untouched.
    ///
    /// On error nothing moves and the call may be retried.
    pub async fn approve(&self) -> Result<(), ApiError> {
        let redirect_to = self.client.authorize(&self.request).await?;
        self.client
            .navigator()
            .navigate(Destination::External(redirect_to));
        Ok(())
    }

    /// Cancel without contacting the backend.
    pub fn deny(&self) {
        self.client.navigator().navigate(Destination::Back);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{TokenPair, TokenStore};
    use crate::config::ApiConfig;
    use crate::navigation::RecordingNavigator;
    use crate::testsupport::{MockResponse, MockServer};
    use serde_json::json;
    use std::sync::Arc;

    const INCOMING: &str = "client_id=abc123&redirect_uri=https://x.test/cb&scope=profile&state=xyz";
    const REDIRECT: &str = "https://x.test/cb?code=Zx%2F9_q&state=xyz";

    fn client(server: &MockServer) -> (IdentityClient, Arc<RecordingNavigator>) {
        let tokens = TokenStore::in_memory();
        tokens
            .save_tokens(&TokenPair::new("access-1", "refresh-1"))
            .expect("seed");
        let navigator = Arc::new(RecordingNavigator::new());
        let config = ApiConfig {
            base_url: server.base_url(),
            ..ApiConfig::default()
        };
        (
            IdentityClient::new(&config, tokens, navigator.clone()),
            navigator,
        )
    }

    #[test]
    fn query_values_are_kept_verbatim() {
        let request = AuthorizationRequest::from_query(INCOMING).expect("request");
        assert_eq!(
            request,
            AuthorizationRequest {
                client_id: "abc123".into(),
                redirect_uri: "https://x.test/cb".into(),
                scope: "profile".into(),
                state: "xyz".into(),
            }
        );
        let reparsed = AuthorizationRequest::from_query(&request.to_query()).expect("round trip");
        assert_eq!(reparsed, request);
    }

    #[test]
    fn missing_client_id_is_not_a_handoff() {
        assert_eq!(
            AuthorizationRequest::from_query("redirect_uri=https://x.test/cb"),
            None
        );
        assert_eq!(AuthorizationRequest::from_query("client_id=&state=1"), None);
        assert_eq!(AuthorizationRequest::from_query(""), None);
    }

    #[test]
    fn absent_optional_values_get_login_screen_defaults() {
        let request = AuthorizationRequest::from_query("?client_id=abc123").expect("request");
        assert_eq!(request.redirect_uri, "");
        assert_eq!(request.scope, DEFAULT_SCOPE);
        assert_eq!(request.state, "");
    }

    #[test]
    fn from_url_accepts_full_urls_and_bare_queries() {
        let full = AuthorizationRequest::from_url(&format!(
            "https://id.enwis.uz/login?{INCOMING}&client_id=ignored"
        ))
        .expect("full url");
        assert_eq!(full.client_id, "abc123");
        let bare = AuthorizationRequest::from_url(&format!("/login?{INCOMING}")).expect("bare");
        assert_eq!(bare, full);
        assert_eq!(AuthorizationRequest::from_url("https://id.enwis.uz/login"), None);
    }

    #[test]
    fn login_routes_by_pending_request() {
        assert_eq!(post_login_destination(None), Destination::Dashboard);
        let request = AuthorizationRequest::from_query(INCOMING).expect("request");
        assert_eq!(
            post_login_destination(Some(&request)),
            Destination::Consent(request)
        );
    }

    #[tokio::test]
    async fn approval_sends_four_values_and_follows_redirect_untouched() {
        let server = MockServer::start(|request| {
            if request.is("GET", "/oauth/authorize/validate") {
                MockResponse::json(200, json!({ "name": "Enwis Academy" }))
            } else {
                MockResponse::json(200, json!({ "redirect_to": REDIRECT }))
            }
        })
        .await;
        let (client, navigator) = client(&server);
        let request = AuthorizationRequest::from_query(INCOMING).expect("request");

        let screen = ConsentScreen::load(client, request).await;
        assert_eq!(screen.client_name(), "Enwis Academy");
        screen.approve().await.expect("approve");

        let requests = server.requests();
        assert_eq!(
            requests[0].query(),
            Some("client_id=abc123&redirect_uri=https%3A%2F%2Fx.test%2Fcb")
        );
        assert!(requests[1].is("POST", "/oauth/authorize"));
        assert_eq!(requests[1].bearer(), Some("access-1"));
        assert_eq!(
            requests[1].body_json(),
            json!({
                "client_id": "abc123",
                "redirect_uri": "https://x.test/cb",
                "scope": "profile",
                "state": "xyz"
            })
        );
        assert_eq!(
            navigator.history(),
            vec![Destination::External(REDIRECT.to_string())]
        );
    }

    #[tokio::test]
    async fn unresolvable_client_gets_placeholder_name() {
        let server = MockServer::start(|_| MockResponse::detail(404, "Client not found")).await;
        let (client, _) = client(&server);
        let request = AuthorizationRequest::from_query(INCOMING).expect("request");

        let screen = ConsentScreen::load(client, request).await;
        assert_eq!(screen.client_name(), UNKNOWN_CLIENT_NAME);
    }

    #[tokio::test]
    async fn failed_approval_stays_on_screen_and_can_retry() {
        let server = MockServer::start(|request| {
            if request.is("POST", "/oauth/authorize") {
                MockResponse::detail(500, "boom")
            } else {
                MockResponse::json(200, json!({ "name": "Enwis Academy" }))
            }
        })
        .await;
        let (client, navigator) = client(&server);
        let request = AuthorizationRequest::from_query(INCOMING).expect("request");
        let screen = ConsentScreen::load(client, request).await;

        assert!(screen.approve().await.is_err());
        assert!(screen.approve().await.is_err());
        assert!(navigator.history().is_empty());
        assert_eq!(server.count("POST", "/oauth/authorize"), 2);
    }

    #[tokio::test]
    async fn missing_redirect_is_an_invalid_response() {
        let server = MockServer::start(|_| MockResponse::json(200, json!({}))).await;
        let (client, navigator) = client(&server);
        let request = AuthorizationRequest::from_query(INCOMING).expect("request");
        let screen = ConsentScreen::load(client, request).await;

        let err = screen.approve().await.expect_err("no redirect");
        assert!(matches!(err, ApiError::InvalidResponse(_)), "got: {err}");
        assert!(navigator.history().is_empty());
    }

    #[tokio::test]
    async fn denial_goes_back_without_backend_call() {
        let server =
            MockServer::start(|_| MockResponse::json(200, json!({ "name": "Enwis Academy" }))).await;
        let (client, navigator) = client(&server);
        let request = AuthorizationRequest::from_query(INCOMING).expect("request");
        let screen = ConsentScreen::load(client, request).await;

        screen.deny();
        assert_eq!(navigator.history(), vec![Destination::Back]);
        assert_eq!(server.count("POST", "/oauth/authorize"), 0);
    }
}
