//! Session bootstrap and login/logout transitions.
//!
//! [`Session`] is the only writer of [`AuthState`]. Everything else reads it
//! through an [`AuthStateHandle`]. When the client ends the session after a
//! failed refresh, a background watcher owned by the session publishes the
//! anonymous state.

mod state;

pub use state::{AuthPhase, AuthState, AuthStateHandle};

use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{IdentityClient, LoginData, RegisterData, TelegramUser, User};
use crate::auth::TokenStore;
use crate::error::ApiError;
use crate::navigation::Destination;
use crate::oauth::{post_login_destination, AuthorizationRequest};

/// Ways to exchange credentials for a token pair.
#[derive(Clone)]
pub enum Credentials {
    Password(LoginData),
    Register(RegisterData),
    /// Phone number plus the one-time code delivered to it.
    Phone { phone: String, code: String },
    Telegram(TelegramUser),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Password(_) => "Password",
            Self::Register(_) => "Register",
            Self::Phone { .. } => "Phone",
            Self::Telegram(_) => "Telegram",
        };
        write!(f, "Credentials::{kind}(..)")
    }
}

pub struct Session {
    client: IdentityClient,
    state: Arc<watch::Sender<AuthState>>,
    bootstrapped: OnceCell<()>,
    ended_watcher: JoinHandle<()>,
}

impl Session {
    /// New session in the initializing state.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(client: IdentityClient) -> Self {
        let (state, _) = watch::channel(AuthState::initializing());
        let state = Arc::new(state);
        let ended_watcher = tokio::spawn(follow_session_end(
            client.session_ended(),
            client.tokens().clone(),
            Arc::clone(&state),
        ));
        Self {
            client,
            state,
            bootstrapped: OnceCell::new(),
            ended_watcher,
        }
    }

    pub fn handle(&self) -> AuthStateHandle {
        AuthStateHandle::new(self.state.subscribe())
    }

    pub fn client(&self) -> &IdentityClient {
        &self.client
    }

    /// Settle the initial state from stored tokens.
    ///
    /// Runs once per session; later calls return the settled state. With no
    /// stored access token no request is made.
    pub async fn bootstrap(&self) -> AuthState {
        self.bootstrapped
            .get_or_init(|| async move {
                let settled = self.resolve_initial_state().await;
                self.state.send_replace(settled);
            })
            .await;
        self.state.borrow().clone()
    }

    async fn resolve_initial_state(&self) -> AuthState {
        match self.client.tokens().access_token() {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!("no stored session");
                return AuthState::anonymous();
            }
            Err(err) => {
                warn!(error = %err, "could not read stored tokens");
                return AuthState::anonymous();
            }
        }
        match self.client.me().await {
            Ok(user) => {
                debug!(user_id = %user.id, "restored session");
                AuthState::authenticated(user)
            }
            Err(err) => {
                debug!(error = %err, "stored session was not accepted");
                AuthState::anonymous()
            }
        }
    }

    /// Exchange `credentials`, load the user, and publish the signed-in state.
    ///
    /// Returns where to go next: the consent screen when `pending` carries an
    /// authorization request, the dashboard otherwise. On error the published
    /// state is left as it was.
    pub async fn login(
        &self,
        credentials: &Credentials,
        pending: Option<&AuthorizationRequest>,
    ) -> Result<Destination, ApiError> {
        match credentials {
            Credentials::Password(data) => self.client.login(data).await?,
            Credentials::Register(data) => self.client.register(data).await?,
            Credentials::Phone { phone, code } => self.client.login_phone(phone, code).await?,
            Credentials::Telegram(user) => self.client.login_telegram(user).await?,
        };
        let user = self.client.me().await?;
        debug!(user_id = %user.id, "signed in");
        self.state.send_replace(AuthState::authenticated(user));
        Ok(post_login_destination(pending))
    }

    /// Forget the session locally. Never fails and never calls the backend.
    pub fn logout(&self) -> Destination {
        if let Err(err) = self.client.tokens().logout() {
            warn!(error = %err, "failed to clear stored tokens");
        }
        self.state.send_replace(AuthState::anonymous());
        Destination::Login
    }

    /// Replace the published user with a fresh copy from the backend.
    ///
    /// Other failures leave the state untouched. A failed token refresh has
    /// already ended the session, so the state follows it to anonymous.
    pub async fn refresh_user(&self) -> Result<User, ApiError> {
        match self.client.me().await {
            Ok(user) => {
                self.state.send_replace(AuthState::authenticated(user.clone()));
                Ok(user)
            }
            Err(err) => {
                if matches!(err, ApiError::RefreshFailed(_)) {
                    self.state.send_replace(AuthState::anonymous());
                }
                Err(err)
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.ended_watcher.abort();
    }
}

/// Publish the anonymous state each time the client ends a signed-in session.
///
/// Initializing is left for bootstrap to settle; a pair stored again by a
/// newer login keeps the state.
async fn follow_session_end(
    mut ended: watch::Receiver<u64>,
    tokens: TokenStore,
    state: Arc<watch::Sender<AuthState>>,
) {
    while ended.changed().await.is_ok() {
        if tokens.has_session() {
            continue;
        }
        let cleared = state.send_if_modified(|current| {
            if current.loading || current.user.is_none() {
                return false;
            }
            *current = AuthState::anonymous();
            true
        });
        if cleared {
            debug!("session ended by failed token refresh");
        }
    }
}
