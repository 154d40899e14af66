//! Published authentication state.

use tokio::sync::watch;

use crate::api::User;

/// Who is signed in, and whether that is known yet.
///
/// `loading` is true only until bootstrap finishes. Once it is false,
/// `user == None` means signed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Initializing,
    Anonymous,
    Authenticated,
}

impl AuthState {
    pub fn initializing() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user: None,
            loading: false,
        }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        match (&self.user, self.loading) {
            (_, true) => AuthPhase::Initializing,
            (None, false) => AuthPhase::Anonymous,
            (Some(_), false) => AuthPhase::Authenticated,
        }
    }
}

/// Read-only view of the session's [`AuthState`].
#[derive(Debug, Clone)]
pub struct AuthStateHandle {
    rx: watch::Receiver<AuthState>,
}

impl AuthStateHandle {
    pub(super) fn new(rx: watch::Receiver<AuthState>) -> Self {
        Self { rx }
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> AuthState {
        self.rx.borrow().clone()
    }

    /// Receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.rx.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.rx.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().phase() == AuthPhase::Authenticated
    }

    /// Wait until bootstrap has settled, then return the state.
    pub async fn wait_ready(&self) -> AuthState {
        let mut rx = self.rx.clone();
        let settled = match rx.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.get(),
        };
        settled
    }
}
