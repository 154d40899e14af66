//! Telegram login widget hand-off.
//!
//! The widget reports a signed [`TelegramUser`] once the user approves the
//! bot. Whoever hosts the widget forwards that payload into a
//! [`TelegramAuthChannel`]; the login screen listens through a
//! [`TelegramSubscription`] that deregisters itself when dropped. At most
//! one subscription is live: subscribing again closes the previous one.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::TelegramUser;
use crate::error::ApiError;
use crate::navigation::Destination;
use crate::oauth::AuthorizationRequest;
use crate::session::{Credentials, Session};

/// Bot the widget authenticates against.
pub const TELEGRAM_BOT_USERNAME: &str = "EnwisAuthBot";

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<TelegramUser>,
}

#[derive(Default)]
struct ChannelState {
    next_id: u64,
    active: Option<Subscriber>,
}

#[derive(Clone, Default)]
pub struct TelegramAuthChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl TelegramAuthChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sole listener, replacing any earlier one.
    pub fn subscribe(&self) -> TelegramSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        if state.active.replace(Subscriber { id, tx }).is_some() {
            debug!("replaced previous telegram listener");
        }
        TelegramSubscription {
            id,
            rx,
            channel: Arc::clone(&self.state),
        }
    }

    /// Deliver a widget payload. Returns false when nobody is listening.
    pub fn dispatch(&self, user: TelegramUser) -> bool {
        let state = self.lock();
        match &state.active {
            Some(subscriber) => subscriber.tx.send(user).is_ok(),
            None => false,
        }
    }

    pub fn has_subscriber(&self) -> bool {
        self.lock().active.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChannelState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Scoped listener for widget payloads.
pub struct TelegramSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<TelegramUser>,
    channel: Arc<Mutex<ChannelState>>,
}

impl TelegramSubscription {
    /// Next payload, or `None` once this listener has been replaced.
    pub async fn next(&mut self) -> Option<TelegramUser> {
        self.rx.recv().await
    }

    /// Wait for the widget and sign in with its payload.
    ///
    /// `None` when the listener was replaced before a payload arrived.
    pub async fn complete_login(
        &mut self,
        session: &Session,
        pending: Option<&AuthorizationRequest>,
    ) -> Option<Result<Destination, ApiError>> {
        let user = self.next().await?;
        debug!(telegram_id = user.id, "telegram widget authorized");
        Some(session.login(&Credentials::Telegram(user), pending).await)
    }
}

impl Drop for TelegramSubscription {
    fn drop(&mut self) {
        let mut state = self
            .channel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.active.as_ref().is_some_and(|active| active.id == self.id) {
            state.active = None;
        }
    }
}
