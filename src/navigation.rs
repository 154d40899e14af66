//! Navigation targets and the injectable navigator seam.
//!
//! Flows never move the user themselves; they either return a
//! [`Destination`] to their caller or, for terminal steps such as the forced
//! return to login after a dead session or the OAuth redirect, hand it to the
//! [`Navigator`] the client was built with.

use std::sync::Mutex;

use crate::oauth::AuthorizationRequest;
use crate::render::Renderer;

/// Where the user should be taken next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Sign-in screen.
    Login,
    /// Authenticated landing area.
    Dashboard,
    /// OAuth consent screen for a pending third-party request.
    Consent(AuthorizationRequest),
    /// Full navigation away to an external URL, used verbatim.
    External(String),
    /// Previous screen.
    Back,
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

/// Navigator that only remembers where it was sent.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Destination> {
        self.visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<Destination> {
        self.history().pop()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: Destination) {
        self.visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(destination);
    }
}

/// Terminal navigator used by the `enwis` binary.
pub struct TerminalNavigator {
    renderer: Renderer,
    open_browser: bool,
}

impl TerminalNavigator {
    pub fn new(renderer: Renderer, open_browser: bool) -> Self {
        Self {
            renderer,
            open_browser,
        }
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, destination: Destination) {
        match destination {
            Destination::Login => self
                .renderer
                .warn("You are signed out. Run `enwis login` to sign in again."),
            Destination::Dashboard => self.renderer.success("Signed in."),
            Destination::Consent(request) => {
                self.renderer
                    .notice(&format!("Authorization requested by `{}`.", request.client_id));
            }
            Destination::External(url) => {
                self.renderer.field("redirect", &url);
                if self.open_browser && !try_open_browser(&url) {
                    self.renderer
                        .warn("Could not open a browser; open the URL above manually.");
                }
            }
            Destination::Back => self.renderer.notice("Cancelled."),
        }
    }
}

/// Best-effort system browser launch.
pub fn try_open_browser(url: &str) -> bool {
    #[cfg(target_os = "macos")]
    {
        return std::process::Command::new("open")
            .arg(url)
            .status()
            .is_ok_and(|status| status.success());
    }
    #[cfg(target_os = "windows")]
    {
        return std::process::Command::new("cmd")
            .args(["/C", "start", "", url])
            .status()
            .is_ok_and(|status| status.success());
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        return std::process::Command::new("xdg-open")
            .arg(url)
            .status()
            .is_ok_and(|status| status.success());
    }
    #[allow(unreachable_code)]
    false
}
