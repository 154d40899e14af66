//! Enwis ID client core.
//!
//! Holds the session credential, attaches it to every identity API call,
//! renews it once when the backend rejects it, and drives the sign-in and
//! OAuth consent flows on top of that.
//!
//! # Quick start
//!
//! ```no_run
//! use enwis_id::api::{IdentityClient, LoginData};
//! use enwis_id::auth::{FileTokenStorage, TokenStore};
//! use enwis_id::config::load_config;
//! use enwis_id::navigation::RecordingNavigator;
//! use enwis_id::session::{Credentials, Session};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = load_config(None).unwrap();
//! let tokens = TokenStore::new(FileTokenStorage::new(config.storage.token_path.clone()));
//! let client = IdentityClient::new(&config.api, tokens, Arc::new(RecordingNavigator::new()));
//! let session = Session::new(client);
//! let credentials = Credentials::Password(LoginData {
//!     login: "aziz".into(),
//!     password: "secret".into(),
//! });
//! let next = session.login(&credentials, None).await.unwrap();
//! println!("{next:?}");
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod build_info;
pub mod config;
pub mod error;
pub mod navigation;
pub mod oauth;
pub mod phone;
pub mod render;
pub mod session;
pub mod telegram;
#[cfg(test)]
pub mod testsupport;
