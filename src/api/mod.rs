//! HTTP client for the Enwis identity backend.
//!
//! The API layer is split into cohesive modules:
//! - `client`: request interceptor (bearer attach, one-shot refresh-and-retry)
//! - `endpoints`: one typed method per backend route
//! - `types`: wire payloads

mod client;
mod endpoints;
pub mod types;

pub use client::IdentityClient;
pub(crate) use client::REFRESH_TOKEN_HEADER;
pub use types::{
    ActiveSession, CodeDispatch, CodePurpose, ContactType, DeliveryMethod, LoginData,
    PasswordChange, ProfileUpdate, RegisterData, TelegramUser, User, UserContact, UserProfile,
};
