//! Wire types exchanged with the identity backend.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::TokenPair;

/// Token response from login, registration, and refresh endpoints.
#[derive(Clone, Deserialize)]
pub(crate) struct AuthResponse {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
}

impl From<AuthResponse> for TokenPair {
    fn from(value: AuthResponse) -> Self {
        TokenPair::new(value.access_token, value.refresh_token)
    }
}

/// Signed-in account as returned by `/auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub is_active: bool,
    #[serde(default)]
    pub global_role: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub contacts: Vec<UserContact>,
}

impl User {
    /// Display name, falling back to the username and then the id.
    pub fn display_name(&self) -> String {
        match &self.profile {
            Some(profile) if !profile.full_name.trim().is_empty() => profile.full_name.clone(),
            Some(profile) if !profile.username.trim().is_empty() => profile.username.clone(),
            _ => format!("user #{}", self.id),
        }
    }

    pub fn primary_contact(&self, kind: ContactType) -> Option<&UserContact> {
        self.contacts
            .iter()
            .find(|contact| contact.contact_type == kind && contact.is_primary)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Email,
    Phone,
    Telegram,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserContact {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub contact_type: ContactType,
    pub value: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_primary: bool,
}

/// One signed-in device listed under account security.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveSession {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Clone, Serialize)]
pub struct LoginData {
    /// Username, email, or phone.
    pub login: String,
    pub password: String,
}

#[derive(Clone, Serialize)]
pub struct RegisterData {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Partial profile update; `None` fields are left out of the request.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Clone, Serialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl fmt::Debug for LoginData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginData")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterData")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordChange { .. }")
    }
}

/// Identity payload produced by the Telegram login widget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

/// Why a one-time code is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePurpose {
    Login,
    Register,
    ResetPassword,
    VerifyEmail,
    VerifyPhone,
}

impl CodePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::ResetPassword => "reset_password",
            Self::VerifyEmail => "verify_email",
            Self::VerifyPhone => "verify_phone",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Sms,
    Telegram,
    #[serde(other)]
    Other,
}

/// Outcome of `/auth/send-code`.
///
/// Any `debug_code` the backend includes is dropped during decoding.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CodeDispatch {
    #[serde(default)]
    pub message: Option<String>,
    pub method: DeliveryMethod,
    /// Deep link that opens the bot chat delivering the code.
    #[serde(default)]
    pub telegram_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PhoneLoginBody<'a> {
    pub(crate) phone: &'a str,
    pub(crate) code: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClientInfo {
    #[serde(default)]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthorizeResponse {
    #[serde(default)]
    pub(crate) redirect_to: Option<String>,
}

/// Accept identifiers sent either as integers or as strings (UUIDs).
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(num) => Ok(num.to_string()),
        serde_json::Value::String(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(serde::de::Error::custom("id must be a number or non-empty string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::user_json;

    #[test]
    fn credential_debug_hides_passwords() {
        let login = LoginData {
            login: "aziz".into(),
            password: "hunter2-secret".into(),
        };
        let rendered = format!("{login:?}");
        assert!(rendered.contains("aziz"), "got: {rendered}");
        assert!(!rendered.contains("hunter2-secret"), "got: {rendered}");

        let change = PasswordChange {
            old_password: "old-secret".into(),
            new_password: "new-secret".into(),
            confirm_password: "new-secret".into(),
        };
        let rendered = format!("{change:?}");
        assert!(!rendered.contains("secret"), "got: {rendered}");
    }

    #[test]
    fn user_decodes_nested_profile_and_contacts() {
        let user: User = serde_json::from_value(user_json(42, "aziz")).expect("decode");
        assert_eq!(user.id, "42");
        assert_eq!(user.display_name(), "Aziz Karimov");
        let phone = user.primary_contact(ContactType::Phone).expect("phone");
        assert!(phone.is_verified);
        assert!(user.primary_contact(ContactType::Email).is_none());
    }

    #[test]
    fn user_tolerates_missing_profile_and_unknown_contacts() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "6f1c2e9a-0d1b-4a55-9d0e-3f2b8c7a1e44",
            "is_active": false,
            "profile": null,
            "contacts": [{"id": 1, "contact_type": "fax", "value": "x"}]
        }))
        .expect("decode");
        assert_eq!(
            user.display_name(),
            "user #6f1c2e9a-0d1b-4a55-9d0e-3f2b8c7a1e44"
        );
        assert_eq!(user.contacts[0].contact_type, ContactType::Other);
    }

    #[test]
    fn code_dispatch_never_keeps_debug_code() {
        let dispatch: CodeDispatch = serde_json::from_value(serde_json::json!({
            "message": "sent",
            "method": "sms",
            "debug_code": "424242",
            "telegram_url": "https://t.me/EnwisAuthBot?start=abc"
        }))
        .expect("decode");
        let rendered = format!("{dispatch:?}");
        assert!(!rendered.contains("424242"), "got: {rendered}");
        assert_eq!(dispatch.method, DeliveryMethod::Sms);
    }

    #[test]
    fn profile_update_omits_unset_fields() {
        let update = ProfileUpdate {
            bio: Some("hello".into()),
            ..ProfileUpdate::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "bio": "hello" })
        );
        assert!(ProfileUpdate::default().is_empty());
    }
}
