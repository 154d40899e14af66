//! Typed wrappers for each identity backend endpoint.

use std::path::Path;

use url::Url;

use super::client::{ApiRequest, FilePart, IdentityClient};
use super::types::{
    ActiveSession, AuthResponse, AuthorizeResponse, ClientInfo, CodeDispatch, CodePurpose,
    LoginData, PasswordChange, PhoneLoginBody, ProfileUpdate, RegisterData, TelegramUser, User,
};
use crate::auth::TokenPair;
use crate::error::ApiError;
use crate::oauth::AuthorizationRequest;

impl IdentityClient {
    // -- credential exchange ------------------------------------------------

    pub async fn register(&self, data: &RegisterData) -> Result<TokenPair, ApiError> {
        self.exchange(ApiRequest::post("/auth/register").json(data)?)
            .await
    }

    pub async fn login(&self, data: &LoginData) -> Result<TokenPair, ApiError> {
        self.exchange(ApiRequest::post("/auth/login").json(data)?)
            .await
    }

    /// Complete a phone OTP login.
    pub async fn login_phone(&self, phone: &str, code: &str) -> Result<TokenPair, ApiError> {
        let body = PhoneLoginBody { phone, code };
        self.exchange(ApiRequest::post("/auth/login/phone").json(&body)?)
            .await
    }

    /// Complete a login started by the Telegram widget.
    pub async fn login_telegram(&self, user: &TelegramUser) -> Result<TokenPair, ApiError> {
        self.exchange(ApiRequest::post("/auth/login/telegram").json(user)?)
            .await
    }

    /// Post credentials and store the returned pair.
    async fn exchange(&self, request: ApiRequest) -> Result<TokenPair, ApiError> {
        let payload: AuthResponse = self.send_json(request.credential_exchange()).await?;
        let pair = TokenPair::from(payload);
        if !pair.is_complete() {
            return Err(ApiError::InvalidResponse(
                "credential exchange did not return both tokens".to_string(),
            ));
        }
        self.tokens().persist(pair.clone()).await?;
        Ok(pair)
    }

    /// Ask the backend to deliver a one-time code to `target`.
    pub async fn send_code(
        &self,
        target: &str,
        purpose: CodePurpose,
    ) -> Result<CodeDispatch, ApiError> {
        let request = ApiRequest::post("/auth/send-code")
            .query("target", target)
            .query("purpose", purpose.as_str());
        self.send_json(request).await
    }

    // -- account --------------------------------------------------------------

    pub async fn me(&self) -> Result<User, ApiError> {
        self.send_json(ApiRequest::get("/auth/me")).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.send_json(ApiRequest::put("/auth/profile").json(update)?)
            .await
    }

    /// Upload an avatar image read by the caller; MIME type follows the
    /// file extension.
    pub async fn upload_avatar(&self, file_name: &str, bytes: Vec<u8>) -> Result<User, ApiError> {
        let part = FilePart {
            field: "file",
            file_name: file_name.to_string(),
            mime: guess_image_mime(file_name).to_string(),
            bytes,
        };
        self.send_json(ApiRequest::post("/auth/avatar").file(part))
            .await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        self.send_empty(ApiRequest::put("/auth/security/password").json(change)?)
            .await
    }

    pub async fn list_sessions(&self) -> Result<Vec<ActiveSession>, ApiError> {
        self.send_json(ApiRequest::get("/auth/security/sessions"))
            .await
    }

    pub async fn terminate_session(&self, session_id: &str) -> Result<(), ApiError> {
        let path = format!("/auth/security/sessions/{}", path_segment(session_id)?);
        self.send_empty(ApiRequest::delete(path)).await
    }

    // -- oauth ----------------------------------------------------------------

    /// Resolve the display name of the client behind `request`.
    pub async fn validate_client(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<Option<String>, ApiError> {
        let lookup = ApiRequest::get("/oauth/authorize/validate")
            .query("client_id", request.client_id.as_str())
            .query("redirect_uri", request.redirect_uri.as_str());
        let info: ClientInfo = self.send_json(lookup).await?;
        Ok(info.name.filter(|name| !name.trim().is_empty()))
    }

    /// Approve `request`; returns the backend's `redirect_to` untouched.
    pub async fn authorize(&self, request: &AuthorizationRequest) -> Result<String, ApiError> {
        let response: AuthorizeResponse = self
            .send_json(ApiRequest::post("/oauth/authorize").json(request)?)
            .await?;
        response
            .redirect_to
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ApiError::InvalidResponse("authorization response had no redirect_to".to_string())
            })
    }
}

/// MIME type for an avatar upload, from the file extension.
pub(crate) fn guess_image_mime(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Percent-encode `raw` as exactly one path segment.
///
/// Empty and dot segments cannot be expressed and are rejected.
fn path_segment(raw: &str) -> Result<String, ApiError> {
    let raw = raw.trim();
    if matches!(raw, "" | "." | "..") {
        return Err(ApiError::Validation {
            detail: Some(format!("`{raw}` is not a valid identifier")),
        });
    }
    let mut scratch = Url::parse("http://segment.invalid/")
        .map_err(|err| ApiError::InvalidResponse(format!("segment encoder: {err}")))?;
    scratch
        .path_segments_mut()
        .map_err(|()| ApiError::InvalidResponse("segment encoder has no path".to_string()))?
        .pop_if_empty()
        .push(raw);
    Ok(scratch.path().trim_start_matches('/').to_string())
}
