//! Token refresh call.

use super::transport::endpoint_url;
use crate::api::types::AuthResponse;
use crate::auth::TokenPair;
use crate::error::ApiError;

/// Header carrying the refresh credential; never the bearer header.
pub(crate) const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Exchange `refresh_token` for a new pair at `/auth/refresh`.
pub(super) async fn request_new_pair(
    http: &reqwest::Client,
    base_url: &str,
    refresh_token: &str,
) -> Result<TokenPair, ApiError> {
    let response = http
        .post(endpoint_url(base_url, "/auth/refresh"))
        .header(REFRESH_TOKEN_HEADER, refresh_token)
        .json(&serde_json::json!({}))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_status(status.as_u16(), &body));
    }

    let payload: AuthResponse = response.json().await.map_err(|err| {
        ApiError::InvalidResponse(format!("failed to decode refresh response: {err}"))
    })?;
    let pair = TokenPair::from(payload);
    if !pair.is_complete() {
        return Err(ApiError::InvalidResponse(
            "refresh response did not include both tokens".to_string(),
        ));
    }
    Ok(pair)
}
