//! OAuth code exchange shared by the GitHub and Slack callbacks.

use axum::http::header;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

/// Trade an authorization `code` for the provider's token response.
///
/// The credentials travel as query parameters on a `POST`, with a JSON
/// response requested. Any transport or decoding failure is a bare 403.
pub async fn exchange_code<T: DeserializeOwned>(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
) -> ApiResult<T> {
    let response = http
        .post(token_url)
        .query(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("accept", "json"),
        ])
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            tracing::warn!(error = %e, token_url, "OAuth code exchange failed");
            ApiError::forbidden()
        })?;

    response.json::<T>().await.map_err(|e| {
        tracing::warn!(error = %e, token_url, "OAuth token response was not understood");
        ApiError::forbidden()
    })
}
