//! GitHub endpoints: the OAuth login callback and webhook ingestion.
//!
//! Webhooks keep one application per branch: a branch `create` registers an
//! autoupdating application owned by the sender, a branch `delete` removes
//! it with all its versions.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use hmac::{Hmac, Mac};
use preview_core::{CatalogError, User};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;

use super::oauth::exchange_code;
use crate::auth::issue_token;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

const EVENT_HEADER: &str = "x-github-event";
const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const USER_AGENT: &str = concat!("preview-gateway/", env!("CARGO_PKG_VERSION"));

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/oauth", get(oauth_callback))
        .route("/event", post(handle_event))
}

// ============================================================================
// OAUTH
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
    avatar_url: Option<String>,
    html_url: Option<String>,
}

/// Exchange the code, look up the GitHub login and hand the browser a
/// session cookie.
///
/// Membership is not checked here; the login must also exist in the
/// catalog's user table before the token opens the API.
async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<impl IntoResponse> {
    let github = &state.config.github;
    let token: AccessToken = exchange_code(
        &state.http,
        &github.token_url,
        &github.client_id,
        github.client_secret.expose_secret(),
        &params.code,
    )
    .await?;

    let access_token = token.access_token.ok_or_else(|| {
        tracing::warn!(error = token.error.as_deref().unwrap_or("unknown"), "GitHub refused the code");
        ApiError::forbidden()
    })?;

    let github_user: GithubUser = state
        .http
        .get(format!("{}/user", github.api_url))
        .header(header::AUTHORIZATION, format!("token {}", access_token))
        .header(header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            tracing::warn!(error = %e, "GitHub user lookup failed");
            ApiError::forbidden()
        })?
        .json()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "GitHub user response was not understood");
            ApiError::forbidden()
        })?;

    let user = User {
        id: github_user.login,
        avatar: github_user.avatar_url,
        home: github_user.html_url,
    };
    let session = issue_token(&state.auth, &user).map_err(|e| {
        tracing::error!(error = %e, "Failed to sign session token");
        ApiError::forbidden()
    })?;

    tracing::info!(user = %user.id, "GitHub login");
    Ok((
        [(header::SET_COOKIE, format!("token={}; Path=/", session))],
        Redirect::to("/ui/"),
    ))
}

// ============================================================================
// WEBHOOKS
// ============================================================================

#[derive(Debug, Deserialize)]
struct Account {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RefEvent {
    #[serde(rename = "ref")]
    git_ref: String,
    ref_type: String,
    sender: Account,
}

#[derive(Debug, Deserialize)]
struct Branch {
    label: String,
    #[serde(rename = "ref")]
    git_ref: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    user: Account,
    head: Branch,
    base: Branch,
    #[serde(default)]
    merged: bool,
}

#[derive(Debug, Deserialize)]
struct PullRequestEvent {
    action: String,
    pull_request: PullRequest,
}

/// Check `X-Hub-Signature-256` against the HMAC-SHA256 of the raw body.
fn verify_signature(headers: &HeaderMap, body: &[u8], secret: &str) -> ApiResult<()> {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::signature_mismatch("Missing GitHub signature"))?;

    let signature = provided
        .strip_prefix("sha256=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or_else(|| ApiError::signature_mismatch("Wrong GitHub signature"))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::internal_error("Failed to initialize HMAC"))?;
    mac.update(body);
    mac.verify_slice(&signature).map_err(|_| {
        tracing::warn!("GitHub webhook signature mismatch");
        ApiError::signature_mismatch("Wrong GitHub signature")
    })
}

/// Conflicts during webhook handling are 500s; other store errors map as usual.
fn webhook_store_error(err: CatalogError) -> ApiError {
    match err {
        CatalogError::Conflict { .. } => ApiError::database_error(err.to_string()),
        other => other.into(),
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(ApiError::from)
}

async fn handle_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    if let Some(secret) = &state.config.github.webhook_secret {
        verify_signature(&headers, &body, secret.expose_secret())?;
    }

    let event = headers
        .get(EVENT_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    match event {
        "ping" | "status" => Ok(StatusCode::OK),
        "pull_request" => {
            let payload: PullRequestEvent = parse(&body)?;
            let pr = &payload.pull_request;
            match payload.action.as_str() {
                "opened" => tracing::info!(
                    event,
                    number = pr.number,
                    user = %pr.user.login,
                    head = %pr.head.label,
                    head_ref = %pr.head.git_ref,
                    base = %pr.base.label,
                    base_ref = %pr.base.git_ref,
                    "Pull request opened"
                ),
                "closed" => tracing::info!(
                    event,
                    number = pr.number,
                    user = %pr.user.login,
                    head = %pr.head.label,
                    head_ref = %pr.head.git_ref,
                    base = %pr.base.label,
                    base_ref = %pr.base.git_ref,
                    merged = pr.merged,
                    "Pull request closed"
                ),
                _ => {}
            }
            Ok(StatusCode::OK)
        }
        "create" => {
            let payload: RefEvent = parse(&body)?;
            if payload.ref_type == "branch" {
                tracing::info!(event, app = %payload.git_ref, user = %payload.sender.login, "New branch");
                state
                    .store
                    .create_app(&payload.git_ref, &payload.sender.login, true)
                    .await
                    .map_err(webhook_store_error)?;
                state.cache.invalidate_application(&payload.git_ref);
                state.cache.invalidate_versions(&payload.git_ref);
            }
            Ok(StatusCode::OK)
        }
        "delete" => {
            let payload: RefEvent = parse(&body)?;
            if payload.ref_type == "branch" {
                tracing::info!(event, app = %payload.git_ref, user = %payload.sender.login, "Branch removed");
                state
                    .store
                    .delete_app(&payload.git_ref)
                    .await
                    .map_err(webhook_store_error)?;
                state.cache.invalidate_application(&payload.git_ref);
                state.cache.invalidate_versions(&payload.git_ref);
            }
            Ok(StatusCode::OK)
        }
        other => {
            tracing::warn!(event = other, "Unexpected GitHub event");
            Err(ApiError::unknown_event(other))
        }
    }
}
