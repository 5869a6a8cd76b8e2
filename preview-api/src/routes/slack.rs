//! Slack app installation callback.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use preview_core::ThirdPartyToken;
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::github::CallbackParams;
use super::oauth::exchange_code;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new().route("/oauth", get(oauth_callback))
}

#[derive(Debug, Default, Deserialize)]
struct Bot {
    bot_user_id: Option<String>,
    bot_access_token: Option<String>,
}

/// `oauth.access` response. Failures come back as `ok: false` with no
/// token fields.
#[derive(Debug, Deserialize)]
struct SlackGrant {
    team_id: Option<String>,
    access_token: Option<String>,
    #[serde(default)]
    scope: String,
    #[serde(default)]
    bot: Option<Bot>,
    error: Option<String>,
}

impl SlackGrant {
    fn into_token(self) -> Option<ThirdPartyToken> {
        let bot = self.bot.unwrap_or_default();
        Some(ThirdPartyToken {
            team_id: self.team_id?,
            access_token: self.access_token?,
            scope: self.scope,
            bot_user_id: bot.bot_user_id,
            bot_access_token: bot.bot_access_token,
        })
    }
}

async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<StatusCode> {
    let slack = &state.config.slack;
    let grant: SlackGrant = exchange_code(
        &state.http,
        &slack.token_url,
        &slack.client_id,
        slack.client_secret.expose_secret(),
        &params.code,
    )
    .await?;

    let error = grant.error.clone();
    let token = grant.into_token().ok_or_else(|| {
        tracing::warn!(error = error.as_deref().unwrap_or("unknown"), "Slack refused the code");
        ApiError::forbidden()
    })?;

    state
        .store
        .upsert_third_party_token(&token)
        .await?;

    tracing::info!(team = %token.team_id, "Slack workspace authorized");
    Ok(StatusCode::OK)
}
