//! Application catalog endpoints under `/api`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use preview_core::{AppId, Application, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{CurrentUser, ResolvedApplication};
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/apps", get(list_apps))
        .route(
            "/app/:application",
            get(get_app).put(create_app).delete(delete_app),
        )
}

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAppRequest {
    #[serde(default)]
    pub autoupdate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAppResponse {
    pub id: AppId,
    pub owner: UserId,
}

// ============================================================================
// HANDLERS
// ============================================================================

async fn list_apps(State(state): State<AppState>) -> ApiResult<Json<Vec<Application>>> {
    Ok(Json(state.store.query_apps().await?))
}

/// Read straight from the store so the API always shows committed state.
async fn get_app(
    State(state): State<AppState>,
    ResolvedApplication(app): ResolvedApplication,
) -> ApiResult<Json<Application>> {
    state
        .store
        .query_app(&app.id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

async fn create_app(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    body: Option<Json<CreateAppRequest>>,
) -> ApiResult<impl IntoResponse> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    state.store.create_app(&id, &user.id, request.autoupdate).await?;

    // A not-found may be cached for this id.
    state.cache.invalidate_application(&id);
    state.cache.invalidate_versions(&id);

    tracing::info!(app = %id, user = %user.id, autoupdate = request.autoupdate, "Created application");
    Ok((
        StatusCode::CREATED,
        Json(CreateAppResponse {
            id,
            owner: user.id,
        }),
    ))
}

async fn delete_app(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ResolvedApplication(app): ResolvedApplication,
) -> ApiResult<StatusCode> {
    state.store.delete_app(&app.id).await?;
    state.cache.invalidate_application(&app.id);
    state.cache.invalidate_versions(&app.id);

    tracing::info!(app = %app.id, user = %user.id, "Deleted application");
    Ok(StatusCode::NO_CONTENT)
}
