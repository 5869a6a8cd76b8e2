//! Version endpoints under `/api/app/:application`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use preview_core::{AppId, Application, Version, VersionId};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{CurrentUser, ResolvedApplication, ResolvedVersion};
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/app/:application/versions", get(list_versions))
        .route(
            "/app/:application/version/:version",
            get(get_version).put(create_version).delete(delete_version),
        )
        .route(
            "/app/:application/version/:version/current",
            post(promote_version),
        )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVersionResponse {
    pub id: VersionId,
    pub app: AppId,
}

async fn list_versions(
    State(state): State<AppState>,
    ResolvedApplication(app): ResolvedApplication,
) -> ApiResult<Json<Vec<Version>>> {
    Ok(Json(state.store.query_versions(&app.id).await?))
}

async fn get_version(
    State(state): State<AppState>,
    ResolvedVersion { app, version }: ResolvedVersion,
) -> ApiResult<Json<Version>> {
    state
        .store
        .query_version(&app.id, &version)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

/// Register a new version; on an autoupdating application it also becomes
/// `current`.
async fn create_version(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ResolvedApplication(app): ResolvedApplication,
    Path((_, version)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    state.store.create_version(&app.id, &version, &user.id).await?;
    state.cache.invalidate_versions(&app.id);
    // `latest` moved.
    state.cache.invalidate_application(&app.id);

    if app.autoupdate {
        state
            .store
            .replace_version(&app.id, app.current.as_deref(), &version)
            .await?;
        state.cache.invalidate_application(&app.id);
        tracing::info!(app = %app.id, version = %version, "Autoupdate promoted version");
    }

    tracing::info!(app = %app.id, version = %version, user = %user.id, "Created version");
    Ok((
        StatusCode::CREATED,
        Json(CreateVersionResponse {
            id: version,
            app: app.id,
        }),
    ))
}

/// Delete by literal id; aliases are not resolved here.
async fn delete_version(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ResolvedApplication(app): ResolvedApplication,
    Path((_, version)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.store.delete_version(&app.id, &version).await?;
    state.cache.invalidate_versions(&app.id);

    tracing::info!(app = %app.id, version = %version, user = %user.id, "Deleted version");
    Ok(StatusCode::NO_CONTENT)
}

async fn promote_version(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ResolvedVersion { app, version }: ResolvedVersion,
) -> ApiResult<(StatusCode, Json<Application>)> {
    if app.is_current(&version) {
        return Err(ApiError::already_current(&version));
    }

    state
        .store
        .replace_version(&app.id, app.current.as_deref(), &version)
        .await?;
    state.cache.invalidate_application(&app.id);

    tracing::info!(app = %app.id, version = %version, user = %user.id, previous = ?app.current, "Promoted version");
    Ok((StatusCode::ACCEPTED, Json(app.promoted(version))))
}
