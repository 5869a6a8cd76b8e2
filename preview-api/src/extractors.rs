//! Typed request context.
//!
//! Handlers receive the resolved application, version and caller as
//! extractors. Path resolution reads through the catalog cache; a missing
//! application or an unresolvable version rejects with a bare 404.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use preview_core::{Application, User, VersionId, VersionToken};
use preview_storage::resolve_version;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Read a named path parameter.
pub(crate) async fn path_param(
    parts: &mut Parts,
    state: &AppState,
    name: &str,
) -> ApiResult<String> {
    let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
        .await
        .map_err(|e| ApiError::invalid_input(e.body_text()))?;

    params
        .get(name)
        .cloned()
        .ok_or_else(|| ApiError::internal_error(format!("Route has no :{} parameter", name)))
}

// ============================================================================
// APPLICATION
// ============================================================================

/// The application named by the `:application` path segment.
#[derive(Debug, Clone)]
pub struct ResolvedApplication(pub Application);

#[async_trait]
impl FromRequestParts<AppState> for ResolvedApplication {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = path_param(parts, state, "application").await?;
        let app = state
            .cache
            .get_application(&id)
            .await?
            .ok_or_else(ApiError::not_found)?;
        Ok(Self(app))
    }
}

impl std::ops::Deref for ResolvedApplication {
    type Target = Application;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ============================================================================
// VERSION
// ============================================================================

/// The concrete version named by the `:version` segment, which may be the
/// `current`, `previous` or `latest` alias.
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    pub app: Application,
    pub version: VersionId,
}

#[async_trait]
impl FromRequestParts<AppState> for ResolvedVersion {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ResolvedApplication(app) = ResolvedApplication::from_request_parts(parts, state).await?;
        let raw = path_param(parts, state, "version").await?;
        let version = resolve_segment(state, &app, &raw).await?;
        Ok(Self { app, version })
    }
}

/// Resolve a raw version path segment against `app`, 404 when it names
/// nothing.
pub(crate) async fn resolve_segment(
    state: &AppState,
    app: &Application,
    raw: &str,
) -> ApiResult<VersionId> {
    let token = VersionToken::parse(raw);
    let version = resolve_version(&state.cache, app, &token)
        .await?
        .ok_or_else(ApiError::not_found)?;

    tracing::debug!(app = %app.id, version = %version, token = %token, "Resolved version");
    Ok(version)
}

// ============================================================================
// CALLER
// ============================================================================

/// The authenticated caller, placed in request extensions by the auth
/// middleware. Rejects with 403 when the request carried no credentials.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(ApiError::forbidden)
    }
}

impl std::ops::Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
