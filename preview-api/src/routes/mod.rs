//! HTTP Routes Module
//!
//! - `/` redirects to the management UI
//! - `/ui` serves the UI bundle and the GitHub login redirect
//! - `/app/:application/:version/*file` serves deployed assets
//! - `/api` is the catalog API, open to known users only
//! - `/github` and `/slack` handle OAuth callbacks and webhooks
//! - `/health` has liveness and readiness probes

pub mod apps;
pub mod assets;
pub mod github;
pub mod health;
pub mod oauth;
pub mod slack;
pub mod ui;
pub mod versions;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    response::Redirect,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_middleware, require_user, security_headers};
use crate::state::AppState;

/// Build the complete gateway router.
///
/// Layer order, outermost first: request tracing, security headers, then
/// bearer token authentication. Authentication only attaches the caller;
/// `/api` additionally refuses requests that have none.
pub fn create_router(state: AppState) -> Router {
    let api_routes = apps::create_router()
        .merge(versions::create_router())
        .layer(from_fn(require_user));

    Router::new()
        .route("/", get(|| async { Redirect::to("/ui/") }))
        .nest("/ui", ui::create_router(&state.config.app_dir))
        .nest("/app", assets::create_router())
        .nest("/api", api_routes)
        .nest("/github", github::create_router())
        .nest("/slack", slack::create_router())
        .nest("/health", health::create_router())
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(from_fn_with_state(state.clone(), security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
