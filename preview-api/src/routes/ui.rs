//! Management UI: the GitHub login redirect and the static bundle.

use std::path::Path;

use axum::{extract::State, response::Redirect, routing::get, Router};
use tower_http::services::ServeDir;

use crate::state::AppState;

/// `/login` plus every other path served from `app_dir`, where a directory
/// request gets its `index.html`.
pub fn create_router(app_dir: &Path) -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .fallback_service(ServeDir::new(app_dir))
}

async fn login(State(state): State<AppState>) -> Redirect {
    let github = &state.config.github;
    Redirect::to(&format!(
        "{}?scope=user:email&client_id={}",
        github.authorize_url,
        urlencoding::encode(&github.client_id)
    ))
}
