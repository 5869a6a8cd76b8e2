//! Static asset passthrough.
//!
//! `GET /app/:application/:version/*path` streams
//! `application/version/path` out of the artifact bucket. The version
//! segment may be an alias; the path defaults to `index.html`.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use preview_storage::ConditionalHeaders;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{resolve_segment, ResolvedApplication};
use crate::state::AppState;

const DEFAULT_FILE: &str = "index.html";

pub fn create_router() -> Router<AppState> {
    // One catch-all so `/:version`, `/:version/` and `/:version/a/b.js`
    // all land here.
    Router::new().route("/:application/*rest", get(serve_asset))
}

/// Split `version[/path]` into the version segment and the file path.
fn split_rest(rest: &str) -> (&str, &str) {
    let rest = rest.trim_start_matches('/');
    match rest.split_once('/') {
        Some((version, file)) if !file.is_empty() => (version, file),
        Some((version, _)) => (version, DEFAULT_FILE),
        None => (rest, DEFAULT_FILE),
    }
}

fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn conditional_headers(headers: &HeaderMap) -> ConditionalHeaders {
    ConditionalHeaders {
        if_match: header_value(headers, header::IF_MATCH),
        if_modified_since: header_value(headers, header::IF_MODIFIED_SINCE),
        if_none_match: header_value(headers, header::IF_NONE_MATCH),
        if_unmodified_since: header_value(headers, header::IF_UNMODIFIED_SINCE),
    }
}

async fn serve_asset(
    State(state): State<AppState>,
    ResolvedApplication(app): ResolvedApplication,
    Path((_, rest)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let (raw_version, file) = split_rest(&rest);
    if raw_version.is_empty() {
        return Err(ApiError::not_found());
    }

    let version = resolve_segment(&state, &app, raw_version).await?;

    let key = format!("{}/{}/{}", app.id, version, file);
    let object = state
        .objects
        .get_object(&state.config.bucket, &key, &conditional_headers(&headers))
        .await
        .map_err(|e| {
            tracing::debug!(app = %app.id, version = %version, key = %key, error = %e, "Asset fetch failed");
            ApiError::from(e)
        })?;

    let mut response = (StatusCode::OK, Body::from(object.body)).into_response();
    for (name, value) in object.metadata.headers() {
        if let Ok(value) = HeaderValue::from_str(value) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(name), value);
        }
    }
    Ok(response)
}
