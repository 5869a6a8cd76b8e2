//! Axum Middleware for Authentication and Response Hardening
//!
//! - `auth_middleware` runs on every request. A `Bearer` token must verify
//!   and name a known user, otherwise the request is rejected with 403.
//!   Requests without a token continue anonymously.
//! - `require_user` guards the `/api` tree: anonymous requests get 403.
//! - `security_headers` adds the browser hardening headers to every
//!   response.

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::auth::{bearer_token, validate_token};
use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::state::AppState;

// ============================================================================
// AUTHENTICATION
// ============================================================================

/// Authenticate the request if it carries a bearer token.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
///     .with_state(state);
/// ```
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned);

    if let Some(token) = token {
        let claims = validate_token(&state.auth, &token)?;
        let user = state.store.query_user(&claims.sub).await?.ok_or_else(|| {
            tracing::info!(user = %claims.sub, "Token subject is not a known user");
            ApiError::forbidden()
        })?;
        request.extensions_mut().insert(CurrentUser(user));
    }

    Ok(next.run(request).await)
}

/// Reject anonymous requests with 403.
pub async fn require_user(request: Request, next: Next) -> Result<Response, ApiError> {
    if request.extensions().get::<CurrentUser>().is_none() {
        return Err(ApiError::forbidden());
    }
    Ok(next.run(request).await)
}

// ============================================================================
// SECURITY HEADERS
// ============================================================================

const HSTS: &str = "max-age=15552000; includeSubDomains";

/// Add the hardening headers; `Strict-Transport-Security` only in
/// production.
pub async fn security_headers(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    headers.insert(
        HeaderName::from_static("x-download-options"),
        HeaderValue::from_static("noopen"),
    );
    if state.config.environment.is_production() {
        headers.insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS));
    }

    response
}
