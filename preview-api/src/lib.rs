//! Preview Gateway API - HTTP Layer
//!
//! Serves per-branch preview deployments out of an S3 bucket. Each
//! application keeps a catalog of versions with `current`, `previous` and
//! `latest` pointers; asset URLs may name a version directly or through one
//! of those aliases. The catalog lives in PostgreSQL behind a short-lived
//! read-through cache.
//!
//! Besides asset serving the crate exposes the catalog management API,
//! GitHub login and webhooks, and the Slack installation callback.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod macros;
pub mod middleware;
pub mod objects;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use auth::{issue_token, validate_token, AuthConfig, Claims, JwtSecret};
pub use config::{Environment, GatewayConfig, GithubConfig, LogFormat, SlackConfig};
pub use db::{DbConfig, PgCatalog};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use extractors::{CurrentUser, ResolvedApplication, ResolvedVersion};
pub use objects::S3Objects;
pub use routes::create_router;
pub use state::AppState;
