//! Health Check Endpoints
//!
//! - /health/live - Process alive check
//! - /health/ready - Catalog connectivity check, with cache statistics
//!
//! No authentication required for health endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use preview_storage::CacheStats;

use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealth {
    pub entries: u64,
    pub hit_rate: f64,
}

impl From<&CacheStats> for CacheHealth {
    fn from(stats: &CacheStats) -> Self {
        Self {
            entries: stats.entry_count,
            hit_rate: stats.hit_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applications: Option<CacheHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<CacheHealth>,
}

// ============================================================================
// HANDLERS
// ============================================================================

pub async fn liveness() -> impl IntoResponse {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        error: None,
        applications: None,
        versions: None,
    })
}

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.cache.stats();
    tracing::debug!(?stats, "Catalog cache statistics");

    let (status, code, error) = match state.store.health_check().await {
        Ok(()) => (HealthStatus::Healthy, StatusCode::OK, None),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                HealthStatus::Unhealthy,
                StatusCode::SERVICE_UNAVAILABLE,
                Some(e.to_string()),
            )
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            error,
            applications: Some(CacheHealth::from(&stats.applications)),
            versions: Some(CacheHealth::from(&stats.versions)),
        }),
    )
}
