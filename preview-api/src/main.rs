//! Preview Gateway Server Entry Point
//!
//! Loads configuration, connects the catalog and object stores, and starts
//! the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use preview_api::{
    create_router, telemetry::init_tracing, ApiError, ApiResult, AppState, AuthConfig, DbConfig,
    GatewayConfig, LogFormat, PgCatalog, S3Objects,
};
use preview_core::User;
use preview_storage::{CatalogStore, InMemoryCatalog};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(LogFormat::from_env())?;

    let config = GatewayConfig::from_env();
    let auth = AuthConfig::from_env();
    auth.validate_for_production(config.environment)?;

    let store = connect_catalog(&config).await?;
    let objects = Arc::new(S3Objects::from_env().await);
    if config.bucket.is_empty() {
        tracing::warn!("CFP_AWS_BUCKET is not set; asset requests will fail");
    }

    let state = AppState::new(store, objects, auth, config);
    spawn_cache_janitor(&state);

    let app = create_router(state);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting preview gateway");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

/// PostgreSQL when `DATABASE_URL` is set, otherwise an in-memory catalog
/// holding `CFP_SEED_USERS`.
async fn connect_catalog(config: &GatewayConfig) -> ApiResult<Arc<dyn CatalogStore>> {
    let db_config = DbConfig::from_env();
    if db_config.url.is_some() {
        let catalog = PgCatalog::from_config(&db_config)?;
        catalog.ensure_schema().await?;
        catalog.health_check().await?;
        tracing::info!(pool_size = catalog.pool_size(), "Connected to PostgreSQL catalog");
        return Ok(Arc::new(catalog));
    }

    if config.environment.is_production() {
        return Err(ApiError::internal_error(
            "DATABASE_URL must be set in production",
        ));
    }

    tracing::warn!(
        users = config.seed_users.len(),
        "DATABASE_URL is not set; using an in-memory catalog"
    );
    Ok(Arc::new(InMemoryCatalog::with_users(
        config.seed_users.iter().cloned().map(User::new),
    )))
}

/// Periodically drop expired cache entries so removed applications do not
/// linger in memory.
fn spawn_cache_janitor(state: &AppState) {
    let cache = state.cache.clone();
    let period = state.config.cache_ttl.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, stats = ?cache.stats(), "Purged expired cache entries");
            }
        }
    });
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("CFP_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let port = port_str.parse::<u16>().map_err(|_| {
        ApiError::invalid_input(format!("Invalid port value: {}", port_str))
    })?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>().map_err(|e| {
        ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
    })
}
