//! Shared application state for Axum routers.

use std::sync::Arc;

use preview_storage::{CatalogCache, CatalogStore, ObjectRepository};

use crate::auth::AuthConfig;
use crate::config::GatewayConfig;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Catalog store, for writes and the uncached list/detail reads.
    pub store: Arc<dyn CatalogStore>,
    /// Read-through cache over `store`, for path resolution.
    pub cache: Arc<CatalogCache>,
    pub objects: Arc<dyn ObjectRepository>,
    pub auth: Arc<AuthConfig>,
    pub config: Arc<GatewayConfig>,
    /// Outbound client for OAuth code exchanges.
    pub http: reqwest::Client,
}

impl AppState {
    /// Build the state, fronting `store` with a cache configured from
    /// `config`.
    pub fn new(
        store: Arc<dyn CatalogStore>,
        objects: Arc<dyn ObjectRepository>,
        auth: AuthConfig,
        config: GatewayConfig,
    ) -> Self {
        let cache = Arc::new(CatalogCache::new(store.clone(), config.cache_config()));
        Self {
            store,
            cache,
            objects,
            auth: Arc::new(auth),
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }
}

crate::impl_from_ref!(Arc<dyn CatalogStore>, store);
crate::impl_from_ref!(Arc<CatalogCache>, cache);
crate::impl_from_ref!(Arc<dyn ObjectRepository>, objects);
crate::impl_from_ref!(Arc<AuthConfig>, auth);
crate::impl_from_ref!(Arc<GatewayConfig>, config);
