//! Read-through catalog cache.
//!
//! Routes the hot catalog reads through [`TtlCache`]s and falls back to the
//! [`CatalogStore`] on a miss. Store errors are returned as-is and never
//! cached.

use std::sync::Arc;
use std::time::Duration;

use preview_core::{Application, CatalogResult, Version};

use super::stats::CacheStats;
use super::ttl::{Lookup, TtlCache};
use crate::catalog::CatalogStore;

/// Configuration for the catalog cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached application records.
    pub application_ttl: Duration,
    /// TTL for cached version lists.
    pub versions_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            application_ttl: Duration::from_secs(60),
            versions_ttl: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL for both caches.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.application_ttl = ttl;
        self.versions_ttl = ttl;
        self
    }

    pub fn with_application_ttl(mut self, ttl: Duration) -> Self {
        self.application_ttl = ttl;
        self
    }

    pub fn with_versions_ttl(mut self, ttl: Duration) -> Self {
        self.versions_ttl = ttl;
        self
    }
}

/// Statistics for both catalog caches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogCacheStats {
    pub applications: CacheStats,
    pub versions: CacheStats,
}

/// Read-through cache over a catalog store.
///
/// One instance is shared by every request handler in the process.
pub struct CatalogCache {
    store: Arc<dyn CatalogStore>,
    applications: TtlCache<Option<Application>>,
    versions: TtlCache<Arc<Vec<Version>>>,
}

impl CatalogCache {
    pub fn new(store: Arc<dyn CatalogStore>, config: CacheConfig) -> Self {
        Self {
            store,
            applications: TtlCache::new(config.application_ttl),
            versions: TtlCache::new(config.versions_ttl),
        }
    }

    /// The store this cache reads through to. Mutations go here directly.
    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Application by id. `None` (not found) is cached like a found row.
    pub async fn get_application(&self, id: &str) -> CatalogResult<Option<Application>> {
        let token = match self.applications.lookup(id) {
            Lookup::Hit(app) => return Ok(app),
            Lookup::Miss(token) => token,
        };
        let app = self.store.query_app(id).await?;
        self.applications.fill(id, app.clone(), token);
        Ok(app)
    }

    /// All versions of an application, newest first. An empty list is cached.
    pub async fn get_versions(&self, app_id: &str) -> CatalogResult<Arc<Vec<Version>>> {
        let token = match self.versions.lookup(app_id) {
            Lookup::Hit(versions) => return Ok(versions),
            Lookup::Miss(token) => token,
        };
        let versions = Arc::new(self.store.query_versions(app_id).await?);
        self.versions.fill(app_id, Arc::clone(&versions), token);
        Ok(versions)
    }

    /// One version of an application, answered from the cached version list.
    pub async fn get_version(
        &self,
        app_id: &str,
        version_id: &str,
    ) -> CatalogResult<Option<Version>> {
        let versions = self.get_versions(app_id).await?;
        Ok(versions.iter().find(|v| v.id == version_id).cloned())
    }

    pub fn invalidate_application(&self, id: &str) {
        if self.applications.invalidate(id) {
            tracing::debug!(app = %id, "Invalidated cached application");
        }
    }

    pub fn invalidate_versions(&self, app_id: &str) {
        if self.versions.invalidate(app_id) {
            tracing::debug!(app = %app_id, "Invalidated cached versions");
        }
    }

    /// Drop expired entries from both caches.
    pub fn purge_expired(&self) -> usize {
        self.applications.purge_expired() + self.versions.purge_expired()
    }

    pub fn stats(&self) -> CatalogCacheStats {
        CatalogCacheStats {
            applications: self.applications.stats(),
            versions: self.versions.stats(),
        }
    }
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("application_ttl", &self.applications.ttl())
            .field("versions_ttl", &self.versions.ttl())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCatalog;

    async fn seeded() -> (Arc<InMemoryCatalog>, CatalogCache) {
        let store = Arc::new(InMemoryCatalog::new());
        store.create_app("pr-42", "octocat", false).await.unwrap();
        store.create_version("pr-42", "abc123", "octocat").await.unwrap();
        let cache = CatalogCache::new(store.clone(), CacheConfig::default());
        (store, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_application_served_from_cache_until_ttl() {
        let (store, cache) = seeded().await;

        let first = cache.get_application("pr-42").await.unwrap().unwrap();
        assert_eq!(first.current, None);

        // Direct store write without invalidation: the cache keeps serving the old row.
        store.replace_version("pr-42", None, "abc123").await.unwrap();
        let cached = cache.get_application("pr-42").await.unwrap().unwrap();
        assert_eq!(cached.current, None);

        tokio::time::advance(Duration::from_secs(61)).await;
        let refreshed = cache.get_application("pr-42").await.unwrap().unwrap();
        assert_eq!(refreshed.current.as_deref(), Some("abc123"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_application_forces_refetch() {
        let (store, cache) = seeded().await;
        cache.get_application("pr-42").await.unwrap();

        store.replace_version("pr-42", None, "abc123").await.unwrap();
        cache.invalidate_application("pr-42");

        let app = cache.get_application("pr-42").await.unwrap().unwrap();
        assert_eq!(app.current.as_deref(), Some("abc123"));
        assert_eq!(cache.stats().applications.invalidations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_cached() {
        let (store, cache) = seeded().await;
        assert!(cache.get_application("ghost").await.unwrap().is_none());

        store.create_app("ghost", "octocat", false).await.unwrap();
        assert!(cache.get_application("ghost").await.unwrap().is_none());

        cache.invalidate_application("ghost");
        assert!(cache.get_application("ghost").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_version_uses_version_list() {
        let (store, cache) = seeded().await;

        let version = cache.get_version("pr-42", "abc123").await.unwrap();
        assert_eq!(version.map(|v| v.owner), Some("octocat".to_string()));
        assert!(cache.get_version("pr-42", "nope").await.unwrap().is_none());

        store.create_version("pr-42", "def456", "octocat").await.unwrap();
        assert!(cache.get_version("pr-42", "def456").await.unwrap().is_none());

        cache.invalidate_versions("pr-42");
        let versions = cache.get_versions("pr-42").await.unwrap();
        assert_eq!(versions[0].id, "def456");
        assert_eq!(versions[1].id, "abc123");

        let stats = cache.stats().versions;
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidations_are_independent() {
        let (store, cache) = seeded().await;
        cache.get_application("pr-42").await.unwrap();
        cache.get_versions("pr-42").await.unwrap();

        store.create_version("pr-42", "def456", "octocat").await.unwrap();
        cache.invalidate_versions("pr-42");

        // Application entry is untouched and still reports the old latest.
        let app = cache.get_application("pr-42").await.unwrap().unwrap();
        assert_eq!(app.latest.as_deref(), Some("abc123"));
        assert_eq!(cache.get_versions("pr-42").await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_counts_both_caches() {
        let (_store, cache) = seeded().await;
        cache.get_application("pr-42").await.unwrap();
        cache.get_versions("pr-42").await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.stats().applications.entry_count, 0);
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new()
            .with_ttl(Duration::from_secs(30))
            .with_versions_ttl(Duration::from_secs(10));

        assert_eq!(config.application_ttl, Duration::from_secs(30));
        assert_eq!(config.versions_ttl, Duration::from_secs(10));
        assert_eq!(CacheConfig::default().application_ttl, Duration::from_secs(60));
    }
}
