//! Preview Gateway Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Store wrappers that count or fail catalog queries
//! - Proptest generators for catalog entities
//! - Fixtures for common catalog states
//! - Assertions over catalog results

pub use preview_core::{
    Application, CatalogError, CatalogResult, ThirdPartyToken, User, Version, VersionToken,
};
pub use preview_storage::{CatalogStore, InMemoryCatalog};

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

// ============================================================================
// STORE WRAPPERS
// ============================================================================

/// Wraps an [`InMemoryCatalog`] and counts the reads the cache fronts.
#[derive(Debug, Default)]
pub struct CountingCatalog {
    inner: InMemoryCatalog,
    app_queries: AtomicUsize,
    versions_queries: AtomicUsize,
}

impl CountingCatalog {
    pub fn new(inner: InMemoryCatalog) -> Self {
        Self {
            inner,
            app_queries: AtomicUsize::new(0),
            versions_queries: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &InMemoryCatalog {
        &self.inner
    }

    /// Number of `query_app` calls so far.
    pub fn app_queries(&self) -> usize {
        self.app_queries.load(Ordering::SeqCst)
    }

    /// Number of `query_versions` calls so far.
    pub fn versions_queries(&self) -> usize {
        self.versions_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for CountingCatalog {
    async fn query_user(&self, id: &str) -> CatalogResult<Option<User>> {
        self.inner.query_user(id).await
    }

    async fn query_app(&self, id: &str) -> CatalogResult<Option<Application>> {
        self.app_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_app(id).await
    }

    async fn query_apps(&self) -> CatalogResult<Vec<Application>> {
        self.inner.query_apps().await
    }

    async fn create_app(&self, id: &str, owner: &str, autoupdate: bool) -> CatalogResult<()> {
        self.inner.create_app(id, owner, autoupdate).await
    }

    async fn delete_app(&self, id: &str) -> CatalogResult<()> {
        self.inner.delete_app(id).await
    }

    async fn query_versions(&self, app_id: &str) -> CatalogResult<Vec<Version>> {
        self.versions_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_versions(app_id).await
    }

    async fn query_version(
        &self,
        app_id: &str,
        version_id: &str,
    ) -> CatalogResult<Option<Version>> {
        self.inner.query_version(app_id, version_id).await
    }

    async fn create_version(
        &self,
        app_id: &str,
        version_id: &str,
        owner: &str,
    ) -> CatalogResult<()> {
        self.inner.create_version(app_id, version_id, owner).await
    }

    async fn delete_version(&self, app_id: &str, version_id: &str) -> CatalogResult<()> {
        self.inner.delete_version(app_id, version_id).await
    }

    async fn replace_version(
        &self,
        app_id: &str,
        previous_id: Option<&str>,
        new_id: &str,
    ) -> CatalogResult<()> {
        self.inner.replace_version(app_id, previous_id, new_id).await
    }

    async fn upsert_third_party_token(&self, token: &ThirdPartyToken) -> CatalogResult<()> {
        self.inner.upsert_third_party_token(token).await
    }

    async fn health_check(&self) -> CatalogResult<()> {
        self.inner.health_check().await
    }
}

/// A store whose every operation fails with the same error.
#[derive(Debug, Clone)]
pub struct FailingCatalog {
    error: CatalogError,
}

impl FailingCatalog {
    /// Every call fails as if the database refused connections.
    pub fn unavailable() -> Self {
        Self {
            error: CatalogError::unavailable("connection refused"),
        }
    }

    /// Every call fails with a backend error carrying `reason`.
    pub fn backend(reason: &str) -> Self {
        Self {
            error: CatalogError::backend(reason),
        }
    }

    fn fail<T>(&self) -> CatalogResult<T> {
        Err(self.error.clone())
    }
}

#[async_trait]
impl CatalogStore for FailingCatalog {
    async fn query_user(&self, _id: &str) -> CatalogResult<Option<User>> {
        self.fail()
    }

    async fn query_app(&self, _id: &str) -> CatalogResult<Option<Application>> {
        self.fail()
    }

    async fn query_apps(&self) -> CatalogResult<Vec<Application>> {
        self.fail()
    }

    async fn create_app(&self, _id: &str, _owner: &str, _autoupdate: bool) -> CatalogResult<()> {
        self.fail()
    }

    async fn delete_app(&self, _id: &str) -> CatalogResult<()> {
        self.fail()
    }

    async fn query_versions(&self, _app_id: &str) -> CatalogResult<Vec<Version>> {
        self.fail()
    }

    async fn query_version(&self, _app_id: &str, _version_id: &str) -> CatalogResult<Option<Version>> {
        self.fail()
    }

    async fn create_version(&self, _app_id: &str, _version_id: &str, _owner: &str) -> CatalogResult<()> {
        self.fail()
    }

    async fn delete_version(&self, _app_id: &str, _version_id: &str) -> CatalogResult<()> {
        self.fail()
    }

    async fn replace_version(
        &self,
        _app_id: &str,
        _previous_id: Option<&str>,
        _new_id: &str,
    ) -> CatalogResult<()> {
        self.fail()
    }

    async fn upsert_third_party_token(&self, _token: &ThirdPartyToken) -> CatalogResult<()> {
        self.fail()
    }

    async fn health_check(&self) -> CatalogResult<()> {
        self.fail()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for catalog entities.

    use super::*;
    use proptest::prelude::*;

    /// Branch-like application id.
    pub fn arb_app_id() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,15}"
    }

    /// Revision-hash-like version id.
    pub fn arb_version_id() -> impl Strategy<Value = String> {
        "[a-f0-9]{7,40}"
    }

    /// Identity-provider login.
    pub fn arb_login() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{2,12}"
    }

    /// Any version path segment, alias or literal.
    pub fn arb_version_token() -> impl Strategy<Value = VersionToken> {
        prop_oneof![
            Just(VersionToken::Current),
            Just(VersionToken::Previous),
            Just(VersionToken::Latest),
            arb_version_id().prop_map(VersionToken::Literal),
        ]
    }

    pub fn arb_application() -> impl Strategy<Value = Application> {
        (
            arb_app_id(),
            arb_login(),
            prop::option::of(arb_version_id()),
            prop::option::of(arb_version_id()),
            prop::option::of(arb_version_id()),
            any::<bool>(),
        )
            .prop_map(|(id, owner, current, previous, latest, autoupdate)| Application {
                id,
                owner,
                current,
                previous,
                latest,
                autoupdate,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built catalog states for common scenarios.

    use super::*;

    /// The login every fixture is owned by.
    pub const OWNER: &str = "octocat";

    pub fn owner() -> User {
        User {
            id: OWNER.to_string(),
            avatar: Some("https://avatars.githubusercontent.com/u/583231".to_string()),
            home: Some("https://github.com/octocat".to_string()),
        }
    }

    /// A catalog containing only the fixture owner.
    pub fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::with_users([owner()])
    }

    /// A catalog where `app` has the given versions, created in order, and
    /// `current` promoted if provided.
    pub async fn catalog_with_app(
        app: &str,
        autoupdate: bool,
        versions: &[&str],
        current: Option<&str>,
    ) -> CatalogResult<InMemoryCatalog> {
        let store = catalog();
        store.create_app(app, OWNER, autoupdate).await?;
        for version in versions {
            store.create_version(app, version, OWNER).await?;
        }
        if let Some(current) = current {
            store.replace_version(app, None, current).await?;
        }
        Ok(store)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over catalog results.

    use super::*;

    /// Assert that a CatalogResult is a Conflict for `entity`.
    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &CatalogResult<T>, entity: &str) {
        match result {
            Err(CatalogError::Conflict { entity: e, .. }) => {
                assert_eq!(*e, entity, "Wrong entity in Conflict error");
            }
            other => panic!("Expected Conflict for {entity}, got: {other:?}"),
        }
    }

    /// Assert that `app` currently serves `current` with `previous` behind it.
    #[track_caller]
    pub fn assert_promoted(app: &Application, current: &str, previous: Option<&str>) {
        assert_eq!(app.current.as_deref(), Some(current), "current mismatch");
        assert_eq!(app.previous.as_deref(), previous, "previous mismatch");
    }
}
