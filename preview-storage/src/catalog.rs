//! Async catalog store trait.
//!
//! The catalog is the source of truth for applications and versions. Every
//! method maps to a single logical store operation; callers that cache
//! results are responsible for invalidating after the mutating ones.

use ::async_trait::async_trait;
use preview_core::{Application, CatalogResult, ThirdPartyToken, User, Version};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    // ========================================================================
    // USERS
    // ========================================================================

    /// Look up an authenticated user by identity-provider login.
    async fn query_user(&self, id: &str) -> CatalogResult<Option<User>>;

    // ========================================================================
    // APPLICATIONS
    // ========================================================================

    async fn query_app(&self, id: &str) -> CatalogResult<Option<Application>>;

    async fn query_apps(&self) -> CatalogResult<Vec<Application>>;

    /// Register a new application. Fails with `Conflict` if the id is taken.
    async fn create_app(&self, id: &str, owner: &str, autoupdate: bool) -> CatalogResult<()>;

    /// Delete an application and all of its versions.
    async fn delete_app(&self, id: &str) -> CatalogResult<()>;

    // ========================================================================
    // VERSIONS
    // ========================================================================

    /// All versions of an application, newest first.
    async fn query_versions(&self, app_id: &str) -> CatalogResult<Vec<Version>>;

    async fn query_version(&self, app_id: &str, version_id: &str)
        -> CatalogResult<Option<Version>>;

    /// Insert a version and record it as the application's `latest`.
    async fn create_version(&self, app_id: &str, version_id: &str, owner: &str)
        -> CatalogResult<()>;

    async fn delete_version(&self, app_id: &str, version_id: &str) -> CatalogResult<()>;

    /// Set `current := new_id` and `previous := previous_id`.
    async fn replace_version(
        &self,
        app_id: &str,
        previous_id: Option<&str>,
        new_id: &str,
    ) -> CatalogResult<()>;

    // ========================================================================
    // THIRD PARTY TOKENS
    // ========================================================================

    /// Insert or replace the grant stored for `token.team_id`.
    async fn upsert_third_party_token(&self, token: &ThirdPartyToken) -> CatalogResult<()>;

    /// Cheap round trip used by startup checks.
    async fn health_check(&self) -> CatalogResult<()>;
}
