//! In-memory catalog store.
//!
//! Used for local development when no database is configured and as the
//! backing store in tests. Semantics match the PostgreSQL store: deleting an
//! application cascades to its versions, creating a version sets `latest`,
//! and duplicate keys are rejected with `Conflict`.

use std::collections::{BTreeMap, HashMap};

use ::async_trait::async_trait;
use preview_core::{
    Application, CatalogError, CatalogResult, ThirdPartyToken, User, Version,
};
use tokio::sync::RwLock;

use crate::catalog::CatalogStore;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, User>,
    apps: BTreeMap<String, Application>,
    versions: Vec<Version>,
    tokens: HashMap<String, ThirdPartyToken>,
    next_seq: i64,
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tables: RwLock<Tables>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-provisioned with the given users.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let tables = Tables {
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
            ..Default::default()
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Provision a user. Users are never created by login.
    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id.clone(), user);
    }

    pub async fn third_party_token(&self, team_id: &str) -> Option<ThirdPartyToken> {
        self.tables.read().await.tokens.get(team_id).cloned()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn query_user(&self, id: &str) -> CatalogResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn query_app(&self, id: &str) -> CatalogResult<Option<Application>> {
        Ok(self.tables.read().await.apps.get(id).cloned())
    }

    async fn query_apps(&self) -> CatalogResult<Vec<Application>> {
        Ok(self.tables.read().await.apps.values().cloned().collect())
    }

    async fn create_app(&self, id: &str, owner: &str, autoupdate: bool) -> CatalogResult<()> {
        let mut tables = self.tables.write().await;
        if tables.apps.contains_key(id) {
            return Err(CatalogError::conflict("Application", id));
        }
        tables
            .apps
            .insert(id.to_string(), Application::new(id, owner, autoupdate));
        Ok(())
    }

    async fn delete_app(&self, id: &str) -> CatalogResult<()> {
        let mut tables = self.tables.write().await;
        tables.apps.remove(id);
        tables.versions.retain(|v| v.app != id);
        Ok(())
    }

    async fn query_versions(&self, app_id: &str) -> CatalogResult<Vec<Version>> {
        let tables = self.tables.read().await;
        let mut versions: Vec<Version> = tables
            .versions
            .iter()
            .filter(|v| v.app == app_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(versions)
    }

    async fn query_version(
        &self,
        app_id: &str,
        version_id: &str,
    ) -> CatalogResult<Option<Version>> {
        let tables = self.tables.read().await;
        Ok(tables
            .versions
            .iter()
            .find(|v| v.app == app_id && v.id == version_id)
            .cloned())
    }

    async fn create_version(
        &self,
        app_id: &str,
        version_id: &str,
        owner: &str,
    ) -> CatalogResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.apps.contains_key(app_id) {
            return Err(CatalogError::backend(format!(
                "Application {app_id} does not exist"
            )));
        }
        if tables
            .versions
            .iter()
            .any(|v| v.app == app_id && v.id == version_id)
        {
            return Err(CatalogError::conflict("Version", version_id));
        }

        tables.next_seq += 1;
        let seq = tables.next_seq;
        tables
            .versions
            .push(Version::new(app_id, version_id, owner, seq));
        if let Some(app) = tables.apps.get_mut(app_id) {
            app.latest = Some(version_id.to_string());
        }
        Ok(())
    }

    async fn delete_version(&self, app_id: &str, version_id: &str) -> CatalogResult<()> {
        self.tables
            .write()
            .await
            .versions
            .retain(|v| !(v.app == app_id && v.id == version_id));
        Ok(())
    }

    async fn replace_version(
        &self,
        app_id: &str,
        previous_id: Option<&str>,
        new_id: &str,
    ) -> CatalogResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(app) = tables.apps.get_mut(app_id) {
            app.previous = previous_id.map(str::to_string);
            app.current = Some(new_id.to_string());
        }
        Ok(())
    }

    async fn upsert_third_party_token(&self, token: &ThirdPartyToken) -> CatalogResult<()> {
        self.tables
            .write()
            .await
            .tokens
            .insert(token.team_id.clone(), token.clone());
        Ok(())
    }

    async fn health_check(&self) -> CatalogResult<()> {
        Ok(())
    }
}
