//! Database Connection Pool Module
//!
//! PostgreSQL implementation of [`CatalogStore`] over a deadpool-postgres
//! connection pool. Each operation checks out one connection and returns
//! it to the pool when the operation finishes.

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, PoolConfig, PoolError, RecyclingMethod, Runtime};
use preview_core::{Application, CatalogError, CatalogResult, ThirdPartyToken, User, Version};
use preview_storage::CatalogStore;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use crate::error::{ApiError, ApiResult};

const SCHEMA: &str = include_str!("../sql/schema.sql");

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Clone)]
pub struct DbConfig {
    /// Connection URL. `None` selects the in-memory catalog.
    pub url: Option<String>,
    /// Maximum pool size
    pub max_size: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_size: 16,
        }
    }
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl DbConfig {
    /// Load from `DATABASE_URL` and `CFP_DB_POOL_SIZE`.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()),
            max_size: std::env::var("CFP_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let url = self
            .url
            .clone()
            .ok_or_else(|| ApiError::invalid_input("DATABASE_URL is not set"))?;

        let mut cfg = Config::new();
        cfg.url = Some(url);
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(self.max_size));

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn pool_error(err: PoolError) -> CatalogError {
    match err {
        PoolError::Timeout(_) => CatalogError::unavailable("timed out waiting for a connection"),
        PoolError::Closed => CatalogError::unavailable("connection pool is closed"),
        PoolError::Backend(e) => CatalogError::unavailable(e.to_string()),
        other => CatalogError::backend(other.to_string()),
    }
}

/// Map a query error, reporting a unique violation as a conflict on
/// `entity`/`id`.
fn query_error<'a>(
    entity: &'static str,
    id: &'a str,
) -> impl FnOnce(tokio_postgres::Error) -> CatalogError + 'a {
    move |err| {
        if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            CatalogError::conflict(entity, id)
        } else if err.is_closed() {
            CatalogError::unavailable(err.to_string())
        } else {
            CatalogError::backend(err.to_string())
        }
    }
}

fn plain_error(err: tokio_postgres::Error) -> CatalogError {
    if err.is_closed() {
        CatalogError::unavailable(err.to_string())
    } else {
        CatalogError::backend(err.to_string())
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn row_to_user(row: &Row) -> User {
    User {
        id: row.get("id"),
        avatar: row.get("avatar"),
        home: row.get("home"),
    }
}

fn row_to_application(row: &Row) -> Application {
    Application {
        id: row.get("id"),
        owner: row.get("owner"),
        current: row.get("current"),
        previous: row.get("previous"),
        latest: row.get("latest"),
        autoupdate: row.get("autoupdate"),
    }
}

fn row_to_version(row: &Row) -> Version {
    Version {
        id: row.get("id"),
        app: row.get("app"),
        owner: row.get("owner"),
        seq: row.get("seq"),
    }
}

const APP_COLUMNS: &str = r#"id, owner, "current", previous, latest, autoupdate"#;
const VERSION_COLUMNS: &str = "id, app, owner, seq";

// ============================================================================
// POSTGRES CATALOG
// ============================================================================

/// Catalog store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgCatalog {
    pool: Pool,
}

impl PgCatalog {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    async fn get_conn(&self) -> CatalogResult<Object> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Create any missing tables.
    pub async fn ensure_schema(&self) -> CatalogResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA).await.map_err(plain_error)
    }

    /// Current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    // ========================================================================
    // USERS
    // ========================================================================

    async fn query_user(&self, id: &str) -> CatalogResult<Option<User>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt("SELECT id, avatar, home FROM users WHERE id = $1", &[&id])
            .await
            .map_err(plain_error)?;
        Ok(row.as_ref().map(row_to_user))
    }

    // ========================================================================
    // APPLICATIONS
    // ========================================================================

    async fn query_app(&self, id: &str) -> CatalogResult<Option<Application>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM apps WHERE id = $1", APP_COLUMNS);
        let row = conn.query_opt(&sql, &[&id]).await.map_err(plain_error)?;
        Ok(row.as_ref().map(row_to_application))
    }

    async fn query_apps(&self) -> CatalogResult<Vec<Application>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM apps ORDER BY id", APP_COLUMNS);
        let rows = conn.query(&sql, &[]).await.map_err(plain_error)?;
        Ok(rows.iter().map(row_to_application).collect())
    }

    async fn create_app(&self, id: &str, owner: &str, autoupdate: bool) -> CatalogResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO apps (id, owner, autoupdate) VALUES ($1, $2, $3)",
            &[&id, &owner, &autoupdate],
        )
        .await
        .map_err(query_error("Application", id))?;
        Ok(())
    }

    async fn delete_app(&self, id: &str) -> CatalogResult<()> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(plain_error)?;
        tx.execute("DELETE FROM versions WHERE app = $1", &[&id])
            .await
            .map_err(plain_error)?;
        tx.execute("DELETE FROM apps WHERE id = $1", &[&id])
            .await
            .map_err(plain_error)?;
        tx.commit().await.map_err(plain_error)
    }

    // ========================================================================
    // VERSIONS
    // ========================================================================

    async fn query_versions(&self, app_id: &str) -> CatalogResult<Vec<Version>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM versions WHERE app = $1 ORDER BY seq DESC",
            VERSION_COLUMNS
        );
        let rows = conn.query(&sql, &[&app_id]).await.map_err(plain_error)?;
        Ok(rows.iter().map(row_to_version).collect())
    }

    async fn query_version(
        &self,
        app_id: &str,
        version_id: &str,
    ) -> CatalogResult<Option<Version>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM versions WHERE app = $1 AND id = $2",
            VERSION_COLUMNS
        );
        let row = conn
            .query_opt(&sql, &[&app_id, &version_id])
            .await
            .map_err(plain_error)?;
        Ok(row.as_ref().map(row_to_version))
    }

    async fn create_version(
        &self,
        app_id: &str,
        version_id: &str,
        owner: &str,
    ) -> CatalogResult<()> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(plain_error)?;
        tx.execute(
            "INSERT INTO versions (id, app, owner) VALUES ($1, $2, $3)",
            &[&version_id, &app_id, &owner],
        )
        .await
        .map_err(query_error("Version", version_id))?;
        tx.execute("UPDATE apps SET latest = $2 WHERE id = $1", &[&app_id, &version_id])
            .await
            .map_err(plain_error)?;
        tx.commit().await.map_err(plain_error)
    }

    async fn delete_version(&self, app_id: &str, version_id: &str) -> CatalogResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "DELETE FROM versions WHERE app = $1 AND id = $2",
            &[&app_id, &version_id],
        )
        .await
        .map_err(plain_error)?;
        Ok(())
    }

    async fn replace_version(
        &self,
        app_id: &str,
        previous_id: Option<&str>,
        new_id: &str,
    ) -> CatalogResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            r#"UPDATE apps SET previous = $2, "current" = $3 WHERE id = $1"#,
            &[&app_id, &previous_id, &new_id],
        )
        .await
        .map_err(plain_error)?;
        Ok(())
    }

    // ========================================================================
    // THIRD PARTY TOKENS
    // ========================================================================

    async fn upsert_third_party_token(&self, token: &ThirdPartyToken) -> CatalogResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO slack (teamid, accesstoken, scope, botid, botaccesstoken) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (teamid) DO UPDATE SET \
                 accesstoken = EXCLUDED.accesstoken, \
                 scope = EXCLUDED.scope, \
                 botid = EXCLUDED.botid, \
                 botaccesstoken = EXCLUDED.botaccesstoken",
            &[
                &token.team_id,
                &token.access_token,
                &token.scope,
                &token.bot_user_id,
                &token.bot_access_token,
            ],
        )
        .await
        .map_err(plain_error)?;
        Ok(())
    }

    async fn health_check(&self) -> CatalogResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(plain_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_url() {
        let config = DbConfig {
            url: Some("postgres://app:hunter2@db/previews".to_string()),
            max_size: 4,
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("max_size: 4"));
    }

    #[test]
    fn test_create_pool_requires_url() {
        let err = DbConfig::default().create_pool().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);
    }

    #[test]
    fn test_pool_closed_is_unavailable() {
        assert!(matches!(
            pool_error(PoolError::Closed),
            CatalogError::Unavailable { .. }
        ));
    }

    fn takes_mapper<F: FnOnce(tokio_postgres::Error) -> CatalogError>(_: F) {}

    #[test]
    fn test_query_error_borrows_request_id() {
        // The id comes from the request and only lives for the call.
        let id = format!("pr-{}", 42);
        takes_mapper(query_error("Application", &id));
        takes_mapper(query_error("Version", id.as_str()));
    }

    #[test]
    fn test_schema_declares_catalog_tables() {
        for table in ["users", "apps", "versions", "slack"] {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {} ", table)),
                "schema is missing {}",
                table
            );
        }
        assert!(SCHEMA.contains("seq     BIGSERIAL"));
    }
}
