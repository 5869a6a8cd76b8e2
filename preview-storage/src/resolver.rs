//! Version token resolution.

use preview_core::{Application, CatalogResult, VersionId, VersionToken};

use crate::cache::CatalogCache;

/// Resolve `token` against `app` to a version id that exists in the catalog.
///
/// Aliases read the matching field of the application record; a literal is
/// taken as-is. In both cases the id must appear in the application's
/// (cached) version list, otherwise the result is `None`.
pub async fn resolve_version(
    cache: &CatalogCache,
    app: &Application,
    token: &VersionToken,
) -> CatalogResult<Option<VersionId>> {
    let Some(candidate) = token.candidate(app) else {
        tracing::debug!(app = %app.id, token = %token, "Version alias is unset");
        return Ok(None);
    };
    let version = cache.get_version(&app.id, candidate).await?;
    Ok(version.map(|v| v.id))
}
