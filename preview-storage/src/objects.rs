//! Object repository abstraction.
//!
//! Static artifacts live in a key-addressed blob store under
//! `application/version/path`. The gateway forwards the client's
//! conditional request headers and mirrors a fixed set of response headers
//! back; everything else about the store is opaque.

use std::collections::HashMap;

use ::async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

/// Conditional request headers forwarded verbatim to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalHeaders {
    pub if_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub if_none_match: Option<String>,
    pub if_unmodified_since: Option<String>,
}

/// Response metadata mirrored back to the client when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub last_modified: Option<String>,
    pub etag: Option<String>,
    pub cache_control: Option<String>,
    pub expires: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,
}

impl ObjectMetadata {
    /// `(header-name, value)` pairs for every field that is set.
    pub fn headers(&self) -> Vec<(&'static str, &str)> {
        [
            ("last-modified", &self.last_modified),
            ("etag", &self.etag),
            ("cache-control", &self.cache_control),
            ("expires", &self.expires),
            ("content-disposition", &self.content_disposition),
            ("content-encoding", &self.content_encoding),
            ("content-language", &self.content_language),
            ("content-type", &self.content_type),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredObject {
    pub metadata: ObjectMetadata,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ObjectError {
    #[error("Access denied")]
    AccessDenied,

    #[error("Not modified")]
    NotModified,

    #[error("No object stored under {key}")]
    NotFound { key: String },

    #[error("Object store error: {0}")]
    Backend(String),
}

// ============================================================================
// REPOSITORY TRAIT
// ============================================================================

#[async_trait]
pub trait ObjectRepository: Send + Sync {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        conditions: &ConditionalHeaders,
    ) -> Result<StoredObject, ObjectError>;
}

// ============================================================================
// IN-MEMORY REPOSITORY
// ============================================================================

/// In-memory object store.
///
/// Honors `If-None-Match` and `If-Match` against the stored ETag. Date
/// preconditions are accepted but not evaluated.
#[derive(Debug, Default)]
pub struct InMemoryObjects {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    denied: RwLock<Vec<(String, String)>>,
}

impl InMemoryObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, bucket: &str, key: &str, object: StoredObject) {
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), object);
    }

    /// Make every read of `bucket/key` fail with `AccessDenied`.
    pub async fn deny(&self, bucket: &str, key: &str) {
        self.denied
            .write()
            .await
            .push((bucket.to_string(), key.to_string()));
    }
}

#[async_trait]
impl ObjectRepository for InMemoryObjects {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        conditions: &ConditionalHeaders,
    ) -> Result<StoredObject, ObjectError> {
        let address = (bucket.to_string(), key.to_string());
        if self.denied.read().await.contains(&address) {
            return Err(ObjectError::AccessDenied);
        }

        let objects = self.objects.read().await;
        let Some(object) = objects.get(&address) else {
            return Err(ObjectError::NotFound {
                key: key.to_string(),
            });
        };

        let etag = object.metadata.etag.as_deref();
        if let Some(expected) = conditions.if_match.as_deref() {
            if etag != Some(expected) {
                return Err(ObjectError::Backend("PreconditionFailed".to_string()));
            }
        }
        if let Some(seen) = conditions.if_none_match.as_deref() {
            if etag == Some(seen) {
                return Err(ObjectError::NotModified);
            }
        }

        Ok(object.clone())
    }
}
