//! Preview Gateway Storage - Catalog, Cache and Object Traits
//!
//! Defines the storage abstractions the API layer is built on:
//! - [`CatalogStore`]: CRUD over applications, versions, users and
//!   third-party tokens, with an in-memory implementation. The PostgreSQL
//!   implementation lives in preview-api.
//! - [`CatalogCache`]: the TTL read-through cache in front of the two hot
//!   catalog reads (application-by-id, versions-by-app).
//! - [`resolve_version`]: maps `current`/`previous`/`latest`/literal tokens
//!   to a concrete version id through the cache.
//! - [`ObjectRepository`]: key-addressed blob fetch with conditional
//!   request support.

pub mod cache;
pub mod catalog;
pub mod memory;
pub mod objects;
pub mod resolver;

pub use cache::{CacheConfig, CacheStats, CatalogCache, CatalogCacheStats, FillToken, Lookup, TtlCache};
pub use catalog::CatalogStore;
pub use memory::InMemoryCatalog;
pub use objects::{
    ConditionalHeaders, InMemoryObjects, ObjectError, ObjectMetadata, ObjectRepository,
    StoredObject,
};
pub use resolver::resolve_version;
