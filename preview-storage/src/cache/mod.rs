//! TTL read-through cache for catalog reads.
//!
//! Two independent caches sit in front of the catalog store:
//! - applications, keyed by application id
//! - version lists, keyed by application id
//!
//! A cached "not found" is a real entry: it is served until it expires or
//! is invalidated, exactly like a found row. Mutating handlers call the
//! `invalidate_*` hooks after the store write succeeds, and a fill that
//! raced with an invalidation is discarded instead of resurrecting the old
//! value.
//!
//! # Example
//!
//! ```ignore
//! let cache = CatalogCache::new(store, CacheConfig::default());
//!
//! let app = cache.get_application("pr-42").await?;     // miss, store read
//! let app = cache.get_application("pr-42").await?;     // hit
//!
//! store.replace_version("pr-42", None, "abc123").await?;
//! cache.invalidate_application("pr-42");             // next read refetches
//! ```

pub mod read_through;
pub mod stats;
pub mod ttl;

pub use read_through::{CacheConfig, CatalogCache, CatalogCacheStats};
pub use stats::CacheStats;
pub use ttl::{FillToken, Lookup, TtlCache};
