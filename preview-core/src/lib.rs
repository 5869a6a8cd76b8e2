//! Preview Gateway Core - Catalog Types
//!
//! Pure data structures shared by the storage and API crates: the
//! application/version catalog entities, the symbolic version tokens and
//! the catalog error taxonomy. Nothing in here performs I/O.

pub mod entities;
pub mod error;
pub mod version;

pub use entities::{AppId, Application, ThirdPartyToken, User, UserId, Version, VersionId};
pub use error::{CatalogError, CatalogResult};
pub use version::VersionToken;
