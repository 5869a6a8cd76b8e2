//! Error types for catalog operations

use thiserror::Error;

/// Errors surfaced by a catalog store implementation.
///
/// "Not found" is deliberately absent: lookups return `Option` and an empty
/// result is a normal outcome, not a failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The store could not be reached (pool closed, connection refused).
    #[error("Catalog unavailable: {reason}")]
    Unavailable { reason: String },

    /// A row with the same key already exists.
    #[error("{entity} {id} already exists")]
    Conflict { entity: &'static str, id: String },

    /// Any other store failure.
    #[error("Catalog operation failed: {reason}")]
    Backend { reason: String },
}

impl CatalogError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn conflict(entity: &'static str, id: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            id: id.into(),
        }
    }

    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::conflict("Application", "pr-42");
        assert_eq!(err.to_string(), "Application pr-42 already exists");

        let err = CatalogError::unavailable("connection refused");
        assert!(err.to_string().contains("connection refused"));
    }
}
