//! Error Types for the Preview Gateway API
//!
//! This module defines error handling for the HTTP layer, including:
//! - ApiError struct carrying a code and a client-facing message
//! - ErrorCode enum mapping each failure category to a status code
//! - IntoResponse implementation for Axum HTTP responses
//!
//! Not-found, forbidden and unknown-event responses have an empty body; every
//! other error is serialized as `{"error": message}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use preview_core::CatalogError;
use preview_storage::ObjectError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Client Errors
    // ========================================================================
    /// Application, version or asset does not exist
    NotFound,

    /// Missing or rejected credentials
    Forbidden,

    /// Request contains invalid input data
    InvalidInput,

    /// Entity with the same identifier already exists
    EntityAlreadyExists,

    /// Promotion target is already the current version
    AlreadyCurrent,

    /// Webhook signature header missing or wrong
    SignatureMismatch,

    /// Conditional request matched; client copy is fresh
    NotModified,

    /// Webhook event type is not handled
    UnknownEvent,

    // ========================================================================
    // Server Errors
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Database operation failed
    DatabaseError,

    /// Object storage operation failed
    StorageError,

    /// Service is temporarily unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::InvalidInput
            | ErrorCode::EntityAlreadyExists
            | ErrorCode::AlreadyCurrent
            | ErrorCode::SignatureMismatch => StatusCode::BAD_REQUEST,

            ErrorCode::NotModified => StatusCode::NOT_MODIFIED,
            ErrorCode::UnknownEvent => StatusCode::NOT_IMPLEMENTED,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::InternalError
            | ErrorCode::DatabaseError
            | ErrorCode::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "Not found",
            ErrorCode::Forbidden => "Access forbidden",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::EntityAlreadyExists => "Entity already exists",
            ErrorCode::AlreadyCurrent => "Version is already current",
            ErrorCode::SignatureMismatch => "Wrong GitHub signature",
            ErrorCode::NotModified => "Not modified",
            ErrorCode::UnknownEvent => "Unknown event",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::StorageError => "Object storage operation failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
        }
    }

    /// Whether responses with this code carry a `{"error"}` body.
    pub fn has_body(&self) -> bool {
        !matches!(
            self,
            ErrorCode::NotFound
                | ErrorCode::Forbidden
                | ErrorCode::NotModified
                | ErrorCode::UnknownEvent
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error for API operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn not_found() -> Self {
        Self::from_code(ErrorCode::NotFound)
    }

    pub fn forbidden() -> Self {
        Self::from_code(ErrorCode::Forbidden)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn entity_already_exists(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityAlreadyExists,
            format!("{} {} already exists", entity_type, id),
        )
    }

    pub fn already_current(version: impl fmt::Display) -> Self {
        Self::new(ErrorCode::AlreadyCurrent, format!("{} is already current", version))
    }

    pub fn signature_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SignatureMismatch, message)
    }

    pub fn not_modified() -> Self {
        Self::from_code(ErrorCode::NotModified)
    }

    pub fn unknown_event(event: &str) -> Self {
        Self::new(ErrorCode::UnknownEvent, format!("Unknown event {}", event))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.code.has_body() {
            (status, Json(serde_json::json!({ "error": self.message }))).into_response()
        } else {
            status.into_response()
        }
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN AND STANDARD ERRORS
// ============================================================================

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Conflict { entity, id } => ApiError::entity_already_exists(entity, id),
            CatalogError::Unavailable { reason } => {
                tracing::error!(%reason, "Catalog unavailable");
                ApiError::service_unavailable("Catalog unavailable")
            }
            CatalogError::Backend { reason } => {
                tracing::error!(%reason, "Catalog operation failed");
                ApiError::database_error("Database operation failed")
            }
        }
    }
}

impl From<ObjectError> for ApiError {
    fn from(err: ObjectError) -> Self {
        match err {
            ObjectError::AccessDenied => ApiError::forbidden(),
            ObjectError::NotModified => ApiError::not_modified(),
            other => {
                tracing::warn!(error = %other, "Object fetch failed");
                ApiError::storage_error(other.to_string())
            }
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
