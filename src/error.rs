//! Error types for the record cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the record cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Requested key or store does not exist
    #[error("{0}")]
    NotFound(String),

    /// Caller supplied an invalid argument (bad duration, unit, store name or version)
    #[error("{0}")]
    InvalidValue(String),

    /// Data-consistency problem: null or stale value where none is allowed,
    /// failed write, invalid merge target
    #[error("{message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<CacheError>>,
    },

    /// Failure reported by a storage backend
    #[error("backend error: {0}")]
    Backend(String),

    /// Value could not be converted to or from its stored form
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Builds a storage error without an underlying cause.
    pub fn storage(message: impl Into<String>) -> Self {
        CacheError::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a storage error wrapping the error that caused it.
    pub fn storage_caused_by(message: impl Into<String>, source: CacheError) -> Self {
        CacheError::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true for caller-side argument errors.
    pub fn is_invalid_value(&self) -> bool {
        matches!(self, CacheError::InvalidValue(_))
    }

    /// Returns true for storage consistency errors.
    pub fn is_storage(&self) -> bool {
        matches!(self, CacheError::Storage { .. })
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Backend(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            CacheError::Storage { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the record cache.
pub type Result<T> = std::result::Result<T, CacheError>;
