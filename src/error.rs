//! Error types for the artifact cache
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
/// Unified error type for the artifact cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present in the storage backend
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Generator function failed; nothing was stored
    #[error("Generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    /// Backend write failed (disk full, permission denied, ...)
    #[error("Store failed for {key}: {reason}")]
    StoreFailure { key: String, reason: String },

    /// Purge request could not reach the accelerator or timed out
    #[error("Accelerator unreachable: {0}")]
    AcceleratorUnreachable(String),

    /// Accelerator answered with a non-success status
    #[error("Accelerator rejected {target} with status {status}")]
    AcceleratorRejected { target: String, status: u16 },

    /// Invalid request or configuration
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::AcceleratorUnreachable(_) | CacheError::AcceleratorRejected { .. } => {
                StatusCode::BAD_GATEWAY
            }
            CacheError::Generation(_)
            | CacheError::StoreFailure { .. }
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the artifact cache.
pub type Result<T> = std::result::Result<T, CacheError>;
