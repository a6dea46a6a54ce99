//! Error types for the request cache
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the request cache and the gateway.
///
/// `Clone` is required because a single in-flight result is handed to every
/// caller that joined it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// Upstream answered with a non-success status
    #[error("Upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Upstream could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream call exceeded the configured timeout
    #[error("Upstream call timed out after {0:?}")]
    Timeout(Duration),

    /// Payload could not be parsed or did not match the requested type
    #[error("Decode error: {0}")]
    Decode(String),

    /// Snapshot could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns the upstream status code, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CacheError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            // Client errors from upstream pass through unchanged
            CacheError::Status { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|code| code.is_client_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            CacheError::Network(_) | CacheError::Decode(_) => StatusCode::BAD_GATEWAY,
            CacheError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Persistence(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the request cache.
pub type Result<T> = std::result::Result<T, CacheError>;
