//! Error types for beacon-gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(#[from] beacon_transport::TransportError),

    /// HTTP client construction error
    #[error("Client error: {0}")]
    Client(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No live instance for the requested function
    #[error("No instances registered for function {0}")]
    NoInstances(String),

    /// Registry query failed
    #[error("Registry lookup failed: {0}")]
    Registry(String),

    /// Forward to the selected instance failed
    #[error("Forward failed: {0}")]
    Forward(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::NoInstances(_) => (StatusCode::NOT_FOUND, "NO_INSTANCES"),
            ApiError::Registry(_) => (StatusCode::INTERNAL_SERVER_ERROR, "REGISTRY_LOOKUP_FAILED"),
            ApiError::Forward(_) => (StatusCode::BAD_GATEWAY, "FORWARD_FAILED"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
