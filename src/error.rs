use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Unified error type for the Nodecast application
#[derive(Error, Debug)]
pub enum CastError {
    // Authentication errors
    #[error("Unauthorized: Invalid API Key")]
    InvalidApiKey,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Nodecast operations
pub type Result<T> = std::result::Result<T, CastError>;

impl CastError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            CastError::InvalidRequest(_) | CastError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            CastError::InvalidApiKey => StatusCode::UNAUTHORIZED,

            // 502 Bad Gateway
            CastError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            CastError::Io(_) | CastError::MissingEnvVar(_) | CastError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// Implement IntoResponse for API error responses
impl IntoResponse for CastError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self);
        }
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
