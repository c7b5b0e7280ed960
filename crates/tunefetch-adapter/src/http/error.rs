/*
[INPUT]:  Error sources (HTTP transport, backend status codes, serialization, URLs)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the download backend adapter
#[derive(Error, Debug)]
pub enum AdapterError {
    /// HTTP request failed before a response arrived (connect, TLS, timeout)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Backend does not know the requested resource (404)
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Response arrived but could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AdapterError {
    /// Check if the error is transient and the call may succeed later
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::Http(_) | AdapterError::InvalidResponse(_) => true,
            AdapterError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Check if the backend reported the resource as unknown
    pub fn is_not_found(&self) -> bool {
        matches!(self, AdapterError::NotFound { .. })
            || matches!(self, AdapterError::Api { status: 404, .. })
    }

    /// Check if the backend rejected the request itself (4xx other than 404/429)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AdapterError::Api { status, .. } if (400..500).contains(status) && *status != 404 && *status != 429
        )
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        AdapterError::Api {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;
