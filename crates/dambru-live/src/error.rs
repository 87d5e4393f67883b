//! Internal error types for the live transport and search client.
//!
//! These errors are internal to `dambru-live` and are mapped to core port
//! errors at the boundary.

use dambru_core::{LivePortError, SearchPortError};
use thiserror::Error;

/// Result type alias for live operations.
pub type LiveResult<T> = Result<T, LiveError>;

/// Errors related to the Gemini endpoints.
#[derive(Debug, Error)]
pub enum LiveError {
    /// No API key was configured.
    #[error("No Gemini API key configured")]
    MissingApiKey,

    /// The transport must be created inside a tokio runtime.
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// API request failed with an HTTP error status.
    #[error("Gemini API request failed with status {status}: {message}")]
    ApiRequestFailed {
        /// HTTP status code
        status: u16,
        /// Error body returned by the API, if any
        message: String,
    },

    /// API returned an invalid or unexpected response.
    #[error("Invalid response from Gemini API: {message}")]
    InvalidResponse {
        /// Description of what was invalid
        message: String,
    },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON encoding or parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<LiveError> for LivePortError {
    fn from(err: LiveError) -> Self {
        match err {
            LiveError::MissingApiKey => Self::MissingApiKey,
            LiveError::InvalidUrl(e) => Self::InvalidConfig(e.to_string()),
            LiveError::NoRuntime(message) => Self::InvalidConfig(message),
            other => Self::Connect(other.to_string()),
        }
    }
}

impl From<LiveError> for SearchPortError {
    fn from(err: LiveError) -> Self {
        match err {
            LiveError::MissingApiKey => Self::MissingApiKey,
            LiveError::InvalidResponse { message } => Self::InvalidResponse(message),
            LiveError::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::Request(other.to_string()),
        }
    }
}
