//! Internal error types for registry operations.
//!
//! These errors are internal to `craftdock-registry` and are mapped to
//! the core port error at the client boundary.

use craftdock_core::RegistryPortError;
use thiserror::Error;

/// Result type alias for internal registry operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors related to registry API operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// API request failed with an HTTP error status.
    #[error("registry request failed with status {status}: {url}")]
    ApiRequestFailed {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// The requested package or version was not found.
    #[error("'{id}' not found in the registry")]
    NotFound {
        /// The package or version id
        id: String,
    },

    /// API returned an invalid or unexpected response.
    #[error("invalid response from registry: {message}")]
    InvalidResponse {
        /// Description of what was invalid
        message: String,
    },

    /// Network or HTTP client error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl From<ClientError> for RegistryPortError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound { id } => Self::NotFound { id },
            ClientError::ApiRequestFailed { status, .. } => Self::RequestFailed { status },
            ClientError::Network(e) => Self::Network {
                message: e.to_string(),
            },
            ClientError::InvalidUrl(e) => Self::InvalidResponse {
                message: e.to_string(),
            },
            ClientError::InvalidResponse { message } => Self::InvalidResponse { message },
            ClientError::JsonParse(e) => Self::InvalidResponse {
                message: e.to_string(),
            },
        }
    }
}
