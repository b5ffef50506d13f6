//! Error types for the generation client.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when calling the generative content APIs.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse a response.
    #[error("parse error: {0}")]
    Parse(String),

    /// The API returned no usable content.
    #[error("generation returned no {0}")]
    EmptyResult(&'static str),

    /// The client is misconfigured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GenerationError {
    /// Whether retrying the same request may succeed.
    ///
    /// Rate limits, server errors and transport failures are transient;
    /// client errors and unparseable responses are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Unauthorized(_) | Self::Parse(_) | Self::EmptyResult(_) | Self::Config(_) => {
                false
            }
        }
    }
}

/// Error body returned by the generation API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    /// Nested error details.
    pub error: ApiError,
}

/// Nested error details.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    /// Error message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::RateLimited(30);
        assert_eq!(err.to_string(), "rate limited, retry after 30 seconds");

        let err = GenerationError::Api {
            status: 400,
            message: "prompt too long".to_string(),
        };
        assert_eq!(err.to_string(), "API error (400): prompt too long");
    }

    #[test]
    fn test_transient_classification() {
        assert!(GenerationError::RateLimited(1).is_transient());
        assert!(
            GenerationError::Api {
                status: 503,
                message: String::new(),
            }
            .is_transient()
        );
        assert!(
            !GenerationError::Api {
                status: 422,
                message: String::new(),
            }
            .is_transient()
        );
        assert!(!GenerationError::Unauthorized("bad key".to_string()).is_transient());
        assert!(!GenerationError::EmptyResult("image").is_transient());
    }

    #[test]
    fn test_api_error_deserialization() {
        let json = r#"{"error": {"message": "model overloaded"}}"#;
        let response: ApiErrorResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(response.error.message, "model overloaded");
    }
}
