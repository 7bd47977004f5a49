//! Error types for the kide API client

use thiserror::Error;

/// Errors that can occur when interacting with the kide API
#[derive(Debug, Error)]
pub enum KideError {
    /// HTTP request failed (connect, timeout, body read)
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Unauthorized - invalid or expired bearer token
    #[error("Unauthorized - invalid or expired token")]
    Unauthorized,

    /// The product does not exist
    #[error("Not found")]
    NotFound,

    /// Rate limited - too many requests
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// API returned an error
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// A field the agent depends on is missing from the payload
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The sale-start timestamp could not be parsed
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp {
        /// Raw value from the payload
        value: String,
        /// Parser message
        reason: String,
    },
}

impl KideError {
    /// Whether retrying the same request may succeed
    ///
    /// Network failures, rate limiting and server errors are transient.
    /// Everything that describes the request or the payload is not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::RateLimited => true,
            Self::ApiError { status, .. } => *status >= 500,
            Self::ResponseParseFailed(_)
            | Self::Unauthorized
            | Self::NotFound
            | Self::MissingField(_)
            | Self::InvalidTimestamp { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(KideError::RequestFailed("connection reset".into()).is_transient());
        assert!(KideError::RateLimited.is_transient());
        assert!(KideError::ApiError { status: 503, message: String::new() }.is_transient());

        assert!(!KideError::ApiError { status: 409, message: String::new() }.is_transient());
        assert!(!KideError::NotFound.is_transient());
        assert!(!KideError::Unauthorized.is_transient());
        assert!(!KideError::MissingField("dateSalesFrom").is_transient());
    }
}
