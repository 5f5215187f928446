//! Error types for the control panel core
//!
//! The taxonomy mirrors how each failure must be handled:
//! - [`Error::Transport`]: no response at all, the only retried kind
//! - [`Error::Api`]: the remote answered and rejected the request
//! - [`Error::Validation`]: a business rule rejected the input
//! - [`Error::State`]: an operation was called out of order

use thiserror::Error;

/// Result type alias for panel operations
pub type Result<T> = std::result::Result<T, Error>;

/// A request that produced no response (connection refused, timeout, host offline)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(String);

impl TransportError {
    /// Create a transport error from a message
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// The underlying message
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Core error type for the control panel
#[derive(Error, Debug)]
pub enum Error {
    /// No response from the remote (retried by the gateway)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The remote rejected the request (never retried)
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status of the reply
        status: u16,
        /// Reply body, or the remote's message for `success: false` envelopes
        body: String,
    },

    /// Business-rule rejection, actionable by the user
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operation called in a state that does not allow it
    #[error("Invalid state: {0}")]
    State(String),

    /// Invalid local configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A successful reply that could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(TransportError::new(msg))
    }

    /// Create an API rejection error
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error means the remote was never reached
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether this error is a business-rule rejection
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_carries_status_and_body() {
        let err = Error::api(503, "maintenance");
        assert_eq!(err.to_string(), "API error (503): maintenance");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_error_converts() {
        let err: Error = TransportError::new("connection refused").into();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }
}
