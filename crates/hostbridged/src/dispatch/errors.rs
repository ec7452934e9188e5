//! Error types for request dispatch failures.
//!
//! Each variant maps to one HTTP status. The `Display` text is exactly what
//! clients receive in the `{"error": ...}` body.

use std::io;

use thiserror::Error;

/// Errors surfaced while routing and answering a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request body exceeds the maximum allowed size.
    #[error("Request body too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge {
        /// Bytes received before giving up.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },

    /// Request body could not be read or was not UTF-8.
    #[error("Malformed request: {message}")]
    Malformed {
        /// What was wrong with the request.
        message: String,
    },

    /// `/tool` body lacked a `tool` field.
    #[error("Missing 'tool' field")]
    MissingTool,

    /// Path exists but does not accept the request method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Path is not served by the bridge.
    #[error("Not found")]
    NotFound,

    /// The host did not finish the tool before the deadline.
    #[error("Execution timeout")]
    Timeout,

    /// The host loop is gone.
    #[error("Host unavailable")]
    HostUnavailable,

    /// Unexpected failure while producing a response.
    #[error("{message}")]
    Internal {
        /// Failure description, the panic message when routing panicked.
        message: String,
    },
}

impl DispatchError {
    /// Returns the HTTP status code for this error.
    ///
    /// Client mistakes map to 4xx. Host and server faults map to 5xx.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RequestTooLarge { .. } | Self::Malformed { .. } | Self::MissingTool => 400,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::Internal { .. } => 500,
            Self::HostUnavailable => 503,
            Self::Timeout => 504,
        }
    }

    /// Creates a request too large error.
    #[must_use]
    pub fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }

    /// Creates a malformed request error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<io::Error> for DispatchError {
    fn from(source: io::Error) -> Self {
        Self::malformed(source.to_string())
    }
}
