//! Error types for host handoff failures.

use std::time::Duration;

use thiserror::Error;

use crate::registry::HandlerError;

/// Errors surfaced while waiting for the host to run a tool.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// The handler ran and reported a failure.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// The host did not finish the job before the caller's deadline.
    #[error("tool '{tool}' did not complete within {timeout:?}")]
    Timeout {
        /// Tool that was waiting.
        tool: String,
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// The host loop has gone away, so the job can never run.
    #[error("host execution context is unavailable")]
    HostUnavailable,
}
