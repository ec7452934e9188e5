//! Error surface of the adapter binary.

use std::io;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use crate::client::ClientError;
use crate::telemetry::TelemetryError;

/// Errors that stop the adapter.
///
/// Bridge failures during a session are reported to the client as tool
/// results and never surface here.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Layered loading failure.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Subscriber installation failure.
        #[source]
        source: TelemetryError,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to create bridge client: {source}")]
    Client {
        /// Client construction failure.
        #[source]
        source: ClientError,
    },
    /// Reading requests or writing responses failed.
    #[error("stdio transport failed: {source}")]
    Io {
        /// I/O failure on stdin or stdout.
        #[source]
        source: io::Error,
    },
}

impl From<Arc<OrthoError>> for AdapterError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Config { source }
    }
}

impl From<TelemetryError> for AdapterError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<ClientError> for AdapterError {
    fn from(source: ClientError) -> Self {
        Self::Client { source }
    }
}

impl From<io::Error> for AdapterError {
    fn from(source: io::Error) -> Self {
        Self::Io { source }
    }
}
