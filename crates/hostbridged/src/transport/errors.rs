//! Error types for listener operations.

use std::error::Error as StdError;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while binding or running an HTTP listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The address could not be bound.
    #[error("failed to bind HTTP listener at {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying server error.
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
    /// The bound server reported a non-IP address.
    #[error("listener bound for {addr} did not report an IP address")]
    UnknownAddress {
        /// Address that was requested.
        addr: SocketAddr,
    },
    /// The accept thread could not be started.
    #[error("failed to spawn listener thread: {source}")]
    Spawn {
        /// Spawn failure.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked before it could be joined.
    #[error("listener thread panicked")]
    ThreadPanic,
}
