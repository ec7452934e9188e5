//! Termination signal handling for the daemon.

use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use thiserror::Error;
use tracing::debug;

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Arranges for `flag` to be set once shutdown should proceed.
    fn install(&self, flag: &Arc<AtomicBool>) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Sets the flag on SIGTERM, SIGINT, SIGQUIT or SIGHUP.
///
/// The host loop polls the flag between ticks, so the main thread keeps
/// running host jobs until a signal arrives.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn install(&self, flag: &Arc<AtomicBool>) -> Result<(), ShutdownError> {
        for signal in [SIGTERM, SIGINT, SIGQUIT, SIGHUP] {
            signal_hook::flag::register(signal, Arc::clone(flag))
                .map_err(|source| ShutdownError::Install { source })?;
        }
        debug!(target: PROCESS_TARGET, "shutdown signal handlers installed");
        Ok(())
    }
}
