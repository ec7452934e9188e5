//! Daemon bootstrap orchestration.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use ortho_config::OrthoError;
use thiserror::Error;
use tracing::info;

use hostbridge_config::{Config, OrthoConfig};

use crate::bridge::Bridge;
use crate::handoff::{HostLoop, host_channel};
use crate::health::HealthReporter;
use crate::host::HostStatus;
use crate::registry::ToolRegistry;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a configuration resolved earlier.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already-resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// Host-side collaborators the daemon is assembled from.
pub struct HostParts<H> {
    /// Host state, moved onto the host loop.
    pub host: H,
    /// Tools operating on `H`.
    pub registry: ToolRegistry<H>,
    /// Thread-safe status view for `/status`.
    pub status: Arc<dyn HostStatus>,
}

/// Result of a successful bootstrap invocation.
///
/// The daemon owns the bridge and the host loop. The loop must be driven on
/// the thread that is allowed to touch the host state.
pub struct Daemon<H> {
    config: Config,
    telemetry: TelemetryHandle,
    bridge: Bridge<H>,
    host_loop: HostLoop<H>,
}

impl<H: 'static> Daemon<H> {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// The request server.
    #[must_use]
    pub fn bridge(&self) -> &Bridge<H> {
        &self.bridge
    }

    /// Starts the request server on the configured port when enabled.
    pub fn start_bridge(&self) {
        if self.config.enabled() {
            self.bridge.start(self.config.port());
        } else {
            info!(target: BOOTSTRAP_TARGET, "bridge disabled by configuration");
        }
    }

    /// Runs queued host jobs until `shutdown` is set. Call on the host thread.
    pub fn run_host_loop(&mut self, shutdown: &AtomicBool) {
        let tick = self.config.tick_interval();
        self.host_loop.run_until(shutdown, tick);
    }

    /// Runs whatever host jobs are queued right now.
    pub fn pump(&mut self) -> usize {
        self.host_loop.pump()
    }

    /// Borrows the host state.
    #[must_use]
    pub fn host(&self) -> &H {
        self.host_loop.host()
    }

    /// Stops the request server.
    pub fn shutdown(&self) {
        self.bridge.stop();
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// Loads configuration, installs telemetry, then wires the registry and
/// host state into a stopped [`Bridge`] and its [`HostLoop`].
pub fn bootstrap_with<H: 'static>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    parts: HostParts<H>,
) -> Result<Daemon<H>, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let HostParts {
        host,
        registry,
        status,
    } = parts;
    let (dispatcher, host_loop) = host_channel(host);
    let bridge = Bridge::new(
        Arc::new(registry),
        dispatcher,
        status,
        config.request_timeout(),
        Arc::clone(&reporter),
    );
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        telemetry,
        bridge,
        host_loop,
    })
}
