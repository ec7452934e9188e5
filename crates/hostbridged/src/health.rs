//! Structured health reporting for daemon and bridge lifecycle events.

use std::sync::Arc;

use hostbridge_config::Config;

use crate::bootstrap::BootstrapError;

/// Observer trait used to surface lifecycle events to telemetry sinks.
#[cfg_attr(test, mockall::automock)]
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the request server binds.
    fn bridge_starting(&self, port: u16);

    /// Invoked once the request server is accepting on `port`.
    fn bridge_started(&self, port: u16);

    /// Invoked when the request server could not be started.
    fn bridge_failed(&self, error: &str);

    /// Invoked after the request server has released its listeners.
    fn bridge_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn bridge_starting(&self, port: u16) {
        (**self).bridge_starting(port);
    }

    fn bridge_started(&self, port: u16) {
        (**self).bridge_started(port);
    }

    fn bridge_failed(&self, error: &str) {
        (**self).bridge_failed(error);
    }

    fn bridge_stopped(&self) {
        (**self).bridge_stopped();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: "hostbridged::health",
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: "hostbridged::health",
            event = "bootstrap_succeeded",
            enabled = config.enabled(),
            port = config.port(),
            request_timeout_secs = config.request_timeout_secs,
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "hostbridged::health",
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn bridge_starting(&self, port: u16) {
        tracing::info!(
            target: "hostbridged::health",
            event = "bridge_starting",
            port,
            "starting request server"
        );
    }

    fn bridge_started(&self, port: u16) {
        tracing::info!(
            target: "hostbridged::health",
            event = "bridge_started",
            port,
            "request server accepting connections"
        );
    }

    fn bridge_failed(&self, error: &str) {
        tracing::error!(
            target: "hostbridged::health",
            event = "bridge_failed",
            error,
            "request server failed to start"
        );
    }

    fn bridge_stopped(&self) {
        tracing::info!(
            target: "hostbridged::health",
            event = "bridge_stopped",
            "request server stopped"
        );
    }
}
