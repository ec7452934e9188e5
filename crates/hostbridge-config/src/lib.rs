//! Shared configuration for the host bridge daemon and its remote adapter.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file, then `HOSTBRIDGE_*` environment variables, and finally
//! command-line flags such as `--port` or `--log-filter`. `enabled` has no
//! flag and is set through the file or `HOSTBRIDGE_ENABLED`.

mod defaults;
mod logging;

use std::time::Duration;

pub use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_BRIDGE_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TICK_INTERVAL_MS, default_bridge_host_string, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration shared by `hostbridged` and `hostbridge-mcp`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HOSTBRIDGE")]
pub struct Config {
    /// Whether the daemon starts the request server on launch.
    #[ortho_config(default = true, skip_cli)]
    pub enabled: bool,
    /// Loopback port served by the bridge. `0` selects an ephemeral port.
    #[ortho_config(default = 27_182)]
    pub port: u16,
    /// Seconds a tool request waits for the host thread.
    #[ortho_config(default = 30)]
    pub request_timeout_secs: u64,
    /// Idle tick of the host loop in milliseconds.
    #[ortho_config(default = 16)]
    pub tick_interval_ms: u64,
    /// Host the remote adapter dials.
    #[ortho_config(default = default_bridge_host_string())]
    pub bridge_host: String,
    /// Filter expression for `tracing-subscriber`'s `EnvFilter`.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            bridge_host: default_bridge_host_string(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Whether the request server should start with the daemon.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Port the bridge binds on the loopback interfaces.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bound on how long a `/tool` request waits for its result.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Sleep between host loop iterations when no work is queued.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Host name or address the adapter uses to reach the bridge.
    #[must_use]
    pub fn bridge_host(&self) -> &str {
        &self.bridge_host
    }

    /// Base URL of the bridge, e.g. `http://127.0.0.1:27182`.
    #[must_use]
    pub fn bridge_url(&self) -> String {
        format!("http://{}:{}", self.bridge_host, self.port)
    }

    /// Log filter expression applied to the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for structured logs.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
