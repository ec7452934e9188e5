//! Default values shared by the configuration layers.

use crate::logging::LogFormat;

/// Loopback port the bridge listens on when none is configured.
pub const DEFAULT_PORT: u16 = 27_182;

/// Seconds a `/tool` request waits for the host before answering 504.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Idle tick of the host loop in milliseconds (roughly one 60 Hz frame).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;

/// Address the remote adapter dials to reach the bridge.
pub const DEFAULT_BRIDGE_HOST: &str = "127.0.0.1";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Owned bridge host used where allocation is required.
#[must_use]
pub fn default_bridge_host_string() -> String {
    DEFAULT_BRIDGE_HOST.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
