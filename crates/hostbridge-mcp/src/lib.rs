//! Stdio MCP adapter for the host bridge.
//!
//! MCP clients speak newline-delimited JSON-RPC on stdin and stdout. The
//! adapter turns `tools/*` and `resources/*` requests into calls against the
//! bridge's loopback HTTP endpoints and reports bridge failures as tool
//! errors rather than protocol errors.

pub mod catalog;
pub mod client;
mod errors;
pub mod protocol;
mod server;
mod telemetry;

use std::io;

use tracing::info;

use hostbridge_config::{Config, OrthoConfig};

pub use client::{BridgeClient, ClientError, HttpBridgeClient, RemoteTool};
pub use errors::AdapterError;
pub use server::{MAX_LINE_BYTES, McpAdapter};
pub use telemetry::TelemetryError;

/// Loads configuration and serves MCP on stdio until stdin closes.
pub fn run() -> Result<(), AdapterError> {
    let config = Config::load()?;
    telemetry::initialise(&config)?;
    let client = HttpBridgeClient::from_config(&config)?;
    info!(
        target: concat!(env!("CARGO_PKG_NAME"), "::run"),
        bridge = client.base_url(),
        "adapter starting"
    );
    let stdin = io::stdin();
    McpAdapter::new(client).serve(stdin.lock(), io::stdout().lock())
}
