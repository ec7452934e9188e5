//! Loopback command bridge for a single-threaded host application.
//!
//! External processes drive the host by posting tool invocations to a small
//! HTTP server bound to loopback. Worker threads never touch host state:
//! every tool call is handed to the [`HostLoop`] that owns it and the caller
//! blocks until the result comes back or the request times out.
//!
//! The pieces, leaf first:
//!
//! - [`codec`]: the JSON-like [`Value`] model and its tolerant text codec.
//! - [`registry`]: dotted tool names mapped to handlers over the host state.
//! - [`handoff`]: the FIFO queue between worker threads and the host loop.
//! - [`Bridge`]: listener lifecycle, routing and response envelopes.
//! - [`scene`]: a simulated scene host used by the binary and the tests.
//!
//! [`bootstrap_with`] wires these together after loading configuration and
//! installing telemetry; [`run_daemon`] is the binary's entry point.

mod bootstrap;
mod bridge;
pub mod codec;
mod dispatch;
pub mod handoff;
mod health;
mod host;
mod process;
pub mod registry;
pub mod scene;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, HostParts, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use bridge::{Bridge, BridgePhase};
pub use codec::{Map, Number, Value};
pub use dispatch::DispatchError;
pub use handoff::{Dispatcher, HandoffError, HostLoop, host_channel};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use host::{HostMode, HostSnapshot, HostStatus};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use registry::{HandlerError, RegistryError, Tool, ToolDescriptor, ToolRegistry};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
