//! Hands tool invocations to the host's single execution context.
//!
//! Worker threads hold a cloneable [`Dispatcher`] and enqueue jobs; exactly one
//! [`HostLoop`] owns the host state and drains the queue on the host thread.
//! Every invocation gets a private one-slot result channel, so a caller that
//! times out simply stops listening and the late result is discarded.

mod errors;
mod queue;

pub use self::errors::HandoffError;
pub use self::queue::{Dispatcher, HostLoop, Job, host_channel};
pub(crate) use self::queue::panic_message;

const HANDOFF_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::handoff");
