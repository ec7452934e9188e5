//! Loopback HTTP listener for the bridge.
//!
//! The transport module binds `tiny_http` servers to loopback addresses and
//! accepts requests on a background thread per listener. Each request is
//! handed to a [`RequestHandler`] on its own thread.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub(crate) use self::handler::RequestHandler;
pub(crate) use self::listener::{
    HttpListener, ListenerHandle, PRIMARY_LOOPBACK, secondary_loopback_addrs,
};
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
