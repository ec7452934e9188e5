//! HTTP request dispatch for the bridge.
//!
//! ## Protocol
//!
//! The bridge serves three endpoints on loopback:
//!
//! ```text
//! POST /tool     {"tool":"scene.getActive","arguments":{}}
//! GET  /status
//! GET  /tools
//! ```
//!
//! Tool calls answer `200` with either `{"success":true,"result":...}` or
//! `{"success":false,"error":"..."}`. Protocol failures use HTTP status codes
//! with an `{"error":"..."}` body. `OPTIONS` on any path is a CORS preflight.

mod errors;
mod handler;
mod request;
mod response;
mod router;

pub use self::errors::DispatchError;
pub(crate) use self::handler::BridgeRequestHandler;
pub(crate) use self::router::BridgeRouter;
