//! Endpoint handlers for the bridge protocol.
//!
//! `/tool` resolves the named tool in the registry and hands it to the host
//! loop through the [`Dispatcher`]. `/status` and `/tools` are answered on the
//! worker thread from shared, thread-safe state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::codec::{Map, Value};
use crate::handoff::{Dispatcher, HandoffError};
use crate::host::HostStatus;
use crate::registry::ToolRegistry;

use super::errors::DispatchError;
use super::request::ToolRequest;
use super::response::JsonResponse;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Shared state needed to answer bridge requests.
pub(crate) struct BridgeRouter<H> {
    registry: Arc<ToolRegistry<H>>,
    dispatcher: Dispatcher<H>,
    status: Arc<dyn HostStatus>,
    port: u16,
    timeout: Duration,
}

impl<H: 'static> BridgeRouter<H> {
    pub(crate) fn new(
        registry: Arc<ToolRegistry<H>>,
        dispatcher: Dispatcher<H>,
        status: Arc<dyn HostStatus>,
        port: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            status,
            port,
            timeout,
        }
    }

    /// Answers `POST /tool` for an already-read body.
    pub(crate) fn tool(&self, body: &str) -> JsonResponse {
        let request = match ToolRequest::parse(body) {
            Ok(request) => request,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "invalid tool request");
                return JsonResponse::error(&error);
            }
        };

        let tool = match self.registry.resolve(request.tool()) {
            Ok(tool) => tool,
            Err(error) => {
                debug!(target: DISPATCH_TARGET, %error, "unknown tool requested");
                return JsonResponse::failure(error.to_string());
            }
        };

        debug!(target: DISPATCH_TARGET, tool = tool.name(), "dispatching tool");
        match self
            .dispatcher
            .invoke(tool, request.into_arguments(), self.timeout)
        {
            Ok(result) => JsonResponse::success(result),
            Err(HandoffError::Handler(error)) => JsonResponse::failure(error.message()),
            Err(error @ HandoffError::Timeout { .. }) => {
                warn!(target: DISPATCH_TARGET, %error, "tool timed out");
                JsonResponse::error(&DispatchError::Timeout)
            }
            Err(error @ HandoffError::HostUnavailable) => {
                warn!(target: DISPATCH_TARGET, %error, "tool could not be dispatched");
                JsonResponse::error(&DispatchError::HostUnavailable)
            }
        }
    }

    /// Answers `GET /status`.
    pub(crate) fn status(&self) -> JsonResponse {
        let snapshot = self.status.snapshot();
        JsonResponse::ok(
            Map::new()
                .with("running", true)
                .with("port", self.port)
                .with("host", snapshot.host)
                .with("version", snapshot.version)
                .with("project", snapshot.project)
                .with("mode", snapshot.mode.to_string()),
        )
    }

    /// Answers `GET /tools`.
    pub(crate) fn tools(&self) -> JsonResponse {
        let tools: Vec<Value> = self
            .registry
            .list()
            .into_iter()
            .map(|descriptor| {
                Value::from(
                    Map::new()
                        .with("name", descriptor.name())
                        .with("description", descriptor.description()),
                )
            })
            .collect();
        let count = tools.len();
        JsonResponse::ok(Map::new().with("tools", tools).with("count", count))
    }
}
