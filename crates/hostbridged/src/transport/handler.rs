//! Request handling abstraction for the HTTP listener.

use tiny_http::Request;

/// Handles accepted HTTP requests.
pub(crate) trait RequestHandler: Send + Sync + 'static {
    /// Handles a single request, responding exactly once. Implementations
    /// should avoid panicking; a dropped request is answered with a bare 500.
    fn handle(&self, request: Request);
}
