//! Request handler that answers bridge HTTP requests.
//!
//! `BridgeRequestHandler` implements the transport's `RequestHandler`. It
//! routes each request, reads the `/tool` body under a size bound, produces a
//! [`JsonResponse`] and writes it back. Every request is answered exactly once,
//! including when routing panics, in which case the 500 body carries the
//! panic message.

use std::panic::{self, AssertUnwindSafe};

use tiny_http::Request;
use tracing::{debug, error, warn};

use crate::handoff::panic_message;
use crate::transport::RequestHandler;

use super::errors::DispatchError;
use super::request::{MAX_REQUEST_BYTES, Route, read_body};
use super::response::JsonResponse;
use super::router::{BridgeRouter, DISPATCH_TARGET};

/// Answers HTTP requests through a [`BridgeRouter`].
pub(crate) struct BridgeRequestHandler<H> {
    router: BridgeRouter<H>,
}

impl<H: 'static> BridgeRequestHandler<H> {
    pub(crate) fn new(router: BridgeRouter<H>) -> Self {
        Self { router }
    }

    fn answer(&self, request: &mut Request) -> JsonResponse {
        let route = match Route::parse(request.method(), request.url()) {
            Ok(route) => route,
            Err(error) => {
                debug!(
                    target: DISPATCH_TARGET,
                    method = %request.method(),
                    url = request.url(),
                    %error,
                    "request not routed"
                );
                return JsonResponse::error(&error);
            }
        };

        match route {
            Route::Preflight => JsonResponse::preflight(),
            Route::Status => self.router.status(),
            Route::Tools => self.router.tools(),
            Route::Tool => match read_body(request.as_reader(), MAX_REQUEST_BYTES) {
                Ok(body) => self.router.tool(&body),
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "failed to read request body");
                    JsonResponse::error(&error)
                }
            },
        }
    }
}

impl<H: 'static> RequestHandler for BridgeRequestHandler<H> {
    fn handle(&self, mut request: Request) {
        let response = panic::catch_unwind(AssertUnwindSafe(|| self.answer(&mut request)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                error!(target: DISPATCH_TARGET, panic = message, "request handling panicked");
                JsonResponse::error(&DispatchError::internal(message))
            });
        if let Err(error) = response.respond(request) {
            warn!(target: DISPATCH_TARGET, %error, "failed to write response");
        }
    }
}
