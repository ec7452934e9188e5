//! Test helpers for the transport module.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tiny_http::{Request, Response};

use super::RequestHandler;

/// Handler that answers 204 and counts the requests it saw.
pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl RequestHandler for CountingHandler {
    fn handle(&self, request: Request) {
        self.count.fetch_add(1, Ordering::SeqCst);
        request
            .respond(Response::empty(204))
            .expect("respond to test request");
    }
}
