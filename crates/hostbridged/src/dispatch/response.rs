//! Response envelopes and HTTP serialisation.
//!
//! Every response carries permissive CORS headers so browser-based clients on
//! the same machine can reach the bridge. All bodies except the empty
//! preflight answer are JSON.

use std::io::{self, Cursor};

use tiny_http::{Header, Request, Response};

use crate::codec::{self, Map, Value};

use super::errors::DispatchError;

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// Status code plus optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JsonResponse {
    status: u16,
    body: Option<Value>,
}

impl JsonResponse {
    /// 200 with an arbitrary JSON body.
    pub(crate) fn ok(body: impl Into<Value>) -> Self {
        Self {
            status: 200,
            body: Some(body.into()),
        }
    }

    /// 200 `{"success":true,"result":...}`.
    pub(crate) fn success(result: Value) -> Self {
        Self::ok(Map::new().with("success", true).with("result", result))
    }

    /// 200 `{"success":false,"error":...}`.
    pub(crate) fn failure(message: impl Into<String>) -> Self {
        Self::ok(Map::new().with("success", false).with("error", message.into()))
    }

    /// Error status with `{"error":...}`.
    pub(crate) fn error(error: &DispatchError) -> Self {
        Self {
            status: error.status_code(),
            body: Some(Value::from(Map::new().with("error", error.to_string()))),
        }
    }

    /// 200 with an empty body, answering CORS preflight.
    pub(crate) fn preflight() -> Self {
        Self {
            status: 200,
            body: None,
        }
    }

    pub(crate) fn status(&self) -> u16 {
        self.status
    }

    pub(crate) fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Builds the `tiny_http` response.
    pub(crate) fn into_http(self) -> Response<Cursor<Vec<u8>>> {
        let (data, content_type) = match &self.body {
            Some(body) => (codec::encode(body).into_bytes(), Some("application/json")),
            None => (Vec::new(), None),
        };
        let mut response = Response::from_data(data).with_status_code(self.status);
        let headers = content_type
            .map(|value| ("Content-Type", value))
            .into_iter()
            .chain(CORS_HEADERS);
        for (name, value) in headers {
            // Header values here are static ASCII, so construction cannot fail.
            if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                response.add_header(header);
            }
        }
        response
    }

    /// Writes the response to the client.
    pub(crate) fn respond(self, request: Request) -> io::Result<()> {
        request.respond(self.into_http())
    }
}
