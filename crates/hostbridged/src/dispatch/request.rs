//! Request routing and `/tool` body parsing.

use std::io::Read;

use tiny_http::Method;

use crate::codec::{self, Map, Value};

use super::errors::DispatchError;

/// Maximum accepted size of a `/tool` body in bytes.
pub(crate) const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Endpoints served by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    /// CORS preflight for any path.
    Preflight,
    /// `POST /tool`.
    Tool,
    /// `GET /status`.
    Status,
    /// `GET /tools`.
    Tools,
}

impl Route {
    /// Resolves a route from the method and raw request URL.
    ///
    /// Paths are matched case-insensitively with any query string removed.
    pub(crate) fn parse(method: &Method, url: &str) -> Result<Self, DispatchError> {
        if *method == Method::Options {
            return Ok(Self::Preflight);
        }
        let path = url.split('?').next().unwrap_or_default().to_ascii_lowercase();
        let (route, expected) = match path.as_str() {
            "/tool" => (Self::Tool, Method::Post),
            "/status" => (Self::Status, Method::Get),
            "/tools" => (Self::Tools, Method::Get),
            _ => return Err(DispatchError::NotFound),
        };
        if *method == expected {
            Ok(route)
        } else {
            Err(DispatchError::MethodNotAllowed)
        }
    }
}

/// Parsed `/tool` request body.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ToolRequest {
    tool: String,
    arguments: Map,
}

impl ToolRequest {
    /// Parses a `{"tool": ..., "arguments": {...}}` body.
    ///
    /// Non-string tool names are taken as their encoded text. Missing or
    /// non-map `arguments` become an empty map.
    pub(crate) fn parse(body: &str) -> Result<Self, DispatchError> {
        let envelope = codec::decode_map(body);
        let tool = match envelope.get("tool") {
            None | Some(Value::Null) => return Err(DispatchError::MissingTool),
            Some(Value::String(name)) => name.clone(),
            Some(other) => codec::encode(other),
        };
        let arguments = envelope.get_map("arguments").cloned().unwrap_or_default();
        Ok(Self { tool, arguments })
    }

    pub(crate) fn tool(&self) -> &str {
        &self.tool
    }

    pub(crate) fn into_arguments(self) -> Map {
        self.arguments
    }
}

/// Reads a request body, enforcing [`MAX_REQUEST_BYTES`].
pub(crate) fn read_body(reader: &mut dyn Read, limit: usize) -> Result<String, DispatchError> {
    let mut buffer = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    reader.take(cap).read_to_end(&mut buffer)?;
    if buffer.len() > limit {
        return Err(DispatchError::request_too_large(buffer.len(), limit));
    }
    String::from_utf8(buffer)
        .map_err(|_| DispatchError::malformed("request body is not valid UTF-8"))
}
