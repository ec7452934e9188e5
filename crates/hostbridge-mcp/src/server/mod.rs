//! Newline-delimited JSON-RPC server over stdio.
//!
//! Each request line is answered with exactly one response line, except for
//! notifications, which are never answered. Bridge failures become tool
//! results flagged with `isError` so the session survives a host restart.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::catalog::{self, ResourceTarget};
use crate::client::BridgeClient;
use crate::errors::AdapterError;
use crate::protocol::{
    DEFAULT_PROTOCOL_VERSION, InitializeResult, ListChanged, ResourceContents,
    ResourceReadParams, RpcError, RpcRequest, RpcResponse, ServerCapabilities, ServerInfo,
    ToolCallParams, ToolCallResult, ToolDefinition, codes,
};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Upper bound on a single request line.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Result of reading one bounded line.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Eof,
    Complete(Vec<u8>),
    TooLong,
}

/// Adapter between MCP clients and the bridge.
pub struct McpAdapter<C> {
    client: C,
    max_line_bytes: usize,
}

impl<C: BridgeClient> McpAdapter<C> {
    /// Adapter over `client` with the default line limit.
    #[must_use]
    pub fn new(client: C) -> Self {
        Self {
            client,
            max_line_bytes: MAX_LINE_BYTES,
        }
    }

    /// Overrides the request line limit.
    #[must_use]
    pub fn with_max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }

    /// Serves requests from `reader` until end of input.
    pub fn serve(
        &self,
        mut reader: impl BufRead,
        mut writer: impl Write,
    ) -> Result<(), AdapterError> {
        info!(target: SERVER_TARGET, "adapter serving on stdio");
        loop {
            let response = match read_line_limited(&mut reader, self.max_line_bytes)? {
                Line::Eof => break,
                Line::TooLong => {
                    warn!(
                        target: SERVER_TARGET,
                        limit = self.max_line_bytes,
                        "request line too long"
                    );
                    Some(RpcResponse::failure(
                        None,
                        codes::INVALID_REQUEST,
                        format!("Request exceeds {} bytes", self.max_line_bytes),
                    ))
                }
                Line::Complete(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => self.handle_line(&text),
                    Err(_) => Some(RpcResponse::failure(
                        None,
                        codes::PARSE_ERROR,
                        "Parse error: request is not valid UTF-8",
                    )),
                },
            };
            if let Some(reply) = response {
                write_response(&mut writer, &reply)?;
            }
        }
        info!(target: SERVER_TARGET, "input closed, adapter stopping");
        Ok(())
    }

    /// Answers one request line. Blank lines and notifications yield nothing.
    #[must_use]
    pub fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<RpcRequest>(trimmed) {
            Ok(request) => self.handle(&request),
            Err(error) => {
                warn!(target: SERVER_TARGET, %error, "unparseable request");
                Some(RpcResponse::failure(
                    None,
                    codes::PARSE_ERROR,
                    format!("Parse error: {error}"),
                ))
            }
        }
    }

    /// Answers a decoded request.
    #[must_use]
    pub fn handle(&self, request: &RpcRequest) -> Option<RpcResponse> {
        if request.is_notification() {
            debug!(target: SERVER_TARGET, method = %request.method, "notification ignored");
            return None;
        }
        let id = request.id.clone();
        if request.jsonrpc != "2.0" {
            return Some(RpcResponse::failure(
                id,
                codes::INVALID_REQUEST,
                format!("Invalid request: unsupported jsonrpc version '{}'", request.jsonrpc),
            ));
        }
        let outcome = match request.method.as_str() {
            "initialize" => initialize(&request.params),
            "ping" => Ok(json!({})),
            "tools/list" => encode(&json!({ "tools": self.list_tools() })),
            "tools/call" => self.call_tool(&request.params),
            "resources/list" => encode(&json!({ "resources": catalog::resources() })),
            "resources/read" => self.read_resource(&request.params),
            other => Err(RpcError {
                code: codes::METHOD_NOT_FOUND,
                message: format!("Method not found: {other}"),
            }),
        };
        Some(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::failure(id, error.code, error.message),
        })
    }

    fn list_tools(&self) -> Vec<ToolDefinition> {
        match self.client.list_tools() {
            Ok(tools) if !tools.is_empty() => tools
                .into_iter()
                .map(|tool| ToolDefinition {
                    description: tool.description.unwrap_or_else(|| tool.name.clone()),
                    name: tool.name,
                    input_schema: catalog::open_schema(),
                })
                .collect(),
            Ok(_) => {
                debug!(target: SERVER_TARGET, "bridge listed no tools, using fallback");
                catalog::fallback_tools()
            }
            Err(error) => {
                debug!(target: SERVER_TARGET, %error, "bridge unavailable, using fallback tools");
                catalog::fallback_tools()
            }
        }
    }

    fn call_tool(&self, params: &Value) -> Result<Value, RpcError> {
        let params: ToolCallParams =
            serde_json::from_value(params.clone()).map_err(|error| RpcError {
                code: codes::INVALID_PARAMS,
                message: format!("Invalid tools/call params: {error}"),
            })?;
        let arguments = match params.arguments {
            Some(arguments @ Value::Object(_)) => arguments,
            _ => json!({}),
        };
        let result = match self.client.call_tool(&params.name, arguments) {
            Ok(envelope) => {
                let failed = envelope.get("success") == Some(&Value::Bool(false));
                ToolCallResult::text(pretty(&envelope), failed)
            }
            Err(error) => {
                warn!(target: SERVER_TARGET, tool = %params.name, %error, "tool call failed");
                ToolCallResult::text(format!("Error: {error}"), true)
            }
        };
        encode(&result)
    }

    fn read_resource(&self, params: &Value) -> Result<Value, RpcError> {
        let params: ResourceReadParams =
            serde_json::from_value(params.clone()).map_err(|error| RpcError {
                code: codes::INVALID_PARAMS,
                message: format!("Invalid resources/read params: {error}"),
            })?;
        let outcome = catalog::resolve_resource(&params.uri)
            .map_err(|error| error.to_string())
            .and_then(|target| {
                let reply = match target {
                    ResourceTarget::Tool { name, arguments } => {
                        self.client.call_tool(name, arguments)
                    }
                    ResourceTarget::Status => self.client.status(),
                };
                reply.map_err(|error| error.to_string())
            });
        let text = match outcome {
            Ok(value) => pretty(&value),
            Err(message) => {
                debug!(target: SERVER_TARGET, uri = %params.uri, %message, "resource read failed");
                json!({ "error": message }).to_string()
            }
        };
        let contents = ResourceContents {
            uri: params.uri,
            mime_type: "application/json",
            text,
        };
        encode(&json!({ "contents": [contents] }))
    }
}

fn initialize(params: &Value) -> Result<Value, RpcError> {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION)
        .to_owned();
    encode(&InitializeResult {
        protocol_version,
        capabilities: ServerCapabilities {
            tools: ListChanged::default(),
            resources: ListChanged::default(),
        },
        server_info: ServerInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    })
}

fn encode(value: &impl Serialize) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|error| RpcError {
        code: codes::INTERNAL_ERROR,
        message: format!("Internal error: {error}"),
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn write_response(writer: &mut impl Write, response: &RpcResponse) -> io::Result<()> {
    let line = serde_json::to_string(response)?;
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Reads up to and including the next newline, discarding the rest of any
/// line longer than `limit` bytes.
fn read_line_limited(reader: &mut impl BufRead, limit: usize) -> io::Result<Line> {
    let mut line = Vec::new();
    let mut overflowed = false;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(match (overflowed, line.is_empty()) {
                (true, _) => Line::TooLong,
                (false, true) => Line::Eof,
                (false, false) => Line::Complete(line),
            });
        }
        let (chunk, found_newline) = match available.iter().position(|&byte| byte == b'\n') {
            Some(index) => (available.get(..index).unwrap_or(available), true),
            None => (available, false),
        };
        if !overflowed {
            if line.len() + chunk.len() > limit {
                overflowed = true;
                line.clear();
            } else {
                line.extend_from_slice(chunk);
            }
        }
        let consumed = chunk.len() + usize::from(found_newline);
        reader.consume(consumed);
        if found_newline {
            return Ok(if overflowed {
                Line::TooLong
            } else {
                Line::Complete(line)
            });
        }
    }
}
