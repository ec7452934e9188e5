//! JSON-RPC 2.0 envelopes and the MCP payloads the adapter exchanges.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision announced when the client does not request one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Standard JSON-RPC error codes used by the adapter.
pub mod codes {
    /// The line was not valid JSON.
    pub const PARSE_ERROR: i64 = -32_700;
    /// The JSON was not a valid request object.
    pub const INVALID_REQUEST: i64 = -32_600;
    /// The method is not served.
    pub const METHOD_NOT_FOUND: i64 = -32_601;
    /// The params did not match the method.
    pub const INVALID_PARAMS: i64 = -32_602;
    /// The adapter failed while answering.
    pub const INTERNAL_ERROR: i64 = -32_603;
}

/// Incoming JSON-RPC request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    /// Protocol marker, expected to be `"2.0"`.
    pub jsonrpc: String,
    /// Correlation id; absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name such as `tools/call`.
    pub method: String,
    /// Method parameters, `null` when omitted.
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Requests without an id expect no answer.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Outgoing JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Id copied from the request, `null` when unknown.
    pub id: Value,
    /// Payload of a successful call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure of an unsuccessful call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Response carrying `result`.
    #[must_use]
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Response carrying an error object.
    #[must_use]
    pub fn failure(id: Option<Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcError {
    /// One of the [`codes`].
    pub code: i64,
    /// Human-readable description.
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeResult {
    pub(crate) protocol_version: String,
    pub(crate) capabilities: ServerCapabilities,
    pub(crate) server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub(crate) struct ServerCapabilities {
    pub(crate) tools: ListChanged,
    pub(crate) resources: ListChanged,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListChanged {
    pub(crate) list_changed: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ServerInfo {
    pub(crate) name: &'static str,
    pub(crate) version: &'static str,
}

/// Tool entry returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Dotted tool name.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// JSON Schema of the tool arguments.
    pub input_schema: Value,
}

/// Parameters of `tools/call`.
#[derive(Debug, Deserialize)]
pub(crate) struct ToolCallParams {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) arguments: Option<Value>,
}

/// Parameters of `resources/read`.
#[derive(Debug, Deserialize)]
pub(crate) struct ResourceReadParams {
    pub(crate) uri: String,
}

/// Text content block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    /// Content type tag, always `text`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// The text itself.
    pub text: String,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content blocks, one per call.
    pub content: Vec<TextContent>,
    /// Whether the call failed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Result holding a single text block.
    #[must_use]
    pub fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![TextContent { kind: "text", text }],
            is_error,
        }
    }
}

/// Resource entry returned by `resources/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Resource URI.
    pub uri: &'static str,
    /// Short display name.
    pub name: &'static str,
    /// What reading the resource returns.
    pub description: &'static str,
    /// Media type of the contents.
    pub mime_type: &'static str,
}

/// One entry of a `resources/read` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// URI that was read.
    pub uri: String,
    /// Media type of `text`.
    pub mime_type: &'static str,
    /// Resource body.
    pub text: String,
}
