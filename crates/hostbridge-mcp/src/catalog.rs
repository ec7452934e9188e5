//! Static tool and resource catalogues.
//!
//! The fallback tools are advertised when the bridge is unreachable or lists
//! nothing, so clients still see the common scene operations. Resources map a
//! `hostbridge://` URI onto a bridge call.

use serde_json::{Map, Value, json};
use url::Url;

use crate::protocol::{ResourceDescriptor, ToolDefinition};

/// URI scheme of every advertised resource.
pub const RESOURCE_SCHEME: &str = "hostbridge";

const JSON_MIME: &str = "application/json";

/// Schema advertised for tools discovered from the bridge, which publishes
/// no argument metadata.
#[must_use]
pub fn open_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn schema(properties: Value) -> Value {
    json!({ "type": "object", "properties": properties })
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_owned(),
        description: description.to_owned(),
        input_schema,
    }
}

/// Tools advertised while the bridge cannot be reached.
#[must_use]
pub fn fallback_tools() -> Vec<ToolDefinition> {
    let named = || schema(json!({ "name": { "type": "string" } }));
    let depth = || schema(json!({ "depth": { "type": "number" } }));
    vec![
        tool("scene.getActive", "Get active scene info", open_schema()),
        tool("scene.getData", "Get current scene hierarchy", depth()),
        tool(
            "gameobject.find",
            "Find GameObjects by name, tag, or component type",
            schema(json!({
                "name": { "type": "string" },
                "tag": { "type": "string" },
                "type": { "type": "string" }
            })),
        ),
        tool(
            "gameobject.create",
            "Create GameObject",
            schema(json!({
                "name": { "type": "string" },
                "primitive": { "type": "string" }
            })),
        ),
        tool("gameobject.destroy", "Destroy GameObject", named()),
        tool(
            "transform.setPosition",
            "Set position",
            schema(json!({
                "name": { "type": "string" },
                "x": { "type": "number" },
                "y": { "type": "number" },
                "z": { "type": "number" }
            })),
        ),
        tool("debug.hierarchy", "Get hierarchy tree", depth()),
        tool("app.getState", "Get application state", open_schema()),
        tool("app.play", "Enter Play mode", open_schema()),
        tool("app.stop", "Exit Play mode", open_schema()),
        tool(
            "console.getLogs",
            "Get recent console logs",
            schema(json!({
                "count": { "type": "number" },
                "type": { "type": "string" }
            })),
        ),
    ]
}

/// Resources advertised by `resources/list`.
#[must_use]
pub fn resources() -> Vec<ResourceDescriptor> {
    let resource = |uri: &'static str, name: &'static str, description: &'static str| {
        ResourceDescriptor {
            uri,
            name,
            description,
            mime_type: JSON_MIME,
        }
    };
    vec![
        resource(
            "hostbridge://scene/hierarchy",
            "Scene Hierarchy",
            "Current scene hierarchy tree",
        ),
        resource(
            "hostbridge://scene/active",
            "Active Scene",
            "Active scene information",
        ),
        resource(
            "hostbridge://editor/state",
            "Editor State",
            "Editor state (play mode, paused, etc.)",
        ),
        resource(
            "hostbridge://console/logs",
            "Console Logs",
            "Recent console logs (use ?count=20&type=error)",
        ),
        resource(
            "hostbridge://bridge/status",
            "Bridge Status",
            "Bridge port, host, and mode",
        ),
    ]
}

/// Bridge call that backs a resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceTarget {
    /// `POST /tool` with the given arguments.
    Tool {
        /// Tool to invoke.
        name: &'static str,
        /// Arguments after query overrides.
        arguments: Value,
    },
    /// `GET /status`.
    Status,
}

/// Resource URI that does not name a known resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown resource: {uri}")]
pub struct UnknownResource {
    /// URI as requested.
    pub uri: String,
}

/// Resolves a resource URI to the bridge call that answers it.
///
/// Query parameters override the resource's default arguments. Integer and
/// boolean values are passed as JSON numbers and booleans.
pub fn resolve_resource(uri: &str) -> Result<ResourceTarget, UnknownResource> {
    let unknown = || UnknownResource {
        uri: uri.to_owned(),
    };
    let parsed = Url::parse(uri).map_err(|_| unknown())?;
    if parsed.scheme() != RESOURCE_SCHEME {
        return Err(unknown());
    }
    let path = format!(
        "/{}{}",
        parsed.host_str().unwrap_or_default(),
        parsed.path().trim_end_matches('/')
    );

    let (name, mut arguments) = match path.as_str() {
        "/scene/hierarchy" => ("debug.hierarchy", json_map(json!({ "depth": 3 }))),
        "/scene/active" => ("scene.getActive", Map::new()),
        "/editor/state" => ("app.getState", Map::new()),
        "/console/logs" => ("console.getLogs", json_map(json!({ "count": 50 }))),
        "/bridge/status" => return Ok(ResourceTarget::Status),
        _ => return Err(unknown()),
    };
    for (key, value) in parsed.query_pairs() {
        arguments.insert(key.into_owned(), query_value(&value));
    }
    Ok(ResourceTarget::Tool {
        name,
        arguments: Value::Object(arguments),
    })
}

fn json_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn query_value(raw: &str) -> Value {
    if let Ok(number) = raw.parse::<i64>() {
        return Value::from(number);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_owned()),
    }
}
