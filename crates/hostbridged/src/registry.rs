//! Named host operations exposed to remote clients.
//!
//! A [`ToolRegistry`] maps dotted tool names such as `gameobject.find` to
//! handlers that run against the host state `H`. The registry is assembled
//! once during bootstrap and then shared read-only behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::codec::{Map, Value};

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Signature shared by every tool handler.
pub type HandlerFn<H> = dyn Fn(&mut H, &Map) -> Result<Value, HandlerError> + Send + Sync;

/// Failure reported by a tool handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates an error with a caller-facing message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// A required argument was absent or had the wrong shape.
    #[must_use]
    pub fn missing_argument(name: &str) -> Self {
        Self::new(format!("Missing '{name}' parameter"))
    }

    /// The addressed entity does not exist.
    #[must_use]
    pub fn not_found(kind: &str, name: &str) -> Self {
        Self::new(format!("{kind} '{name}' not found"))
    }

    /// An argument was present but unusable.
    #[must_use]
    pub fn invalid(message: impl fmt::Display) -> Self {
        Self::new(format!("Invalid argument: {message}"))
    }

    /// Human-readable message returned to the client.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No tool is registered under the requested name.
    #[error("Unknown tool: {name}")]
    UnknownTool {
        /// Name as requested.
        name: String,
    },
}

/// Public description of a registered tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    name: String,
    description: String,
}

impl ToolDescriptor {
    fn new(name: String, description: String) -> Self {
        if description.trim().is_empty() {
            Self {
                description: name.clone(),
                name,
            }
        } else {
            Self { name, description }
        }
    }

    /// Dotted tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line description; falls back to the name when none was given.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A resolved tool: its descriptor plus a shared handle to the handler.
pub struct Tool<H> {
    descriptor: ToolDescriptor,
    handler: Arc<HandlerFn<H>>,
}

impl<H> Clone for Tool<H> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H> fmt::Debug for Tool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl<H> Tool<H> {
    /// Descriptor reported by `/tools`.
    #[must_use]
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Dotted tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Runs the handler. Must be called on the host thread.
    pub fn call(&self, host: &mut H, parameters: &Map) -> Result<Value, HandlerError> {
        (self.handler)(host, parameters)
    }
}

/// Registration-ordered table of tools.
pub struct ToolRegistry<H> {
    tools: Vec<Tool<H>>,
    index: HashMap<String, usize>,
}

impl<H> Default for ToolRegistry<H> {
    fn default() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<H> fmt::Debug for ToolRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(Tool::name))
            .finish()
    }
}

impl<H> ToolRegistry<H> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`.
    ///
    /// Registering an existing name replaces its handler and description but
    /// keeps its original position in [`ToolRegistry::list`].
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) where
        F: Fn(&mut H, &Map) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        let tool_name = name.into();
        let tool = Tool {
            descriptor: ToolDescriptor::new(tool_name.clone(), description.into()),
            handler: Arc::new(handler),
        };
        if let Some(slot) = self
            .index
            .get(&tool_name)
            .and_then(|&position| self.tools.get_mut(position))
        {
            warn!(
                target: REGISTRY_TARGET,
                tool = %tool_name,
                "tool registered twice; replacing previous handler"
            );
            *slot = tool;
        } else {
            self.index.insert(tool_name, self.tools.len());
            self.tools.push(tool);
        }
    }

    /// Looks up a tool by exact name.
    pub fn resolve(&self, name: &str) -> Result<Tool<H>, RegistryError> {
        self.index
            .get(name)
            .and_then(|&position| self.tools.get(position))
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTool {
                name: name.to_owned(),
            })
    }

    /// Whether a tool is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptors in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|tool| tool.descriptor.clone()).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
