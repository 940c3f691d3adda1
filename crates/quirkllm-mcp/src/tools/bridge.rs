//! `tools/list` and `tools/call` on top of a [`ToolProvider`].

use std::sync::Arc;

use serde_json::Value;

use crate::protocol::codec::json_kind;
use crate::protocol::lifecycle::methods::{TOOLS_CALL, TOOLS_LIST};
use crate::protocol::registry::HandlerRegistry;
use crate::types::{McpError, McpResult, Params, ToolCallResult, ToolListResult};

use super::provider::ToolProvider;

/// Routes the tool methods to an optional tool collaborator.
#[derive(Clone, Default)]
pub struct ToolInvocationBridge {
    tools: Option<Arc<dyn ToolProvider>>,
}

impl ToolInvocationBridge {
    pub fn new(tools: Option<Arc<dyn ToolProvider>>) -> Self {
        Self { tools }
    }

    pub fn has_tools(&self) -> bool {
        self.tools.is_some()
    }

    /// Install the `tools/list` and `tools/call` handlers.
    pub fn register(&self, registry: &mut HandlerRegistry) {
        let bridge = self.clone();
        registry.register_sync(TOOLS_LIST, move |_| bridge.list());

        let bridge = self.clone();
        registry.register_async(TOOLS_CALL, move |params| {
            let bridge = bridge.clone();
            async move { bridge.call(params).await }
        });
    }

    pub fn list(&self) -> McpResult<Value> {
        let tools = self
            .tools
            .as_ref()
            .map(|t| t.list_tools())
            .unwrap_or_default();
        to_value(ToolListResult {
            tools,
            next_cursor: None,
        })
    }

    pub async fn call(&self, mut params: Params) -> McpResult<Value> {
        let Some(tools) = &self.tools else {
            return to_value(ToolCallResult::error("No tools available"));
        };

        let name = match params.remove("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) if name.is_empty() => None,
            Some(Value::String(name)) => Some(name),
            Some(other) => {
                return Err(McpError::InvalidParams(format!(
                    "tool name must be a string, got {}",
                    json_kind(&other)
                )))
            }
        };
        let Some(name) = name else {
            return to_value(ToolCallResult::error("Missing tool name"));
        };

        let arguments = match params.remove("arguments") {
            None | Some(Value::Null) => Params::new(),
            Some(Value::Object(arguments)) => arguments,
            Some(other) => {
                return Err(McpError::InvalidParams(format!(
                    "arguments must be an object, got {}",
                    json_kind(&other)
                )))
            }
        };

        tracing::info!("Calling tool: {name}");
        let result = tools.call_tool(&name, arguments).await?;
        if result.is_error() {
            tracing::debug!("Tool {name} reported an error");
        }
        to_value(result)
    }
}

impl std::fmt::Debug for ToolInvocationBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvocationBridge")
            .field("has_tools", &self.has_tools())
            .finish()
    }
}

fn to_value(value: impl serde::Serialize) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}
