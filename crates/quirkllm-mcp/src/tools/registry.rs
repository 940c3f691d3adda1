//! In-process tool registration and dispatch.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::protocol::registry::HandlerFuture;
use crate::types::{McpResult, Params, ToolCallResult, ToolDefinition};

use super::provider::ToolProvider;

type ToolHandler = Arc<dyn Fn(Params) -> HandlerFuture + Send + Sync>;

#[derive(Clone)]
struct RegisteredTool {
    definition: ToolDefinition,
    handler: ToolHandler,
}

/// Named tools with async handlers, listed in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name is replaced in place.
    pub fn register<F, Fut>(&mut self, definition: ToolDefinition, handler: F)
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<Value>> + Send + 'static,
    {
        let handler: ToolHandler =
            Arc::new(move |args: Params| -> HandlerFuture { Box::pin(handler(args)) });
        let tool = RegisteredTool {
            definition,
            handler,
        };

        match self
            .tools
            .iter_mut()
            .find(|t| t.definition.name == tool.definition.name)
        {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    /// Returns true if the tool existed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.tools.len();
        self.tools.retain(|t| t.definition.name != name);
        self.tools.len() != before
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools
            .iter()
            .map(|t| &t.definition)
            .find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|t| &t.definition.name))
            .finish()
    }
}

#[async_trait]
impl ToolProvider for ToolRegistry {
    fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    async fn call_tool(&self, name: &str, arguments: Params) -> McpResult<ToolCallResult> {
        let Some(tool) = self.tools.iter().find(|t| t.definition.name == name) else {
            return Ok(ToolCallResult::error(format!("Unknown tool: {name}")));
        };

        match (tool.handler)(arguments).await {
            Ok(value) => Ok(format_output(value)),
            Err(e) => {
                tracing::warn!("Tool {name} failed: {e}");
                Ok(ToolCallResult::error(format!("Error: {e}")))
            }
        }
    }
}

/// Turn a handler's return value into content blocks. Values already shaped
/// as a tool result pass through untouched.
fn format_output(value: Value) -> ToolCallResult {
    match value {
        Value::String(text) => ToolCallResult::text(text),
        Value::Object(ref map) if map.contains_key("content") => {
            serde_json::from_value(value.clone()).unwrap_or_else(|_| ToolCallResult::json(&value))
        }
        other => ToolCallResult::json(&other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{McpError, ToolContent};
    use serde_json::json;

    fn definition(name: &str) -> ToolDefinition {
        ToolDefinition::new(name, "test tool", json!({"type": "object", "properties": {}}))
    }

    fn text_of(result: &ToolCallResult) -> &str {
        match &result.content[0] {
            ToolContent::Text { text } => text.as_str(),
            other => panic!("expected text content, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn string_output_becomes_text_block() {
        let mut registry = ToolRegistry::new();
        registry.register(definition("greet"), |args: Params| async move {
            let who = args.get("who").and_then(Value::as_str).unwrap_or("world");
            Ok::<_, McpError>(json!(format!("hello {who}")))
        });

        let mut args = Params::new();
        args.insert("who".into(), json!("host"));
        let result = registry.call_tool("greet", args).await.unwrap();
        assert_eq!(text_of(&result), "hello host");
        assert!(!result.is_error());
    }

    #[tokio::test]
    async fn structured_output_is_pretty_json() {
        let mut registry = ToolRegistry::new();
        registry.register(definition("stats"), |_| async { Ok::<_, McpError>(json!({"files": 3})) });
        let result = registry.call_tool("stats", Params::new()).await.unwrap();
        assert_eq!(text_of(&result), "{\n  \"files\": 3\n}");
    }

    #[tokio::test]
    async fn content_shaped_output_passes_through() {
        let mut registry = ToolRegistry::new();
        registry.register(definition("raw"), |_| async {
            Ok::<_, McpError>(json!({"content": [{"type": "text", "text": "as-is"}], "isError": true}))
        });
        let result = registry.call_tool("raw", Params::new()).await.unwrap();
        assert_eq!(text_of(&result), "as-is");
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn image_and_resource_content_pass_through() {
        let mut registry = ToolRegistry::new();
        registry.register(definition("snapshot"), |_| async {
            Ok::<_, McpError>(json!({"content": [
                {"type": "image", "data": "aGVsbG8=", "mimeType": "image/png"},
                {"type": "resource", "resource": {"uri": "file:///tmp/notes.md", "text": "# notes"}}
            ]}))
        });
        let result = registry.call_tool("snapshot", Params::new()).await.unwrap();

        assert_eq!(
            result.content[0],
            ToolContent::Image {
                data: "aGVsbG8=".into(),
                mime_type: "image/png".into(),
            }
        );
        match &result.content[1] {
            ToolContent::Resource { resource } => {
                assert_eq!(resource.uri, "file:///tmp/notes.md");
                assert_eq!(resource.text.as_deref(), Some("# notes"));
                assert!(resource.mime_type.is_none());
            }
            other => panic!("expected resource content, got {other:?}"),
        }
        assert_eq!(
            serde_json::to_value(&result).unwrap()["content"][0]["mimeType"],
            "image/png"
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_error_result() {
        let registry = ToolRegistry::new();
        let result = registry.call_tool("nope", Params::new()).await.unwrap();
        assert!(result.is_error());
        assert_eq!(text_of(&result), "Unknown tool: nope");
    }

    #[tokio::test]
    async fn handler_error_is_error_result() {
        let mut registry = ToolRegistry::new();
        registry.register(definition("fail"), |_| async {
            Err::<Value, _>(McpError::PermissionDenied("/etc/shadow".into()))
        });
        let result = registry.call_tool("fail", Params::new()).await.unwrap();
        assert!(result.is_error());
        assert_eq!(text_of(&result), "Error: Permission denied: /etc/shadow");
    }

    #[test]
    fn register_replaces_in_place_and_unregister() {
        let mut registry = ToolRegistry::new();
        registry.register(definition("a"), |_| async { Ok::<_, McpError>(Value::Null) });
        registry.register(definition("b"), |_| async { Ok::<_, McpError>(Value::Null) });
        let mut replacement = definition("a");
        replacement.description = Some("second".into());
        registry.register(replacement, |_| async { Ok::<_, McpError>(Value::Null) });

        let names: Vec<String> = registry.list_tools().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().description.as_deref(), Some("second"));

        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert_eq!(registry.len(), 1);
    }
}
