//! The external tool collaborator consumed by the server.

use async_trait::async_trait;

use crate::types::{McpResult, Params, ToolCallResult, ToolDefinition};

/// Owns a set of invocable tools and their execution logic.
///
/// `list_tools` must be stable while the set of tools is unchanged.
/// Tool failures belong in the returned [`ToolCallResult`] with `isError`
/// set; an `Err` is reported to the host as a protocol error.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    fn list_tools(&self) -> Vec<ToolDefinition>;

    async fn call_tool(&self, name: &str, arguments: Params) -> McpResult<ToolCallResult>;
}
