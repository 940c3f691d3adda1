//! MCP capability and initialization types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MCP_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "quirkllm";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

impl Default for Implementation {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
        }
    }
}

/// Capability namespaces advertised to the host.
///
/// Serializes to `{}` when nothing is advertised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsCapability {}

impl ServerCapabilities {
    /// Computed once at startup from whether a tool collaborator exists.
    pub fn for_tools(has_tools: bool) -> Self {
        Self {
            tools: has_tools.then_some(ToolsCapability {}),
        }
    }
}

/// Client side of `initialize`. Every field is optional; hosts vary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: Option<Value>,
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
}

impl InitializeResult {
    pub fn new(server_info: Implementation, capabilities: ServerCapabilities) -> Self {
        Self {
            protocol_version: MCP_VERSION.to_string(),
            capabilities,
            server_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_capabilities_serialize_to_empty_object() {
        let caps = ServerCapabilities::for_tools(false);
        assert_eq!(serde_json::to_value(caps).unwrap(), json!({}));
    }

    #[test]
    fn tools_capability_is_empty_object() {
        let caps = ServerCapabilities::for_tools(true);
        assert_eq!(serde_json::to_value(caps).unwrap(), json!({"tools": {}}));
    }

    #[test]
    fn initialize_result_uses_camel_case() {
        let result = InitializeResult::new(Implementation::default(), ServerCapabilities::default());
        let value = serde_json::to_value(result).unwrap();
        assert_eq!(value["protocolVersion"], MCP_VERSION);
        assert_eq!(value["serverInfo"]["name"], SERVER_NAME);
    }
}
