//! Error types and JSON-RPC error codes for the MCP server.

use super::message::{JsonRpcError, RequestId};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP-specific error codes.
pub mod mcp_error_codes {
    pub const TOOL_NOT_FOUND: i32 = -32000;
    pub const RESOURCE_NOT_FOUND: i32 = -32001;
    pub const PERMISSION_DENIED: i32 = -32002;
}

/// All errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Framing or stream failure. The stream can no longer be trusted.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Message too large: {size} bytes exceeds {max} bytes")]
    MessageTooLarge { size: usize, max: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) => INTERNAL_ERROR,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::ResourceNotFound(_) => RESOURCE_NOT_FOUND,
            McpError::PermissionDenied(_) => PERMISSION_DENIED,
            McpError::Transport(_)
            | McpError::MessageTooLarge { .. }
            | McpError::Io(_)
            | McpError::Json(_) => INTERNAL_ERROR,
        }
    }

    /// Whether the error leaves the byte stream in an unknown state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            McpError::Transport(_) | McpError::MessageTooLarge { .. } | McpError::Io(_)
        )
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError::new(id, self.code(), self.to_string())
    }
}

pub type McpResult<T> = Result<T, McpError>;
