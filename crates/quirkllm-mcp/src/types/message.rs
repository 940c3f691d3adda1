//! JSON-RPC 2.0 message types for the MCP protocol.
//!
//! The envelope carries its version under the `protocolVersion` key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC 2.0 protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Envelope key holding [`JSONRPC_VERSION`].
pub const VERSION_FIELD: &str = "protocolVersion";

/// Handler parameters. Omitted `params` become an empty map.
pub type Params = Map<String, Value>;

/// Request identifier: a string, an integer, or null.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    /// Integer ids above `i64::MAX`.
    Unsigned(u64),
    Null,
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::Unsigned(n) => write!(f, "{n}"),
            RequestId::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// An incoming JSON-RPC 2.0 request. A request without an id is a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "protocolVersion")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<RequestId>, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            id: Some(id.into()),
            params,
        }
    }

    pub fn notification(method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            id: None,
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// The id a response to this request must carry.
    pub fn response_id(&self) -> RequestId {
        self.id.clone().unwrap_or(RequestId::Null)
    }
}

/// A JSON-RPC 2.0 success response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "protocolVersion")]
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "protocolVersion")]
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: JsonRpcErrorObject,
}

/// Error object within a JSON-RPC error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Either half of a response. `result` and `error` never coexist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Error(JsonRpcError),
    Success(JsonRpcResponse),
}

impl Response {
    pub fn id(&self) -> &RequestId {
        match self {
            Response::Success(r) => &r.id,
            Response::Error(e) => &e.id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Response::Success(r) => Some(&r.result),
            Response::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&JsonRpcErrorObject> {
        match self {
            Response::Success(_) => None,
            Response::Error(e) => Some(&e.error),
        }
    }
}

impl From<JsonRpcResponse> for Response {
    fn from(r: JsonRpcResponse) -> Self {
        Response::Success(r)
    }
}

impl From<JsonRpcError> for Response {
    fn from(e: JsonRpcError) -> Self {
        Response::Error(e)
    }
}

impl JsonRpcResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }
    }
}

impl JsonRpcError {
    pub fn new(id: RequestId, code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: JsonRpcErrorObject {
                code,
                message,
                data: None,
            },
        }
    }
}
