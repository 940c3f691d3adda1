//! JSON-RPC envelope validation.

use serde_json::{Map, Value};

use crate::types::{McpError, McpResult, RequestId, JSONRPC_VERSION, VERSION_FIELD};

/// Read the request id. Absent and `null` both mean "notification".
pub fn extract_id(envelope: &Map<String, Value>) -> McpResult<Option<RequestId>> {
    match envelope.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(RequestId::String(s.clone()))),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(RequestId::Number)
            .or_else(|| n.as_u64().map(RequestId::Unsigned))
            .map(Some)
            .ok_or_else(|| {
                McpError::InvalidRequest(format!("Request id must be an integer, got {n}"))
            }),
        Some(other) => Err(McpError::InvalidRequest(format!(
            "Request id must be a string or integer, got {other}"
        ))),
    }
}

/// Validate the version marker and method name of a decoded envelope.
pub fn validate_envelope(envelope: &Map<String, Value>) -> McpResult<()> {
    match envelope.get(VERSION_FIELD) {
        None => {
            return Err(McpError::InvalidRequest(format!(
                "Missing required field: {VERSION_FIELD}"
            )))
        }
        Some(Value::String(v)) if v == JSONRPC_VERSION => {}
        Some(other) => {
            return Err(McpError::InvalidRequest(format!(
                "Expected {VERSION_FIELD} \"{JSONRPC_VERSION}\", got {other}"
            )))
        }
    }

    match envelope.get("method") {
        None => Err(McpError::InvalidRequest(
            "Missing required field: method".to_string(),
        )),
        Some(Value::String(method)) if method.is_empty() => Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        )),
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(McpError::InvalidRequest(
            "Method must be a string".to_string(),
        )),
    }
}
