//! Text <-> envelope conversion.

use serde_json::Value;

use crate::types::{JsonRpcRequest, McpError, McpResult, Params, RequestId, Response, JSONRPC_VERSION};

use super::validator::{extract_id, validate_envelope};

/// A payload that could not be turned into a request.
///
/// Keeps whatever id could be recovered so the error response can echo it.
#[derive(Debug)]
pub struct CodecError {
    pub id: RequestId,
    pub error: McpError,
}

impl CodecError {
    fn new(id: RequestId, error: McpError) -> Self {
        Self { id, error }
    }

    pub fn code(&self) -> i32 {
        self.error.code()
    }

    pub fn into_response(self) -> Response {
        Response::Error(self.error.to_json_rpc_error(self.id))
    }
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for CodecError {}

/// Parse one payload into a request.
///
/// Invalid JSON (including invalid UTF-8) is a parse error; a decoded value
/// with a bad envelope is an invalid request.
pub fn parse_request(data: impl AsRef<[u8]>) -> Result<JsonRpcRequest, CodecError> {
    let value: Value = serde_json::from_slice(data.as_ref())
        .map_err(|e| CodecError::new(RequestId::Null, McpError::ParseError(e.to_string())))?;

    let Value::Object(mut envelope) = value else {
        return Err(CodecError::new(
            RequestId::Null,
            McpError::InvalidRequest("Request must be a JSON object".to_string()),
        ));
    };

    let id = extract_id(&envelope).map_err(|e| CodecError::new(RequestId::Null, e))?;
    let reply_id = id.clone().unwrap_or(RequestId::Null);
    validate_envelope(&envelope).map_err(|e| CodecError::new(reply_id.clone(), e))?;

    let Some(Value::String(method)) = envelope.remove("method") else {
        return Err(CodecError::new(
            reply_id,
            McpError::InvalidRequest("Method must be a string".to_string()),
        ));
    };
    let params = match envelope.remove("params") {
        None | Some(Value::Null) => None,
        Some(params) => Some(params),
    };

    Ok(JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method,
        id,
        params,
    })
}

/// Serialize a response. Field order is `protocolVersion`, `id`, then
/// `result` or `error`.
pub fn serialize_response(response: &Response) -> McpResult<String> {
    serde_json::to_string(response).map_err(McpError::Json)
}

/// Handler parameters for a request. Omitted params become an empty map.
pub fn request_params(request: &JsonRpcRequest) -> McpResult<Params> {
    match &request.params {
        None | Some(Value::Null) => Ok(Params::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(McpError::InvalidParams(format!(
            "params must be an object, got {}",
            json_kind(other)
        ))),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
