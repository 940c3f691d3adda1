//! Main request dispatcher. Receives JSON-RPC messages and routes them to handlers.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::ServerConfig;
use crate::tools::{ToolInvocationBridge, ToolProvider};
use crate::types::*;

use super::codec::{self, request_params};
use super::lifecycle::methods::{INITIALIZE, INITIALIZED, PING, SHUTDOWN};
use super::lifecycle::{SessionLifecycle, SessionState};
use super::registry::{Handler, HandlerRegistry};

/// The protocol engine: owns the handler table and the session state, and
/// turns one request into at most one response.
#[derive(Debug)]
pub struct ProtocolHandler {
    registry: HandlerRegistry,
    lifecycle: SessionLifecycle,
    server_info: Implementation,
    capabilities: ServerCapabilities,
}

impl ProtocolHandler {
    /// Build an engine with the core and tool methods registered.
    /// Capabilities are fixed here from whether `tools` is present.
    pub fn new(config: &ServerConfig, tools: Option<Arc<dyn ToolProvider>>) -> Self {
        let bridge = ToolInvocationBridge::new(tools);
        let server_info = config.server_info();
        let capabilities = ServerCapabilities::for_tools(bridge.has_tools());

        let mut registry = HandlerRegistry::new();
        register_core_handlers(&mut registry, &server_info, &capabilities);
        bridge.register(&mut registry);

        Self {
            registry,
            lifecycle: SessionLifecycle::new(config.handshake_policy()),
            server_info,
            capabilities,
        }
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// For registering extra methods before the run loop starts.
    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Mark the session stopped (stream closed or loop exited).
    pub fn stop(&mut self) {
        self.lifecycle.stop();
    }

    /// Handle one raw payload. Undecodable payloads get an error response
    /// carrying whatever id could be recovered.
    pub async fn handle_payload(&mut self, payload: &[u8]) -> Option<Response> {
        match codec::parse_request(payload) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                tracing::warn!("Rejected message: {e}");
                Some(e.into_response())
            }
        }
    }

    /// Text in, serialized response out. `None` for notifications.
    pub async fn process_message(&mut self, message: &str) -> McpResult<Option<String>> {
        match self.handle_payload(message.as_bytes()).await {
            Some(response) => codec::serialize_response(&response).map(Some),
            None => Ok(None),
        }
    }

    /// Dispatch a parsed request. Notifications are executed for their side
    /// effects and never answered.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<Response> {
        tracing::debug!("Received: {} (id: {:?})", request.method, request.id);

        let outcome = self.dispatch(&request).await;

        if request.is_notification() {
            if let Err(e) = outcome {
                tracing::debug!("Notification {} failed: {e}", request.method);
            }
            return None;
        }

        let id = request.response_id();
        Some(match outcome {
            Ok(result) => JsonRpcResponse::new(id, result).into(),
            Err(e) => {
                log_dispatch_error(&request.method, &e);
                e.to_json_rpc_error(id).into()
            }
        })
    }

    async fn dispatch(&mut self, request: &JsonRpcRequest) -> McpResult<Value> {
        let handler = self
            .registry
            .get(&request.method)
            .ok_or_else(|| McpError::MethodNotFound(request.method.clone()))?;
        self.lifecycle.admit(&request.method)?;

        let params = request_params(request)?;
        let result = handler.invoke(params).await?;

        self.lifecycle.observe(&request.method);
        Ok(result)
    }
}

fn log_dispatch_error(method: &str, error: &McpError) {
    match error {
        McpError::MethodNotFound(_) | McpError::InvalidParams(_) | McpError::InvalidRequest(_) => {
            tracing::warn!("{method}: {error}")
        }
        _ => tracing::error!("Handler error in {method}: {error}"),
    }
}

fn register_core_handlers(
    registry: &mut HandlerRegistry,
    server_info: &Implementation,
    capabilities: &ServerCapabilities,
) {
    let init = InitializeResult::new(server_info.clone(), capabilities.clone());
    registry.register(
        INITIALIZE,
        Handler::sync(move |params| {
            handle_initialize(params)?;
            serde_json::to_value(&init).map_err(|e| McpError::InternalError(e.to_string()))
        }),
    );
    registry.register_sync(INITIALIZED, |_| {
        tracing::info!("MCP session initialized");
        Ok(Value::Null)
    });
    registry.register_sync(SHUTDOWN, |_| Ok(Value::Object(Map::new())));
    registry.register_sync(PING, |_| Ok(Value::Object(Map::new())));
}

fn handle_initialize(params: Params) -> McpResult<()> {
    let params: InitializeParams = serde_json::from_value(Value::Object(params))
        .map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let client = params.client_info.unwrap_or_default();
    tracing::info!(
        "Initializing MCP session with client: {} v{}",
        client.name.as_deref().unwrap_or("unknown"),
        client.version.as_deref().unwrap_or("unknown")
    );

    if let Some(requested) = params.protocol_version.as_deref() {
        if requested != MCP_VERSION {
            tracing::warn!(
                "Client requested protocol version {requested}, server supports {MCP_VERSION}. Proceeding with server version."
            );
        }
    }
    Ok(())
}
