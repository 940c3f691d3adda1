//! Session state machine for the initialize / initialized / shutdown handshake.

use crate::types::{McpError, McpResult};

pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const SHUTDOWN: &str = "shutdown";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}

use methods::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    ShuttingDown,
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::ShuttingDown => "shutting down",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// How out-of-order methods are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HandshakePolicy {
    /// Admit everything; log methods that arrive out of order.
    #[default]
    Tolerant,
    /// Reject out-of-order methods with `INVALID_REQUEST`.
    Strict,
}

/// Tracks handshake progress. Owned by the protocol handler and only touched
/// from the dispatch loop.
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    state: SessionState,
    policy: HandshakePolicy,
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new(HandshakePolicy::default())
    }
}

impl SessionLifecycle {
    pub fn new(policy: HandshakePolicy) -> Self {
        Self {
            state: SessionState::Uninitialized,
            policy,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn policy(&self) -> HandshakePolicy {
        self.policy
    }

    /// False once shutdown was requested or the stream ended.
    pub fn is_running(&self) -> bool {
        !matches!(
            self.state,
            SessionState::ShuttingDown | SessionState::Stopped
        )
    }

    /// Decide whether `method` may be dispatched in the current state.
    pub fn admit(&self, method: &str) -> McpResult<()> {
        if method == PING {
            return Ok(());
        }

        let violation = match self.state {
            SessionState::Uninitialized | SessionState::Initializing => match method {
                INITIALIZE if self.state == SessionState::Initializing => {
                    Some("Session is already initializing".to_string())
                }
                INITIALIZE | INITIALIZED | SHUTDOWN => None,
                _ => Some(format!(
                    "Method {method} called before initialization completed"
                )),
            },
            SessionState::Ready => match method {
                INITIALIZE => Some("Session is already initialized".to_string()),
                _ => None,
            },
            SessionState::ShuttingDown | SessionState::Stopped => Some(format!(
                "Method {method} called after shutdown"
            )),
        };

        match (violation, self.policy) {
            (None, _) => Ok(()),
            (Some(reason), HandshakePolicy::Tolerant) => {
                tracing::warn!("{reason} (state: {})", self.state);
                Ok(())
            }
            (Some(reason), HandshakePolicy::Strict) => Err(McpError::InvalidRequest(reason)),
        }
    }

    /// Apply the transition for a method whose handler completed successfully.
    pub fn observe(&mut self, method: &str) {
        let next = match (method, self.state) {
            (INITIALIZE, SessionState::Uninitialized) => SessionState::Initializing,
            (INITIALIZE, state) => {
                tracing::warn!("Duplicate initialize ignored (state: {state})");
                state
            }
            (INITIALIZED, SessionState::Uninitialized | SessionState::Initializing) => {
                tracing::info!("MCP handshake complete");
                SessionState::Ready
            }
            (SHUTDOWN, SessionState::Stopped) => SessionState::Stopped,
            (SHUTDOWN, _) => {
                tracing::info!("Shutdown requested");
                SessionState::ShuttingDown
            }
            (_, state) => state,
        };
        self.state = next;
    }

    /// The input stream closed or the loop exited.
    pub fn stop(&mut self) {
        self.state = SessionState::Stopped;
    }
}
