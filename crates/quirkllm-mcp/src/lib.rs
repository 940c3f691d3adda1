//! QuirkLLM MCP server: JSON-RPC 2.0 over stdio for desktop MCP clients.

pub mod config;
pub mod protocol;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use protocol::ProtocolHandler;
pub use tools::{ToolProvider, ToolRegistry};
pub use transport::StdioTransport;
