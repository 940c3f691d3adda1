//! Transport layer for MCP communication.

pub mod framing;
pub mod stdio;

pub use framing::MessageFramer;
pub use stdio::StdioTransport;
