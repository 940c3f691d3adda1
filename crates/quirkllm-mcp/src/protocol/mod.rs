//! MCP protocol handling: codec, handler table, session lifecycle and dispatch.

pub mod codec;
pub mod handler;
pub mod lifecycle;
pub mod registry;
pub mod validator;

pub use codec::{parse_request, serialize_response, CodecError};
pub use handler::ProtocolHandler;
pub use lifecycle::{HandshakePolicy, SessionLifecycle, SessionState};
pub use registry::{Handler, HandlerRegistry};
