//! Tool collaborator seam and the `tools/*` protocol methods.

pub mod bridge;
pub mod provider;
pub mod registry;

pub use bridge::ToolInvocationBridge;
pub use provider::ToolProvider;
pub use registry::ToolRegistry;
