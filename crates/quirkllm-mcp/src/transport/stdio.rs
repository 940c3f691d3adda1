//! Stdio transport: reads framed JSON-RPC from stdin and writes to stdout.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::protocol::{codec, ProtocolHandler};
use crate::types::McpResult;

use super::framing::{MessageFramer, DEFAULT_MAX_MESSAGE_BYTES};

/// Stdio transport for desktop MCP clients.
///
/// One message is read, dispatched and answered before the next read starts.
pub struct StdioTransport {
    handler: ProtocolHandler,
    max_message_bytes: usize,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self {
            handler,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    pub fn with_max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = max;
        self
    }

    pub fn handler(&self) -> &ProtocolHandler {
        &self.handler
    }

    /// Run the transport loop on the process stdin/stdout.
    pub async fn run(&mut self) -> McpResult<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Run the read-dispatch-write loop until EOF, `shutdown`, or a framing
    /// error. Framing errors are returned; everything else is answered.
    pub async fn serve<R, W>(&mut self, reader: R, writer: W) -> McpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut framer =
            MessageFramer::new(reader, writer).with_max_message_bytes(self.max_message_bytes);

        tracing::info!(
            "Starting MCP server: {} v{}",
            self.handler.server_info().name,
            self.handler.server_info().version
        );

        let result = self.pump(&mut framer).await;
        if let Err(e) = &result {
            tracing::error!("Transport failed: {e}");
        }

        self.handler.stop();
        tracing::info!("MCP server stopped");
        result
    }

    async fn pump<R, W>(&mut self, framer: &mut MessageFramer<R, W>) -> McpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while self.handler.is_running() {
            let Some(payload) = framer.read_message().await? else {
                tracing::info!("EOF on stdin, shutting down");
                break;
            };

            if let Some(response) = self.handler.handle_payload(&payload).await {
                match codec::serialize_response(&response) {
                    Ok(text) => framer.write_message(text.as_bytes()).await?,
                    Err(e) if !e.is_fatal() => {
                        tracing::error!("Dropping response {}: {e}", response.id())
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }
}
