//! Message framing: `Content-Length` headers, with bare JSON lines accepted
//! on input.
//!
//! ```text
//! Content-Length: <N>\r\n
//! \r\n
//! <N bytes of UTF-8 JSON>
//! ```

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

use crate::types::{McpError, McpResult};

/// Upper bound on a single payload unless configured otherwise.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 8 * 1024 * 1024;

const CONTENT_LENGTH: &[u8] = b"content-length:";

/// Longest header line accepted when the payload cap is smaller.
const MAX_HEADER_BYTES: usize = 1024;

const LINE_TERMINATOR_BYTES: usize = 2;

/// Reads and writes one JSON payload at a time over a byte stream pair.
pub struct MessageFramer<R, W> {
    reader: BufReader<R>,
    writer: W,
    max_message_bytes: usize,
}

impl<R, W> MessageFramer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    pub fn with_max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = max;
        self
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader.into_inner(), self.writer)
    }

    /// Read the next payload. `Ok(None)` means the stream closed cleanly
    /// between messages.
    pub async fn read_message(&mut self) -> McpResult<Option<Vec<u8>>> {
        loop {
            let Some(line) = self.read_line().await? else {
                return Ok(None);
            };

            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }

            return match parse_content_length(trimmed)? {
                Some(length) => self.read_framed_body(length).await.map(Some),
                None => {
                    self.check_size(trimmed.len())?;
                    Ok(Some(trimmed.to_vec()))
                }
            };
        }
    }

    /// Write one payload with its `Content-Length` header and flush.
    pub async fn write_message(&mut self, payload: &[u8]) -> McpResult<()> {
        let header = format!("Content-Length: {}\r\n\r\n", payload.len());
        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(payload).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read up to and including the next `\n`. Lines longer than the
    /// payload cap (or [`MAX_HEADER_BYTES`] for small caps) fail before they
    /// are fully buffered.
    async fn read_line(&mut self) -> McpResult<Option<Vec<u8>>> {
        let limit = self.max_message_bytes.max(MAX_HEADER_BYTES) + LINE_TERMINATOR_BYTES;
        let mut line = Vec::new();
        let n = (&mut self.reader)
            .take(limit as u64)
            .read_until(b'\n', &mut line)
            .await?;
        if n == 0 {
            return Ok(None);
        }
        if n >= limit && line.last() != Some(&b'\n') {
            return Err(McpError::MessageTooLarge {
                size: n,
                max: self.max_message_bytes,
            });
        }
        Ok(Some(line))
    }

    async fn read_framed_body(&mut self, length: usize) -> McpResult<Vec<u8>> {
        self.check_size(length)?;

        // Remaining headers end at the first blank line.
        loop {
            let Some(line) = self.read_line().await? else {
                return Err(McpError::Transport(
                    "Stream ended inside a message header".to_string(),
                ));
            };
            let header = line.trim_ascii();
            if header.is_empty() {
                break;
            }
            tracing::debug!("Ignoring header: {}", String::from_utf8_lossy(header));
        }

        let mut body = vec![0u8; length];
        self.reader.read_exact(&mut body).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                McpError::Transport(format!(
                    "Stream ended before {length}-byte message body was complete"
                ))
            } else {
                McpError::Io(e)
            }
        })?;
        Ok(body)
    }

    fn check_size(&self, size: usize) -> McpResult<()> {
        if size > self.max_message_bytes {
            return Err(McpError::MessageTooLarge {
                size,
                max: self.max_message_bytes,
            });
        }
        Ok(())
    }
}

/// `Some(n)` for a `Content-Length: n` line, `None` for anything else.
fn parse_content_length(line: &[u8]) -> McpResult<Option<usize>> {
    let is_header = line.len() >= CONTENT_LENGTH.len()
        && line[..CONTENT_LENGTH.len()].eq_ignore_ascii_case(CONTENT_LENGTH);
    if !is_header {
        return Ok(None);
    }

    let value = String::from_utf8_lossy(&line[CONTENT_LENGTH.len()..]);
    value
        .trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|_| McpError::Transport(format!("Invalid Content-Length value: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_all(input: &[u8]) -> Vec<McpResult<Option<Vec<u8>>>> {
        let mut framer = MessageFramer::new(input, Vec::new());
        let mut out = Vec::new();
        loop {
            let next = framer.read_message().await;
            let done = !matches!(next, Ok(Some(_)));
            out.push(next);
            if done {
                return out;
            }
        }
    }

    #[tokio::test]
    async fn reads_content_length_frame() {
        let body = br#"{"protocolVersion":"2.0","method":"ping","id":1}"#;
        let mut input = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        input.extend_from_slice(body);

        let results = read_all(&input).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().as_deref(), Some(&body[..]));
        assert!(matches!(results[1], Ok(None)));
    }

    #[tokio::test]
    async fn header_name_is_case_insensitive_and_extra_headers_are_skipped() {
        let body = br#"{"a":1}"#;
        let input = format!(
            "content-length: {}\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n{}",
            body.len(),
            std::str::from_utf8(body).unwrap()
        );
        let mut framer = MessageFramer::new(input.as_bytes(), Vec::new());
        assert_eq!(framer.read_message().await.unwrap().unwrap(), body.to_vec());
    }

    #[tokio::test]
    async fn bare_lines_are_payloads() {
        let input = b"{\"a\":1}\r\n\n{\"b\":2}\n";
        let mut framer = MessageFramer::new(&input[..], Vec::new());
        assert_eq!(framer.read_message().await.unwrap().unwrap(), b"{\"a\":1}".to_vec());
        assert_eq!(framer.read_message().await.unwrap().unwrap(), b"{\"b\":2}".to_vec());
        assert!(framer.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn truncated_body_is_an_error() {
        let input = b"Content-Length: 20\r\n\r\n{\"short\":1}";
        let mut framer = MessageFramer::new(&input[..], Vec::new());
        let err = framer.read_message().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("20-byte"));
    }

    #[tokio::test]
    async fn eof_inside_header_is_an_error() {
        let input = b"Content-Length: 5\r\n";
        let mut framer = MessageFramer::new(&input[..], Vec::new());
        assert!(matches!(
            framer.read_message().await,
            Err(McpError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn malformed_length_is_an_error() {
        let input = b"Content-Length: twelve\r\n\r\n";
        let mut framer = MessageFramer::new(&input[..], Vec::new());
        assert!(matches!(
            framer.read_message().await,
            Err(McpError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let input = b"Content-Length: 1000\r\n\r\n";
        let mut framer = MessageFramer::new(&input[..], Vec::new()).with_max_message_bytes(10);
        assert!(matches!(
            framer.read_message().await,
            Err(McpError::MessageTooLarge { size: 1000, max: 10 })
        ));
    }

    #[tokio::test]
    async fn endless_line_hits_the_cap() {
        let mut framer =
            MessageFramer::new(tokio::io::repeat(b'x'), Vec::new()).with_max_message_bytes(1024);
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(500), framer.read_message())
                .await
                .expect("read must stop at the cap");
        assert!(matches!(
            result,
            Err(McpError::MessageTooLarge { max: 1024, .. })
        ));
    }

    #[tokio::test]
    async fn long_bare_line_is_rejected() {
        let mut input = vec![b'x'; 64];
        input.push(b'\n');
        let mut framer = MessageFramer::new(&input[..], Vec::new()).with_max_message_bytes(16);
        assert!(matches!(
            framer.read_message().await,
            Err(McpError::MessageTooLarge { size: 64, max: 16 })
        ));
    }

    #[tokio::test]
    async fn writes_length_prefixed_frame() {
        let mut framer = MessageFramer::new(&b""[..], Vec::new());
        framer.write_message("{\"é\":1}".as_bytes()).await.unwrap();
        let (_, written) = framer.into_inner();
        assert_eq!(written, "Content-Length: 8\r\n\r\n{\"é\":1}".as_bytes());
    }

    #[tokio::test]
    async fn reads_from_chunked_stream() {
        let reader = tokio_test::io::Builder::new()
            .read(b"Content-Len")
            .read(b"gth: 7\r\n")
            .read(b"\r\n{\"a\"")
            .read(b":1}")
            .build();
        let mut framer = MessageFramer::new(reader, Vec::new());
        assert_eq!(framer.read_message().await.unwrap().unwrap(), b"{\"a\":1}".to_vec());
        assert!(framer.read_message().await.unwrap().is_none());
    }
}
