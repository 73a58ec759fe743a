//! Shared newline-delimited framing for stdio/TCP transports.
//!
//! Both transports read length-unbounded, newline-terminated JSON messages
//! from an `AsyncRead` and write them (plus a trailing `\n`) to an
//! `AsyncWrite`. Keeping the framing logic here means `stdio.rs` and
//! `tcp.rs` differ only in how they obtain the underlying I/O halves.

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::error::TransportError;

/// Maximum accepted line length, guarding against an unbounded read if a
/// peer never sends a newline.
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Line-oriented reader wrapping any `AsyncBufRead` source.
pub struct LineFramedReader<R> {
    inner: BufReader<R>,
}

impl<R: tokio::io::AsyncRead + Unpin> LineFramedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }

    /// Read one newline-terminated message. Returns `TransportError::Closed`
    /// on EOF (peer closed the stream without a trailing newline).
    pub async fn read_message(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut line = String::new();
        let bytes_read = self
            .inner
            .read_line(&mut line)
            .await
            .map_err(TransportError::Io)?;

        if bytes_read == 0 {
            return Err(TransportError::Closed);
        }

        if line.len() > MAX_LINE_BYTES {
            return Err(TransportError::message_too_large(line.len(), MAX_LINE_BYTES));
        }

        let trimmed = line.trim_end_matches(['\n', '\r']);
        Ok(trimmed.as_bytes().to_vec())
    }
}

/// Line-oriented writer wrapping any `AsyncWrite` sink.
pub struct LineFramedWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> LineFramedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write_message(&mut self, message: &[u8]) -> Result<(), TransportError> {
        self.inner.write_all(message).await.map_err(TransportError::Io)?;
        self.inner.write_all(b"\n").await.map_err(TransportError::Io)?;
        self.inner.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }
}
