//! Stdio transport: the MCP server runs as a child process, communicating
//! over its stdin/stdout with one newline-delimited JSON message per line.

use std::process::Stdio as ProcStdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{BufReader, ChildStdin, ChildStdout};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::line_framed::{LineFramedReader, LineFramedWriter};
use super::{NotificationHandler, Transport, TransportError, TransportInfo, TransportKind};

/// Spawns and owns a child process, talking newline-delimited JSON-RPC over
/// its stdin/stdout.
pub struct StdioTransport {
    command: String,
    args: Vec<String>,
    child: Option<Child>,
    reader: Option<LineFramedReader<BufReader<ChildStdout>>>,
    writer: Option<LineFramedWriter<ChildStdin>>,
    notification_handler: Option<Arc<Mutex<NotificationHandler>>>,
    connected: bool,
    closed: bool,
}

impl StdioTransport {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            child: None,
            reader: None,
            writer: None,
            notification_handler: None,
            connected: false,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.connected {
            return Ok(());
        }

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(ProcStdio::piped())
            .stdout(ProcStdio::piped())
            .stderr(ProcStdio::inherit())
            .spawn()
            .map_err(TransportError::Io)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::other("child process has no stdin handle"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::other("child process has no stdout handle"))?;

        self.reader = Some(LineFramedReader::new(BufReader::new(stdout)));
        self.writer = Some(LineFramedWriter::new(stdin));
        self.child = Some(child);
        self.connected = true;
        self.closed = false;

        debug!(command = %self.command, "stdio transport connected");
        Ok(())
    }

    async fn establish_receiver(&mut self) -> Result<(), TransportError> {
        // Messages are pulled synchronously via `receive()`; stdio has no
        // separate out-of-band channel to start.
        Ok(())
    }

    async fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::NotConnected)?;
        writer.write_message(message).await
    }

    async fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        let reader = self.reader.as_mut().ok_or(TransportError::NotConnected)?;
        reader.read_message().await
    }

    fn set_notification_handler(&mut self, handler: NotificationHandler) {
        self.notification_handler = Some(Arc::new(Mutex::new(handler)));
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }

        self.writer = None;
        self.reader = None;

        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill().await {
                warn!(error = %err, "failed to kill child process during close");
            }
        }

        self.connected = false;
        self.closed = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn get_transport_info(&self) -> TransportInfo {
        TransportInfo {
            kind: TransportKind::Stdio,
            connected: self.connected,
            closed: self.closed,
            remote: Some(self.command.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_receive_before_connect_errors() {
        let mut transport = StdioTransport::new("cat", vec![]);
        assert!(transport.send(b"{}").await.is_err());
        assert!(transport.receive().await.is_err());
    }

    #[tokio::test]
    async fn close_before_connect_is_a_no_op() {
        let mut transport = StdioTransport::new("cat", vec![]);
        assert!(transport.close().await.is_ok());
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn transport_info_reports_command_as_remote() {
        let transport = StdioTransport::new("my-mcp-server", vec!["--flag".to_string()]);
        let info = transport.get_transport_info();
        assert_eq!(info.kind, TransportKind::Stdio);
        assert_eq!(info.remote.as_deref(), Some("my-mcp-server"));
        assert!(!info.connected);
    }
}
