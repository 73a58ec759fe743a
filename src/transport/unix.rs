//! Unix domain socket transport: newline-delimited JSON-RPC over a local
//! `AF_UNIX` stream socket. Same framing as [`super::tcp::TcpTransport`];
//! only the connection establishment differs.

#![cfg(unix)]

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tracing::debug;

use super::line_framed::{LineFramedReader, LineFramedWriter};
use super::{NotificationHandler, Transport, TransportError, TransportInfo, TransportKind};

pub struct UnixTransport {
    path: String,
    reader: Option<LineFramedReader<BufReader<OwnedReadHalf>>>,
    writer: Option<LineFramedWriter<OwnedWriteHalf>>,
    notification_handler: Option<Arc<Mutex<NotificationHandler>>>,
    connected: bool,
    closed: bool,
}

impl UnixTransport {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reader: None,
            writer: None,
            notification_handler: None,
            connected: false,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for UnixTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.connected {
            return Ok(());
        }

        let stream = UnixStream::connect(&self.path)
            .await
            .map_err(TransportError::Io)?;
        let (read_half, write_half) = stream.into_split();

        self.reader = Some(LineFramedReader::new(BufReader::new(read_half)));
        self.writer = Some(LineFramedWriter::new(write_half));
        self.connected = true;
        self.closed = false;

        debug!(path = %self.path, "unix transport connected");
        Ok(())
    }

    async fn establish_receiver(&mut self) -> Result<(), TransportError> {
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
        self.reader = None;
        self.writer = None;
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
            kind: TransportKind::Unix,
            connected: self.connected,
            closed: self.closed,
            remote: Some(self.path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_to_missing_socket_fails() {
        let mut transport = UnixTransport::new("/nonexistent/mcp.sock");
        let result = transport.connect().await;
        assert!(result.is_err());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn roundtrip_over_unix_listener() {
        let dir = std::env::temp_dir().join(format!("mcp-client-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mcp.sock");
        let _ = std::fs::remove_file(&path);

        let listener = tokio::net::UnixListener::bind(&path).unwrap();
        let server_path = path.clone();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read_half, write_half) = socket.into_split();
            let mut reader = LineFramedReader::new(BufReader::new(read_half));
            let mut writer = LineFramedWriter::new(write_half);
            let msg = reader.read_message().await.unwrap();
            assert_eq!(msg, b"ping");
            writer.write_message(b"pong").await.unwrap();
            let _ = server_path;
        });

        let mut client = UnixTransport::new(path.to_string_lossy().to_string());
        client.connect().await.unwrap();
        client.send(b"ping").await.unwrap();
        let response = client.receive().await.unwrap();
        assert_eq!(response, b"pong");

        server.await.unwrap();
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }
}
