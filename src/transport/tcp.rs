//! TCP transport: newline-delimited JSON-RPC over a plain `TcpStream`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tracing::debug;

use super::line_framed::{LineFramedReader, LineFramedWriter};
use super::{NotificationHandler, Transport, TransportError, TransportInfo, TransportKind};

pub struct TcpTransport {
    addr: String,
    reader: Option<LineFramedReader<BufReader<OwnedReadHalf>>>,
    writer: Option<LineFramedWriter<OwnedWriteHalf>>,
    notification_handler: Option<Arc<Mutex<NotificationHandler>>>,
    connected: bool,
    closed: bool,
}

impl TcpTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            reader: None,
            writer: None,
            notification_handler: None,
            connected: false,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.connected {
            return Ok(());
        }

        let stream = TcpStream::connect(&self.addr).await.map_err(TransportError::Io)?;
        let (read_half, write_half) = stream.into_split();

        self.reader = Some(LineFramedReader::new(BufReader::new(read_half)));
        self.writer = Some(LineFramedWriter::new(write_half));
        self.connected = true;
        self.closed = false;

        debug!(addr = %self.addr, "tcp transport connected");
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
            kind: TransportKind::Tcp,
            connected: self.connected,
            closed: self.closed,
            remote: Some(self.addr.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_to_unreachable_address_fails() {
        let mut transport = TcpTransport::new("127.0.0.1:1");
        let result = transport.connect().await;
        assert!(result.is_err());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn roundtrip_over_loopback_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read_half, write_half) = socket.into_split();
            let mut reader = LineFramedReader::new(BufReader::new(read_half));
            let mut writer = LineFramedWriter::new(write_half);
            let msg = reader.read_message().await.unwrap();
            assert_eq!(msg, b"ping");
            writer.write_message(b"pong").await.unwrap();
        });

        let mut client = TcpTransport::new(addr.to_string());
        client.connect().await.unwrap();
        client.send(b"ping").await.unwrap();
        let response = client.receive().await.unwrap();
        assert_eq!(response, b"pong");

        server.await.unwrap();
    }
}
