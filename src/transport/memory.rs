//! In-memory loopback transport, used by this crate's own integration tests
//! and available to embedders who want to drive an `McpClient` against a
//! hand-written server without any real I/O.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::{NotificationHandler, Transport, TransportError, TransportInfo, TransportKind};

/// One end of an in-memory channel pair. `InMemoryTransport::pair()` returns
/// two of these already wired to each other.
pub struct InMemoryTransport {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    notification_handler: Option<Arc<Mutex<NotificationHandler>>>,
    connected: bool,
    closed: bool,
}

impl InMemoryTransport {
    /// Build a connected pair: `(client_side, server_side)`. Both ends start
    /// already connected, matching a loopback transport's "always live"
    /// nature; `connect()` is a no-op for this transport.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();

        let a = Self {
            outbound: tx_a,
            inbound: rx_b,
            notification_handler: None,
            connected: true,
            closed: false,
        };
        let b = Self {
            outbound: tx_b,
            inbound: rx_a,
            notification_handler: None,
            connected: true,
            closed: false,
        };
        (a, b)
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        Ok(())
    }

    async fn establish_receiver(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(message.to_vec())
            .map_err(|_| TransportError::Closed)
    }

    async fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.inbound.recv().await.ok_or(TransportError::Closed)
    }

    fn set_notification_handler(&mut self, handler: NotificationHandler) {
        self.notification_handler = Some(Arc::new(Mutex::new(handler)));
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        self.closed = true;
        self.inbound.close();
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
            kind: TransportKind::InMemory,
            connected: self.connected,
            closed: self.closed,
            remote: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_delivers_messages_both_ways() {
        let (mut client, mut server) = InMemoryTransport::pair();

        client.send(b"ping").await.unwrap();
        let received = server.receive().await.unwrap();
        assert_eq!(received, b"ping");

        server.send(b"pong").await.unwrap();
        let received = client.receive().await.unwrap();
        assert_eq!(received, b"pong");
    }

    #[tokio::test]
    async fn closing_one_end_fails_its_own_send_and_receive() {
        let (mut client, _server) = InMemoryTransport::pair();
        client.close().await.unwrap();
        assert!(client.send(b"x").await.is_err());
        assert!(client.receive().await.is_err());
    }

    #[tokio::test]
    async fn closing_sender_end_surfaces_as_closed_on_receiver() {
        let (mut client, mut server) = InMemoryTransport::pair();
        client.close().await.unwrap();
        drop(client);
        let result = server.receive().await;
        assert!(matches!(result, Err(TransportError::Closed)));
    }
}
