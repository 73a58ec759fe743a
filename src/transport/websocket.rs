//! WebSocket transport: one JSON-RPC message per text frame.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::{NotificationHandler, Transport, TransportError, TransportInfo, TransportKind};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WebSocketTransport {
    url: String,
    stream: Option<WsStream>,
    notification_handler: Option<Arc<Mutex<NotificationHandler>>>,
    connected: bool,
    closed: bool,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
            notification_handler: None,
            connected: false,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.connected {
            return Ok(());
        }

        let (stream, _response) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|err| TransportError::WebSocket(err.to_string()))?;

        self.stream = Some(stream);
        self.connected = true;
        self.closed = false;

        debug!(url = %self.url, "websocket transport connected");
        Ok(())
    }

    async fn establish_receiver(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let text = String::from_utf8(message.to_vec())
            .map_err(|err| TransportError::SerializationError(err.to_string()))?;
        stream
            .send(Message::Text(text))
            .await
            .map_err(|err| TransportError::WebSocket(err.to_string()))
    }

    async fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.into_bytes()),
                Some(Ok(Message::Binary(bytes))) => return Ok(bytes.to_vec()),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
                Some(Ok(Message::Frame(_))) => continue,
                Some(Err(err)) => return Err(TransportError::WebSocket(err.to_string())),
            }
        }
    }

    fn set_notification_handler(&mut self, handler: NotificationHandler) {
        self.notification_handler = Some(Arc::new(Mutex::new(handler)));
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
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
            kind: TransportKind::WebSocket,
            connected: self.connected,
            closed: self.closed,
            remote: Some(self.url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_to_invalid_url_fails() {
        let mut transport = WebSocketTransport::new("ws://127.0.0.1:1/");
        let result = transport.connect().await;
        assert!(result.is_err());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn send_before_connect_errors() {
        let mut transport = WebSocketTransport::new("ws://example.invalid/");
        let result = transport.send(b"{}").await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }
}
