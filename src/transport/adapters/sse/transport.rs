//! Client-side Streamable-HTTP-SSE transport: a GET request opens a
//! long-lived SSE stream for server-to-client delivery, while a POST per
//! outbound message carries client-to-server traffic. The two HTTP
//! exchanges are bridged into the same blocking `Transport` contract every
//! other transport implements.

use std::sync::Arc;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::config::{content_types, events, headers, SseTransportConfig};
use super::endpoint::{EndpointGuard, ResolvedEndpoint};
use crate::transport::{NotificationHandler, Transport, TransportError, TransportInfo, TransportKind};

pub struct SseTransport {
    config: SseTransportConfig,
    http: Client,
    endpoint: EndpointGuard,
    inbound_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    inbound_rx: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    reader_task: Option<JoinHandle<()>>,
    notification_handler: Option<Arc<NotificationHandler>>,
    connected: bool,
    closed: bool,
}

impl SseTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: SseTransportConfig::new(base_url),
            http: Client::new(),
            endpoint: EndpointGuard::new(),
            inbound_tx: None,
            inbound_rx: None,
            reader_task: None,
            notification_handler: None,
            connected: false,
            closed: false,
        }
    }

    pub fn with_config(config: SseTransportConfig) -> Self {
        Self {
            config,
            http: Client::new(),
            endpoint: EndpointGuard::new(),
            inbound_tx: None,
            inbound_rx: None,
            reader_task: None,
            notification_handler: None,
            connected: false,
            closed: false,
        }
    }

    fn resolve_post_url(&self, endpoint: &ResolvedEndpoint) -> String {
        match reqwest::Url::parse(&self.config.base_url) {
            Ok(base) => match base.join(&endpoint.post_url) {
                Ok(joined) => joined.to_string(),
                Err(_) => endpoint.post_url.clone(),
            },
            Err(_) => endpoint.post_url.clone(),
        }
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.connected {
            return Ok(());
        }

        let response = self
            .http
            .get(&self.config.base_url)
            .header(reqwest::header::ACCEPT, content_types::EVENT_STREAM)
            .send()
            .await
            .map_err(|err| TransportError::Http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Http(format!(
                "SSE handshake failed with status {}",
                response.status()
            )));
        }

        // Current dialect: the server hands back a session id header on the
        // same response that opens the stream, so the POST target is just
        // the base URL and no `endpoint` event is expected.
        if let Some(session_id) = response
            .headers()
            .get(headers::SESSION_ID)
            .and_then(|v| v.to_str().ok())
        {
            self.endpoint.resolve(ResolvedEndpoint {
                post_url: self.config.base_url.clone(),
                session_id: Some(session_id.to_string()),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.inbound_tx = Some(tx.clone());
        self.inbound_rx = Some(rx);

        let endpoint_guard = self.endpoint.clone();
        let base_url = self.config.base_url.clone();
        let handler = self.notification_handler.clone();

        let task = tokio::spawn(async move {
            let mut stream = response.bytes_stream().eventsource();
            while let Some(event) = stream.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(error = %err, "SSE stream error");
                        break;
                    }
                };

                match event.event.as_str() {
                    events::ENDPOINT => {
                        endpoint_guard.resolve(ResolvedEndpoint {
                            post_url: event.data,
                            session_id: None,
                        });
                    }
                    _ => {
                        trace!(bytes = event.data.len(), "SSE message event received");
                        let payload = event.data.into_bytes();
                        if let Some(handler) = &handler {
                            handler(bytes::Bytes::from(payload.clone()));
                        }
                        if tx.send(payload).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(url = %base_url, "SSE reader task exiting");
        });

        self.reader_task = Some(task);
        self.connected = true;
        self.closed = false;
        Ok(())
    }

    async fn establish_receiver(&mut self) -> Result<(), TransportError> {
        // The reader task is already running after `connect`; nothing else
        // to start.
        Ok(())
    }

    async fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let endpoint = match self.endpoint.wait(self.config.endpoint_discovery_timeout).await {
            Some(endpoint) => endpoint,
            None if self.config.assume_default_endpoint_on_timeout => {
                debug!("endpoint discovery timed out, assuming base URL is the POST target");
                self.endpoint.resolve_default(self.config.base_url.clone());
                match self.endpoint.current() {
                    Some(endpoint) => endpoint,
                    None => {
                        return Err(TransportError::Http(
                            "endpoint discovery timed out and default endpoint could not be resolved".into(),
                        ));
                    }
                }
            }
            None => {
                return Err(TransportError::Http("endpoint discovery timed out".into()));
            }
        };

        let post_url = self.resolve_post_url(&endpoint);
        let mut request = self
            .http
            .post(&post_url)
            .header(reqwest::header::CONTENT_TYPE, content_types::JSON)
            .timeout(self.config.request_timeout)
            .body(message.to_vec());

        if let Some(session_id) = &endpoint.session_id {
            request = request.header(headers::SESSION_ID, session_id.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|err| TransportError::Http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Http(format!(
                "POST to {post_url} failed with status {}",
                response.status()
            )));
        }

        // Current dialect allows the initialize response (or any response)
        // to arrive inline on the POST instead of over the SSE stream.
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with(content_types::JSON))
            .unwrap_or(false);

        if is_json {
            let body = response
                .bytes()
                .await
                .map_err(|err| TransportError::Http(err.to_string()))?;
            if !body.is_empty() {
                let payload = body.to_vec();
                if let Some(handler) = &self.notification_handler {
                    handler(bytes::Bytes::from(payload.clone()));
                }
                if let Some(tx) = &self.inbound_tx {
                    let _ = tx.send(payload);
                }
            }
        }

        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        let rx = self.inbound_rx.as_mut().ok_or(TransportError::NotConnected)?;
        rx.recv().await.ok_or(TransportError::Closed)
    }

    fn set_notification_handler(&mut self, handler: NotificationHandler) {
        self.notification_handler = Some(Arc::new(handler));
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        self.inbound_rx = None;
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
            kind: TransportKind::StreamableHttpSse,
            connected: self.connected,
            closed: self.closed,
            remote: Some(self.config.base_url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn connect_discovers_endpoint_from_old_dialect_sse_event() {
        let server = MockServer::start().await;
        let sse_body = "event: endpoint\ndata: /messages?sessionId=abc123\n\n";

        Mock::given(method("GET"))
            .and(path("/sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", content_types::EVENT_STREAM)
                    .set_body_raw(sse_body.as_bytes().to_vec(), content_types::EVENT_STREAM),
            )
            .mount(&server)
            .await;

        let mut transport = SseTransport::new(format!("{}/sse", server.uri()));
        transport.connect().await.unwrap();

        let endpoint = transport
            .endpoint
            .wait(std::time::Duration::from_secs(1))
            .await
            .expect("endpoint event resolves");
        assert_eq!(endpoint.post_url, "/messages?sessionId=abc123");
    }

    #[tokio::test]
    async fn current_dialect_session_header_resolves_endpoint_without_event() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", content_types::EVENT_STREAM)
                    .insert_header(headers::SESSION_ID, "session-xyz")
                    .set_body_raw(Vec::new(), content_types::EVENT_STREAM),
            )
            .mount(&server)
            .await;

        let mut transport = SseTransport::new(format!("{}/sse", server.uri()));
        transport.connect().await.unwrap();

        let endpoint = transport
            .endpoint
            .wait(std::time::Duration::from_secs(1))
            .await
            .expect("session header resolves endpoint immediately");
        assert_eq!(endpoint.session_id.as_deref(), Some("session-xyz"));
    }

    #[test]
    fn resolve_post_url_joins_relative_endpoint() {
        let transport = SseTransport::new("https://example.com/sse");
        let endpoint = ResolvedEndpoint {
            post_url: "/messages?session=abc".to_string(),
            session_id: Some("abc".to_string()),
        };
        let resolved = transport.resolve_post_url(&endpoint);
        assert_eq!(resolved, "https://example.com/messages?session=abc");
    }

    #[test]
    fn resolve_post_url_keeps_absolute_endpoint() {
        let transport = SseTransport::new("https://example.com/sse");
        let endpoint = ResolvedEndpoint {
            post_url: "https://other.example.com/messages".to_string(),
            session_id: None,
        };
        assert_eq!(
            transport.resolve_post_url(&endpoint),
            "https://other.example.com/messages"
        );
    }
}
