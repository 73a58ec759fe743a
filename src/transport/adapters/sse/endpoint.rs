//! Endpoint-discovery race handling.
//!
//! The old dialect doesn't know where to POST messages until the server's
//! SSE stream emits an `endpoint` event carrying the path (and, typically,
//! a session id in its query string). Until that arrives, any `send()`
//! call must wait rather than guess. This is a one-shot value: once
//! discovered, the endpoint never changes for the life of the connection.

use tokio::sync::watch;

/// Where POSTed messages go, plus the session identity the server assigned
/// (old dialect: embedded in the endpoint URL's query string; current
/// dialect: the `Mcp-Session-Id` header, stored verbatim, never synthesized).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub post_url: String,
    pub session_id: Option<String>,
}

/// Guarded one-shot slot for the resolved endpoint, readable by multiple
/// waiters (the SSE reader task writes it once; any number of `send()`
/// callers can await it).
#[derive(Clone)]
pub struct EndpointGuard {
    tx: watch::Sender<Option<ResolvedEndpoint>>,
    rx: watch::Receiver<Option<ResolvedEndpoint>>,
}

impl EndpointGuard {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self { tx, rx }
    }

    /// Record the resolved endpoint. A second call is ignored: the first
    /// writer wins, matching the one-shot nature of endpoint discovery.
    pub fn resolve(&self, endpoint: ResolvedEndpoint) {
        if self.tx.borrow().is_none() {
            let _ = self.tx.send(Some(endpoint));
        }
    }

    /// Resolve immediately with the transport's own base URL, for dialects
    /// that never send a discovery event (current dialect: the base URL is
    /// already the POST target).
    pub fn resolve_default(&self, post_url: String) {
        self.resolve(ResolvedEndpoint {
            post_url,
            session_id: None,
        });
    }

    pub async fn wait(&self, timeout: std::time::Duration) -> Option<ResolvedEndpoint> {
        let mut rx = self.rx.clone();
        if let Some(resolved) = rx.borrow().clone() {
            return Some(resolved);
        }
        tokio::time::timeout(timeout, rx.changed()).await.ok()?;
        rx.borrow().clone()
    }

    pub fn current(&self) -> Option<ResolvedEndpoint> {
        self.rx.borrow().clone()
    }
}

impl Default for EndpointGuard {
    fn default() -> Self {
        Self::new()
    }
}
