//! Configuration for the Streamable-HTTP-SSE client transport.

use std::time::Duration;

/// Configuration for [`super::SseTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct SseTransportConfig {
    /// Base server URL; the GET (SSE) and POST (message send) requests both
    /// target this URL unless the server redirects them via the `endpoint`
    /// event (old dialect) or `Mcp-Session-Id` header (current dialect).
    pub base_url: String,

    /// How long to wait for the server to announce its `endpoint` event (old
    /// dialect) or first SSE byte (current dialect) before giving up.
    pub endpoint_discovery_timeout: Duration,

    /// Request timeout applied to each POST.
    pub request_timeout: Duration,

    /// If no `endpoint` event (and no `Mcp-Session-Id` response header)
    /// arrives within `endpoint_discovery_timeout`, treat `base_url` itself
    /// as the POST target rather than failing the send outright. This is
    /// the current dialect's behavior (§4.4 point 3); a server that only
    /// ever speaks the old dialect and is slow to emit `endpoint` will see
    /// its first POST go to the wrong place and fail with an HTTP error
    /// from the server itself rather than a local timeout. Disable this for
    /// a client known to be talking to an old-dialect-only server.
    pub assume_default_endpoint_on_timeout: bool,
}

impl SseTransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint_discovery_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            assume_default_endpoint_on_timeout: true,
        }
    }
}

pub mod headers {
    pub const SESSION_ID: &str = "Mcp-Session-Id";
    pub const LAST_EVENT_ID: &str = "Last-Event-ID";
}

pub mod events {
    /// Old-dialect event announcing where POSTed messages should go.
    pub const ENDPOINT: &str = "endpoint";
    /// Carries a JSON-RPC message on either dialect.
    pub const MESSAGE: &str = "message";
}

pub mod content_types {
    pub const EVENT_STREAM: &str = "text/event-stream";
    pub const JSON: &str = "application/json";
}
