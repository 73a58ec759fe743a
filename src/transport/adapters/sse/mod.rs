//! Streamable-HTTP-SSE transport: the hardest of the transport variants.
//!
//! Bidirectional over two HTTP interactions — a long-lived GET that opens an
//! SSE stream for server-to-client delivery, and a POST per outbound message
//! for client-to-server delivery — bridged into one [`crate::transport::Transport`].
//! See `endpoint` for how the two dialects' differing session-discovery
//! handshakes are reconciled into a single one-shot value.

pub mod config;
pub mod endpoint;
pub mod transport;

pub use config::{content_types, events, headers, SseTransportConfig};
pub use endpoint::{EndpointGuard, ResolvedEndpoint};
pub use transport::SseTransport;
