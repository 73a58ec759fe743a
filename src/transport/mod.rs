//! Pluggable transport abstraction.
//!
//! Every transport variant (line-framed stdio/TCP/WebSocket, Streamable-HTTP-SSE,
//! in-memory loopback) implements the same blocking `Transport` contract: connect,
//! establish a receiver, send, receive, register a notification handler, close,
//! and report liveness/introspection. The client core is written against this
//! trait alone and never downcasts to a concrete transport.

pub mod error;
pub mod factory;
pub mod line_framed;
pub mod memory;
pub mod stdio;
pub mod tcp;
#[cfg(unix)]
pub mod unix;
pub mod websocket;

pub mod adapters {
    pub mod sse;
}

pub use error::TransportError;
pub use factory::{connect, TransportTarget};

use async_trait::async_trait;
use bytes::Bytes;

/// A raw inbound message paired with a handler, delivered to whoever
/// registered a notification handler on this transport. `raw` carries the
/// exact bytes so the caller can classify request/response/notification
/// without this module needing to know about JSON-RPC shapes.
pub type NotificationHandler = Box<dyn Fn(Bytes) + Send + Sync>;

/// Coarse transport family, reported by [`Transport::get_transport_info`] for
/// logging/diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    Tcp,
    Unix,
    WebSocket,
    StreamableHttpSse,
    InMemory,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stdio => "stdio",
            Self::Tcp => "tcp",
            Self::Unix => "unix",
            Self::WebSocket => "websocket",
            Self::StreamableHttpSse => "streamable-http-sse",
            Self::InMemory => "in-memory",
        };
        write!(f, "{s}")
    }
}

/// Introspection snapshot returned by `get_transport_info()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInfo {
    pub kind: TransportKind,
    pub connected: bool,
    pub closed: bool,
    pub remote: Option<String>,
}

/// Blocking transport contract: connect once, then alternate send/receive at
/// the caller's pace, with out-of-band notifications fanned out through a
/// separately registered handler.
///
/// Implementations must be `Send + Sync` so the dispatch loop can own one as
/// a boxed trait object for its entire lifetime while the public `Call`/
/// `Notify` entry points reach it only by handing bytes through an outbound
/// channel, never by locking it directly.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the underlying connection (spawn child process, open a
    /// socket, perform the SSE GET handshake, etc). Must be idempotent: a
    /// second call on an already-connected transport is a no-op.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Start whatever background task is needed to receive inbound bytes
    /// out of band (a server-initiated request/notification arriving while
    /// the caller isn't blocked in `receive()`). Transports that deliver
    /// everything synchronously through `receive()` may implement this as
    /// a no-op.
    async fn establish_receiver(&mut self) -> Result<(), TransportError>;

    /// Send one complete message. Framing is the transport's responsibility.
    async fn send(&mut self, message: &[u8]) -> Result<(), TransportError>;

    /// Block until one complete message is available and return it.
    async fn receive(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Register the handler invoked for messages arriving outside a
    /// `receive()` call (see `establish_receiver`). Replaces any previously
    /// registered handler.
    fn set_notification_handler(&mut self, handler: NotificationHandler);

    /// Tear down the connection. Idempotent; safe to call from `Close` even
    /// if `connect` never succeeded.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// True once `connect` has succeeded and `close` has not yet been called.
    fn is_connected(&self) -> bool;

    /// True once `close` has completed.
    fn is_closed(&self) -> bool;

    /// Snapshot of transport kind and liveness for diagnostics.
    fn get_transport_info(&self) -> TransportInfo;
}
