//! mcp-client: the client-side core of a Model Context Protocol runtime.
//!
//! This crate is a bidirectional JSON-RPC 2.0 endpoint that negotiates a
//! protocol version with an MCP server, multiplexes concurrent requests and
//! notifications over any of several transports, and dispatches
//! server-initiated requests/notifications to application handlers. It does
//! not implement a server, leaf tool/resource/prompt handlers, or a CLI —
//! those are external collaborators that sit on top of [`McpClient`].
//!
//! # Architecture
//!
//! - [`protocol`] — JSON-RPC envelopes, MCP wire types, and the two
//!   version-dispatched request/response shaping implementations.
//! - [`transport`] — the pluggable `Transport` contract and its variants:
//!   line-framed stdio/TCP/WebSocket/Unix, Streamable-HTTP-SSE, and an
//!   in-memory loopback for tests.
//! - [`correlation`] — the pending-request table that matches responses back
//!   to their originating call by id.
//! - [`router`] — dispatch of server-initiated requests and notifications to
//!   application-registered handlers.
//! - [`roots`] — the client-advertised filesystem roots subsystem.
//! - [`client`] — the connection lifecycle state machine, the
//!   `initialize`/`initialized` handshake, and the public [`McpClient`] API
//!   built on top of the other four.
//!
//! # Quick start
//!
//! ```no_run
//! use mcp_client::{ClientConfigBuilder, McpClient};
//! use mcp_client::transport::connect;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = connect("stdio:my-mcp-server")?;
//! let config = ClientConfigBuilder::new()
//!     .client_info("my-app", "0.1.0")
//!     .build();
//!
//! let (client, _server_capabilities) = McpClient::connect_and_initialize(transport, config).await?;
//! let tools = client.list_tools().await?;
//! println!("server offers {} tools", tools.len());
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod correlation;
pub mod protocol;
pub mod roots;
pub mod router;
pub mod transport;

pub use client::{ClientConfig, ClientConfigBuilder, ClientError, ClientResult, McpClient};
pub use correlation::{CorrelationConfig, CorrelationError, CorrelationManager};
pub use protocol::{
    JsonRpcErrorObject, JsonRpcMessageTrait, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    ProtocolError, ProtocolVersion, RequestId,
};
pub use roots::{RootsError, RootsManager};
pub use router::Router;
pub use transport::{Transport, TransportError, TransportInfo};

/// The crate's own version, as recorded in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
