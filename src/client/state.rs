//! Session state (spec §3, §4.7): the lifecycle machine plus the
//! negotiated-version/server-identity fields it carries once past the
//! handshake.

use crate::protocol::{ClientCapabilities, ProtocolVersion, ServerCapabilities, ServerInfo};

/// `Disconnected -> Connecting -> Connected -> Initialized -> Closing -> Closed`,
/// with an error-triggered return to `Disconnected` from any of the
/// connecting/connected states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Initialized,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// The session's negotiated identity, populated once the handshake completes.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub conn_state: Option<ConnectionState>,
    pub negotiated_version: Option<ProtocolVersion>,
    pub server_info: Option<ServerInfo>,
    pub server_capabilities: Option<ServerCapabilities>,
    pub client_capabilities: Option<ClientCapabilities>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            conn_state: Some(ConnectionState::Disconnected),
            ..Default::default()
        }
    }

    pub fn conn_state(&self) -> ConnectionState {
        self.conn_state.unwrap_or(ConnectionState::Disconnected)
    }
}
