//! Client-facing error taxonomy (spec §7).

use thiserror::Error;

use crate::correlation::CorrelationError;
use crate::protocol::{JsonRpcErrorObject, ProtocolError};
use crate::roots::RootsError;
use crate::transport::TransportError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client is not connected")]
    NotConnected,

    #[error("client is already connected")]
    AlreadyConnected,

    #[error("protocol version mismatch: server offered {offered}, supported {supported:?}")]
    VersionMismatch {
        supported: Vec<String>,
        offered: String,
    },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("server returned an error: {0}")]
    Server(JsonRpcErrorObject),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("request was cancelled")]
    Cancelled,

    #[error("client is closed")]
    Closed,

    #[error("roots error: {0}")]
    Roots(#[from] RootsError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl From<CorrelationError> for ClientError {
    fn from(err: CorrelationError) -> Self {
        match err {
            CorrelationError::Timeout { duration, .. } => Self::Timeout(duration),
            CorrelationError::Cancelled { .. } => Self::Cancelled,
            CorrelationError::RequestNotFound { .. } | CorrelationError::AlreadyCompleted { .. } => {
                Self::InvalidResponse(err.to_string())
            }
            CorrelationError::ChannelClosed { .. } | CorrelationError::Internal { .. } => {
                Self::Connection(err.to_string())
            }
        }
    }
}
