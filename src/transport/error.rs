//! Transport-level error type, shared by every transport implementation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport connection is closed")]
    Closed,

    #[error("transport is not connected")]
    NotConnected,

    #[error("invalid connection target: {0}")]
    InvalidConnection(String),

    #[error("message format error: {message}")]
    Format { message: String },

    #[error("connection timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("message too large: {size} bytes (max: {max_size} bytes)")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("incomplete message received")]
    IncompleteMessage,

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("WebSocket transport error: {0}")]
    WebSocket(String),

    #[error("transport error: {details}")]
    Other { details: String },
}

impl TransportError {
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn message_too_large(size: usize, max_size: usize) -> Self {
        Self::MessageTooLarge { size, max_size }
    }

    pub fn parse_error(error: impl Into<String>) -> Self {
        Self::ParseError(error.into())
    }

    pub fn other(details: impl Into<String>) -> Self {
        Self::Other {
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
