//! Error taxonomy for protocol-level parsing, validation, and wire-shaping.

use thiserror::Error;

use super::constants::error_codes;
use crate::transport::TransportError;

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors produced while parsing, validating, or formatting MCP wire types.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] JsonRpcError),

    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("invalid base64 data")]
    InvalidBase64Data,

    #[error("invalid protocol version: {0}")]
    InvalidProtocolVersion(String),

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("invalid MIME type: {0}")]
    InvalidMimeType(String),
}

impl ProtocolError {
    pub fn jsonrpc(err: JsonRpcError) -> Self {
        Self::JsonRpc(err)
    }

    pub fn mcp(err: McpError) -> Self {
        Self::Mcp(err)
    }

    pub fn transport(err: TransportError) -> Self {
        Self::Transport(err)
    }

    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }
}

/// Errors mapped directly onto the standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Error)]
pub enum JsonRpcError {
    #[error("parse error: {0}")]
    ParseError(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("internal error: {0}")]
    InternalError(String),

    #[error("server error ({code}): {message}")]
    ServerError { code: i32, message: String },
}

impl JsonRpcError {
    pub const PARSE_ERROR: i32 = error_codes::PARSE_ERROR;
    pub const INVALID_REQUEST: i32 = error_codes::INVALID_REQUEST;
    pub const METHOD_NOT_FOUND: i32 = error_codes::METHOD_NOT_FOUND;
    pub const INVALID_PARAMS: i32 = error_codes::INVALID_PARAMS;
    pub const INTERNAL_ERROR: i32 = error_codes::INTERNAL_ERROR;
    pub const SERVER_ERROR: i32 = error_codes::SERVER_ERROR;

    pub fn error_code(&self) -> i32 {
        match self {
            Self::ParseError(_) => Self::PARSE_ERROR,
            Self::InvalidRequest(_) => Self::INVALID_REQUEST,
            Self::MethodNotFound(_) => Self::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => Self::INVALID_PARAMS,
            Self::InternalError(_) => Self::INTERNAL_ERROR,
            Self::ServerError { code, .. } => *code,
        }
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound(method.into())
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// Reconstruct from a wire error object's `(code, message)` pair.
    pub fn from_code(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            c if c == Self::PARSE_ERROR => Self::ParseError(message),
            c if c == Self::INVALID_REQUEST => Self::InvalidRequest(message),
            c if c == Self::METHOD_NOT_FOUND => Self::MethodNotFound(message),
            c if c == Self::INVALID_PARAMS => Self::InvalidParams(message),
            c if c == Self::INTERNAL_ERROR => Self::InternalError(message),
            code => Self::ServerError { code, message },
        }
    }
}

/// Errors specific to MCP semantics layered on top of JSON-RPC.
#[derive(Debug, Clone, Error)]
pub enum McpError {
    #[error("protocol version mismatch: client supports {supported:?}, server offered {offered}")]
    VersionMismatch {
        supported: Vec<String>,
        offered: String,
    },

    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("request timed out after {0:?}")]
    RequestTimeout(std::time::Duration),
}

impl McpError {
    pub fn version_mismatch(supported: Vec<String>, offered: impl Into<String>) -> Self {
        Self::VersionMismatch {
            supported,
            offered: offered.into(),
        }
    }

    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Self::ResourceNotFound(uri.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonrpc_error_code_round_trips() {
        let err = JsonRpcError::method_not_found("tools/call");
        assert_eq!(err.error_code(), error_codes::METHOD_NOT_FOUND);
        let reconstructed = JsonRpcError::from_code(err.error_code(), "tools/call");
        assert_eq!(reconstructed.error_code(), err.error_code());
    }

    #[test]
    fn unknown_code_maps_to_server_error() {
        let err = JsonRpcError::from_code(-32010, "custom");
        assert_eq!(err.error_code(), -32010);
        assert!(matches!(err, JsonRpcError::ServerError { .. }));
    }
}
