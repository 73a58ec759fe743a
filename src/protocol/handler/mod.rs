//! Version-dispatched request shaping and response parsing (spec §4.6).
//!
//! The wire shape of most MCP methods is identical across dialects; the
//! handler exists for the few places it isn't: `tools/call` request/response
//! shaping, and the dialect-specific validity of `Content::Audio`. Selected
//! once, at the end of the handshake, by [`for_version`].

mod current;
mod legacy;

pub use current::CurrentProtocolHandler;
pub use legacy::LegacyProtocolHandler;

use serde_json::Value;

use crate::protocol::{
    CallToolResponse, JsonRpcErrorObject, JsonRpcRequest, JsonRpcResponse, ProtocolResult,
    ProtocolVersion, RequestId,
};

/// Version-sensitive request shaping and response parsing, selected by
/// negotiated protocol version at handshake completion.
pub trait ProtocolHandler: Send + Sync {
    fn version(&self) -> &ProtocolVersion;

    /// Shape a plain JSON-RPC request envelope. Params are passed through
    /// unchanged for every method except `tools/call`, which has its own
    /// dedicated [`format_call_tool_request`](Self::format_call_tool_request).
    fn format_request(
        &self,
        method: &str,
        params: Option<Value>,
        id: RequestId,
    ) -> JsonRpcRequest {
        JsonRpcRequest::new(method, params, id)
    }

    /// Validate a response envelope and extract its result, surfacing a
    /// typed server error if the envelope carries one. Callers deserialize
    /// the returned [`Value`] into the response type their method expects.
    fn parse_response(&self, response: JsonRpcResponse) -> ProtocolResult<Value> {
        if let Some(error) = response.error {
            return Err(server_error(error));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// `initialize`'s result shape is tried first during the handshake,
    /// ahead of any other parse, since a generic-object response could
    /// otherwise be mistaken for a different method's result.
    fn parse_initialize_response(
        &self,
        response: JsonRpcResponse,
    ) -> ProtocolResult<crate::protocol::InitializeResponse> {
        let value = self.parse_response(response)?;
        serde_json::from_value(value).map_err(crate::protocol::ProtocolError::Serialization)
    }

    /// Shape a `tools/call` request. Old dialect wraps arguments directly in
    /// `{name, arguments}`; current dialect wraps them in a `ToolCall`
    /// envelope with a generated id. See the per-dialect impls.
    fn format_call_tool_request(&self, name: &str, arguments: Value, id: RequestId) -> JsonRpcRequest;

    /// Parse a `tools/call` result back into the dialect-neutral
    /// [`CallToolResponse`] shape, validating each content item against this
    /// dialect's rules (e.g. rejecting `audio` on the old dialect).
    fn parse_call_tool_result(&self, result: Value) -> ProtocolResult<CallToolResponse>;
}

fn server_error(error: JsonRpcErrorObject) -> crate::protocol::ProtocolError {
    crate::protocol::ProtocolError::JsonRpc(crate::protocol::JsonRpcError::from_code(
        error.code,
        error.message,
    ))
}

/// Select the handler implementation for a negotiated protocol version.
/// `draft` is treated like the current dialect (spec §9: "accepted but
/// validated defensively").
pub fn for_version(version: ProtocolVersion) -> Box<dyn ProtocolHandler> {
    if version.is_old() {
        Box::new(LegacyProtocolHandler::new(version))
    } else {
        Box::new(CurrentProtocolHandler::new(version))
    }
}
