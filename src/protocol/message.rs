//! JSON-RPC 2.0 envelope types.
//!
//! This module provides the three envelope shapes the spec defines: request,
//! response, and notification, plus the `RequestId` scalar shared by all of
//! them. All three share serialization behavior through `JsonRpcMessageTrait`.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 version literal used on every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC message as it arrives off the wire: request, response, or
/// notification, discriminated by the presence/absence of `id` and
/// `result`/`error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl JsonRpcMessage {
    /// Classify a raw JSON value without fully deserializing it into one of
    /// the three concrete shapes. Used by the dispatch loop to route before
    /// committing to a specific envelope type.
    pub fn classify(value: &Value) -> MessageKind {
        let has_id = value.get("id").is_some();
        let has_method = value.get("method").is_some();
        if has_method {
            if has_id {
                MessageKind::Request
            } else {
                MessageKind::Notification
            }
        } else if value.get("result").is_some() || value.get("error").is_some() {
            MessageKind::Response
        } else {
            MessageKind::Unknown
        }
    }
}

/// Coarse classification of an inbound JSON-RPC envelope, used for routing
/// before the full typed shape is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
    Notification,
    Unknown,
}

/// Shared serialization helpers for JSON-RPC envelope types.
///
/// Any type that is `Serialize + Deserialize` gets these for free; it exists
/// to avoid repeating the same `to_json`/`from_json` boilerplate on each of
/// the three envelope structs.
pub trait JsonRpcMessageTrait: Serialize + for<'de> Deserialize<'de> {
    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize directly to a buffer, avoiding an intermediate `String`
    /// allocation on the line-framed transport's send path.
    fn serialize_to_buffer(&self, buffer: &mut BytesMut) -> Result<(), serde_json::Error> {
        serde_json::to_writer(buffer.writer(), self)
    }

    fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        let mut buffer = BytesMut::with_capacity(256);
        self.serialize_to_buffer(&mut buffer)?;
        Ok(buffer.freeze())
    }

    fn from_json_bytes(json: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(json)
    }
}

/// A JSON-RPC request or response identifier.
///
/// Per JSON-RPC 2.0, ids may be strings or numbers. The client treats ids as
/// opaque scalars and compares them by stringification (`Display`), never by
/// numeric value, so a server that echoes `1` back as `"1"` still correlates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl RequestId {
    pub fn new_string(id: impl Into<String>) -> Self {
        RequestId::String(id.into())
    }

    pub fn new_number(id: i64) -> Self {
        RequestId::Number(id)
    }

    /// Canonical string key used for pending-request table lookups,
    /// independent of whether the id arrived as a JSON string or number.
    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Number(n) => write!(f, "{n}"),
        }
    }
}

/// JSON-RPC 2.0 request: has both `method` and `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RequestId,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

impl JsonRpcMessageTrait for JsonRpcRequest {}

/// JSON-RPC 2.0 response: carries exactly one of `result`/`error`, and the
/// `id` of the request it answers (`None` only for parse-error responses
/// that never matched an id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl JsonRpcResponse {
    pub fn success(result: Value, id: RequestId) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id: Some(id),
        }
    }

    pub fn error(error: JsonRpcErrorObject, id: Option<RequestId>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl JsonRpcMessageTrait for JsonRpcResponse {}

/// JSON-RPC 2.0 error object, per the spec's `{code, message, data?}` shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for JsonRpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// JSON-RPC 2.0 notification: has `method`, never has `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

impl JsonRpcMessageTrait for JsonRpcNotification {}
impl JsonRpcMessageTrait for JsonRpcMessage {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_id_stringifies_regardless_of_wire_shape() {
        assert_eq!(RequestId::new_number(7).as_key(), "7");
        assert_eq!(RequestId::new_string("7").as_key(), "7");
    }

    #[test]
    fn request_round_trips_through_json() {
        let req = JsonRpcRequest::new("tools/list", None, RequestId::new_number(1));
        let json = req.to_json().unwrap();
        let parsed = JsonRpcRequest::from_json(&json).unwrap();
        assert_eq!(req, parsed);
    }

    #[test]
    fn notification_has_no_id_field_on_wire() {
        let note = JsonRpcNotification::new("notifications/initialized", None);
        let json = note.to_json().unwrap();
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn response_is_mutually_exclusive_result_and_error() {
        let ok = JsonRpcResponse::success(json!({"ok": true}), RequestId::new_number(1));
        assert!(!ok.is_error());
        let err = JsonRpcResponse::error(
            JsonRpcErrorObject::new(-32601, "method not found"),
            Some(RequestId::new_number(1)),
        );
        assert!(err.is_error());
    }

    #[test]
    fn classify_recognizes_all_three_shapes() {
        assert_eq!(
            JsonRpcMessage::classify(&json!({"method": "x", "id": 1})),
            MessageKind::Request
        );
        assert_eq!(
            JsonRpcMessage::classify(&json!({"method": "x"})),
            MessageKind::Notification
        );
        assert_eq!(
            JsonRpcMessage::classify(&json!({"result": {}, "id": 1})),
            MessageKind::Response
        );
        assert_eq!(
            JsonRpcMessage::classify(&json!({"foo": "bar"})),
            MessageKind::Unknown
        );
    }

    #[test]
    fn untagged_message_deserializes_as_notification_when_no_id() {
        let raw = json!({"jsonrpc": "2.0", "method": "notifications/progress", "params": {"token": "t", "value": 1}});
        let msg: JsonRpcMessage = serde_json::from_value(raw).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Notification(_)));
    }

    proptest::proptest! {
        #[test]
        fn request_id_round_trips_through_json_for_any_number(n: i64) {
            let id = RequestId::new_number(n);
            let json = serde_json::to_string(&id).unwrap();
            let back: RequestId = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(id, back);
        }

        #[test]
        fn request_id_round_trips_through_json_for_any_string(s in "[a-zA-Z0-9_-]{0,32}") {
            let id = RequestId::new_string(s);
            let json = serde_json::to_string(&id).unwrap();
            let back: RequestId = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(id, back);
        }
    }
}
