//! Current-dialect (`2025-03-26`, and `draft` by default) request shaping
//! and response parsing.

use serde_json::Value;
use uuid::Uuid;

use crate::protocol::{
    CallToolResponse, Content, JsonRpcRequest, ProtocolError, ProtocolResult, ProtocolVersion,
    RequestId,
};

use super::ProtocolHandler;

/// `tools/call` on the current dialect: arguments travel inside a `ToolCall`
/// envelope (`{id, toolName, input}`, `input` JSON-encoded), and the result
/// is `{toolCallId, output, error?}` where `output` may be a content array,
/// a plain string, or (rarely) an opaque value.
pub struct CurrentProtocolHandler {
    version: ProtocolVersion,
}

impl CurrentProtocolHandler {
    pub fn new(version: ProtocolVersion) -> Self {
        Self { version }
    }

    /// Interpret a `tools/call` result's `output` field per spec §4.6: a
    /// content array, a plain string wrapped into one `text` item, or (on
    /// parse failure / an opaque scalar) the raw value wrapped as text.
    fn content_from_output(&self, output: Value) -> ProtocolResult<Vec<Content>> {
        match output {
            Value::Array(_) => {
                let items: Vec<Content> =
                    serde_json::from_value(output).map_err(ProtocolError::Serialization)?;
                for item in &items {
                    item.validate_for_version(&self.version)?;
                }
                Ok(items)
            }
            Value::String(s) => {
                // The string might itself be a JSON-encoded content array;
                // try that before falling back to treating it as plain text.
                if let Ok(items) = serde_json::from_str::<Vec<Content>>(&s) {
                    for item in &items {
                        item.validate_for_version(&self.version)?;
                    }
                    Ok(items)
                } else {
                    Ok(vec![Content::text(s)])
                }
            }
            other => Ok(vec![Content::text(other.to_string())]),
        }
    }
}

impl ProtocolHandler for CurrentProtocolHandler {
    fn version(&self) -> &ProtocolVersion {
        &self.version
    }

    fn format_call_tool_request(&self, name: &str, arguments: Value, id: RequestId) -> JsonRpcRequest {
        let input = serde_json::to_string(&arguments).unwrap_or_else(|_| "null".to_string());
        let params = serde_json::json!({
            "id": Uuid::new_v4().to_string(),
            "toolName": name,
            "input": input,
        });
        JsonRpcRequest::new(crate::protocol::methods::TOOLS_CALL, Some(params), id)
    }

    fn parse_call_tool_result(&self, result: Value) -> ProtocolResult<CallToolResponse> {
        if let Some(error) = result.get("error").filter(|v| !v.is_null()) {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("tool call failed")
                .to_string();
            return Ok(CallToolResponse {
                content: vec![Content::text(message)],
                is_error: true,
            });
        }

        let output = result
            .get("output")
            .cloned()
            .ok_or_else(|| ProtocolError::invalid_message("tool call result missing output"))?;

        Ok(CallToolResponse {
            content: self.content_from_output(output)?,
            is_error: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_call_tool_request_wraps_in_tool_call_envelope() {
        let handler = CurrentProtocolHandler::new(ProtocolVersion::current());
        let req = handler.format_call_tool_request(
            "echo",
            serde_json::json!({"text": "hi"}),
            RequestId::new_number(1),
        );
        let params = req.params.unwrap();
        assert_eq!(params["toolName"], "echo");
        assert!(params["id"].is_string());
        assert!(params["input"].is_string());
    }

    #[test]
    fn parse_call_tool_result_accepts_content_array_output() {
        let handler = CurrentProtocolHandler::new(ProtocolVersion::current());
        let result = serde_json::json!({
            "toolCallId": "abc",
            "output": [{"type": "text", "text": "hello"}],
        });
        let parsed = handler.parse_call_tool_result(result).unwrap();
        assert_eq!(parsed.content.len(), 1);
        assert_eq!(parsed.content[0].as_text(), Some("hello"));
    }

    #[test]
    fn parse_call_tool_result_wraps_plain_string_output() {
        let handler = CurrentProtocolHandler::new(ProtocolVersion::current());
        let result = serde_json::json!({"toolCallId": "abc", "output": "plain text"});
        let parsed = handler.parse_call_tool_result(result).unwrap();
        assert_eq!(parsed.content[0].as_text(), Some("plain text"));
    }

    #[test]
    fn parse_call_tool_result_wraps_unparsable_scalar_as_text() {
        let handler = CurrentProtocolHandler::new(ProtocolVersion::current());
        let result = serde_json::json!({"toolCallId": "abc", "output": 42});
        let parsed = handler.parse_call_tool_result(result).unwrap();
        assert_eq!(parsed.content[0].as_text(), Some("42"));
    }

    #[test]
    fn parse_call_tool_result_surfaces_tool_error() {
        let handler = CurrentProtocolHandler::new(ProtocolVersion::current());
        let result = serde_json::json!({
            "toolCallId": "abc",
            "output": null,
            "error": {"message": "boom"},
        });
        let parsed = handler.parse_call_tool_result(result).unwrap();
        assert!(parsed.is_error);
        assert_eq!(parsed.content[0].as_text(), Some("boom"));
    }

    #[test]
    fn audio_content_rejected_even_on_current_dialect_if_invalid() {
        // current dialect allows audio; sanity check it's accepted.
        let handler = CurrentProtocolHandler::new(ProtocolVersion::current());
        let audio = Content::audio("SGVsbG8=", "audio/wav").unwrap();
        let result = serde_json::json!({"toolCallId": "abc", "output": [audio]});
        assert!(handler.parse_call_tool_result(result).is_ok());
    }
}
