//! Old-dialect (`2024-11-05`) request shaping and response parsing.

use serde_json::Value;

use crate::protocol::{
    CallToolResponse, Content, JsonRpcRequest, ProtocolError, ProtocolResult, ProtocolVersion,
    RequestId,
};

use super::ProtocolHandler;

/// `tools/call` on the old dialect: arguments travel directly in
/// `{name, arguments}`, and the result is a bare content array.
pub struct LegacyProtocolHandler {
    version: ProtocolVersion,
}

impl LegacyProtocolHandler {
    pub fn new(version: ProtocolVersion) -> Self {
        Self { version }
    }
}

impl ProtocolHandler for LegacyProtocolHandler {
    fn version(&self) -> &ProtocolVersion {
        &self.version
    }

    fn format_call_tool_request(&self, name: &str, arguments: Value, id: RequestId) -> JsonRpcRequest {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        JsonRpcRequest::new(crate::protocol::methods::TOOLS_CALL, Some(params), id)
    }

    fn parse_call_tool_result(&self, result: Value) -> ProtocolResult<CallToolResponse> {
        // The old dialect's result is `{content: [...], isError?}`, matching
        // CallToolResponse's own wire shape directly.
        let response: CallToolResponse = serde_json::from_value(result)
            .map_err(ProtocolError::Serialization)?;

        for item in &response.content {
            item.validate_for_version(&self.version)?;
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_call_tool_request_wraps_name_and_arguments_directly() {
        let handler = LegacyProtocolHandler::new(ProtocolVersion::old());
        let req = handler.format_call_tool_request(
            "echo",
            serde_json::json!({"text": "hi"}),
            RequestId::new_number(1),
        );
        assert_eq!(req.params.unwrap()["name"], "echo");
    }

    #[test]
    fn parse_call_tool_result_rejects_audio_content() {
        let handler = LegacyProtocolHandler::new(ProtocolVersion::old());
        let audio = Content::audio("SGVsbG8=", "audio/wav").unwrap();
        let result = serde_json::json!({
            "content": [audio],
            "isError": false,
        });
        assert!(handler.parse_call_tool_result(result).is_err());
    }

    #[test]
    fn parse_call_tool_result_accepts_text_content() {
        let handler = LegacyProtocolHandler::new(ProtocolVersion::old());
        let result = serde_json::json!({
            "content": [{"type": "text", "text": "hello"}],
            "isError": false,
        });
        let parsed = handler.parse_call_tool_result(result).unwrap();
        assert_eq!(parsed.content.len(), 1);
    }
}
