//! MCP wire types: validated newtypes, capability structs, and the request/
//! response/result payloads carried inside JSON-RPC envelopes.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::constants::versions;
use super::errors::{ProtocolError, ProtocolResult};

/// MCP protocol version tag (`2025-03-26`, `2024-11-05`, or `draft`).
///
/// Unlike a semantic version, these are a small fixed set of string tags; a
/// version this crate has never heard of is rejected rather than guessed at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ProtocolVersion(String);

impl ProtocolVersion {
    pub const CURRENT: &'static str = versions::CURRENT;
    pub const OLD: &'static str = versions::OLD;
    pub const DRAFT: &'static str = versions::DRAFT;

    pub fn new(version: impl Into<String>) -> ProtocolResult<Self> {
        let version = version.into();
        if versions::SUPPORTED.contains(&version.as_str()) {
            Ok(Self(version))
        } else {
            Err(ProtocolError::InvalidProtocolVersion(version))
        }
    }

    pub fn current() -> Self {
        Self(Self::CURRENT.to_string())
    }

    pub fn old() -> Self {
        Self(Self::OLD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_current(&self) -> bool {
        self.0 == Self::CURRENT
    }

    pub fn is_old(&self) -> bool {
        self.0 == Self::OLD
    }

    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated URI newtype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Uri(String);

impl Uri {
    pub fn new(uri: impl Into<String>) -> ProtocolResult<Self> {
        let uri = uri.into();
        if Self::is_valid(&uri) {
            Ok(Self(uri))
        } else {
            Err(ProtocolError::InvalidUri(uri))
        }
    }

    /// Construct without validation, for values already known to be valid
    /// (e.g. echoed back from a server response).
    pub fn new_unchecked(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scheme(&self) -> Option<&str> {
        self.0.split(':').next()
    }

    pub fn is_file_uri(&self) -> bool {
        self.scheme() == Some("file")
    }

    pub fn is_http_uri(&self) -> bool {
        matches!(self.scheme(), Some("http") | Some("https"))
    }

    fn is_valid(uri: &str) -> bool {
        !uri.is_empty() && uri.contains(':') && !uri.starts_with(':')
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated `type/subtype` MIME type newtype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MimeType(String);

impl MimeType {
    pub fn new(mime_type: impl Into<String>) -> ProtocolResult<Self> {
        let mime_type = mime_type.into();
        if Self::is_valid(&mime_type) {
            Ok(Self(mime_type))
        } else {
            Err(ProtocolError::InvalidMimeType(mime_type))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn main_type(&self) -> &str {
        self.0.split('/').next().unwrap_or("")
    }

    pub fn sub_type(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or("")
    }

    pub fn is_text(&self) -> bool {
        self.main_type() == "text"
    }

    pub fn is_image(&self) -> bool {
        self.main_type() == "image"
    }

    pub fn is_audio(&self) -> bool {
        self.main_type() == "audio"
    }

    fn is_valid(mime_type: &str) -> bool {
        let parts: Vec<&str> = mime_type.split('/').collect();
        parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty()
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated base64 payload newtype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Base64Data(String);

impl Base64Data {
    pub fn new(data: impl Into<String>) -> ProtocolResult<Self> {
        let data = data.into();
        if Self::is_valid(&data) {
            Ok(Self(data))
        } else {
            Err(ProtocolError::InvalidBase64Data)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn is_valid(data: &str) -> bool {
        !data.is_empty()
            && data
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
            && !data.trim_end_matches('=').contains('=')
    }
}

impl fmt::Display for Base64Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity advertised by the client during `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Identity returned by the server during `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Multi-modal content carried in tool results and prompt messages.
///
/// `Audio` is only valid on the current dialect; [`Content::validate_for_version`]
/// is the gate the protocol handler uses before formatting a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "image")]
    Image {
        data: Base64Data,
        #[serde(rename = "mimeType")]
        mime_type: MimeType,
    },

    #[serde(rename = "audio")]
    Audio {
        data: Base64Data,
        #[serde(rename = "mimeType")]
        mime_type: MimeType,
    },

    #[serde(rename = "resource")]
    Resource {
        resource: Uri,
        text: Option<String>,
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<MimeType>,
    },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> ProtocolResult<Self> {
        Ok(Self::Image {
            data: Base64Data::new(data)?,
            mime_type: MimeType::new(mime_type)?,
        })
    }

    pub fn audio(data: impl Into<String>, mime_type: impl Into<String>) -> ProtocolResult<Self> {
        Ok(Self::Audio {
            data: Base64Data::new(data)?,
            mime_type: MimeType::new(mime_type)?,
        })
    }

    pub fn resource(
        uri: impl Into<String>,
        text: Option<impl Into<String>>,
        mime_type: Option<impl Into<String>>,
    ) -> ProtocolResult<Self> {
        let mime_type = match mime_type {
            Some(mt) => Some(MimeType::new(mt)?),
            None => None,
        };
        Ok(Self::Resource {
            resource: Uri::new(uri)?,
            text: text.map(Into::into),
            mime_type,
        })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio { .. })
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Reject variants the negotiated protocol version doesn't carry.
    /// `Audio` was introduced in the current dialect and has no old-dialect
    /// wire representation.
    pub fn validate_for_version(&self, version: &ProtocolVersion) -> ProtocolResult<()> {
        if matches!(self, Self::Audio { .. }) && !version.is_current() {
            return Err(ProtocolError::invalid_message(format!(
                "audio content is not supported on protocol version {version}"
            )));
        }
        Ok(())
    }
}

/// Tool descriptor returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientCapabilities {
    pub experimental: Option<Value>,
    pub sampling: Option<SamplingCapabilities>,
    pub roots: Option<RootsCapabilities>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServerCapabilities {
    pub experimental: Option<Value>,
    pub logging: Option<LoggingCapabilities>,
    pub prompts: Option<PromptCapabilities>,
    pub resources: Option<ResourceCapabilities>,
    pub tools: Option<ToolCapabilities>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SamplingCapabilities {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RootsCapabilities {
    #[serde(rename = "listChanged")]
    pub list_changed: Option<bool>,
}

impl Default for RootsCapabilities {
    fn default() -> Self {
        Self {
            list_changed: Some(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LoggingCapabilities {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptCapabilities {
    #[serde(rename = "listChanged")]
    pub list_changed: Option<bool>,
}

impl Default for PromptCapabilities {
    fn default() -> Self {
        Self {
            list_changed: Some(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceCapabilities {
    pub subscribe: Option<bool>,
    #[serde(rename = "listChanged")]
    pub list_changed: Option<bool>,
}

impl Default for ResourceCapabilities {
    fn default() -> Self {
        Self {
            subscribe: Some(false),
            list_changed: Some(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCapabilities {
    #[serde(rename = "listChanged")]
    pub list_changed: Option<bool>,
}

impl Default for ToolCapabilities {
    fn default() -> Self {
        Self {
            list_changed: Some(false),
        }
    }
}

/// Client-advertised filesystem root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Root {
    pub uri: Uri,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<Value>,
}

impl Root {
    pub fn new(uri: Uri, name: Option<impl Into<String>>) -> Self {
        Self {
            uri,
            name: name.map(Into::into),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptArgument {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
}

impl PromptArgument {
    pub fn required(name: impl Into<String>, description: Option<impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            description: description.map(Into::into),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: Option<impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            description: description.map(Into::into),
            required: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptMessage {
    pub role: String,
    pub content: Content,
}

impl PromptMessage {
    pub fn user(content: Content) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }

    pub fn assistant(content: Content) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub uri: Uri,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<MimeType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceTemplate {
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<MimeType>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Alert => "alert",
            Self::Emergency => "emergency",
        }
    }
}

// ---- Initialize ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeRequest {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: ProtocolVersion,
    pub capabilities: ClientCapabilities,
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeResponse {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: ProtocolVersion,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    pub instructions: Option<String>,
}

// ---- Logging ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetLoggingRequest {
    pub level: LogLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SetLoggingResponse {}

// ---- Prompts ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetPromptRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetPromptResponse {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ListPromptsRequest {
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListPromptsResponse {
    pub prompts: Vec<Prompt>,
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<String>,
}

// ---- Resources ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadResourceRequest {
    pub uri: Uri,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadResourceResponse {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscribeResourceRequest {
    pub uri: Uri,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnsubscribeResourceRequest {
    pub uri: Uri,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ListResourcesRequest {
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResourcesResponse {
    pub resources: Vec<Resource>,
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ListResourceTemplatesRequest {
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResourceTemplatesResponse {
    #[serde(rename = "resourceTemplates")]
    pub resource_templates: Vec<ResourceTemplate>,
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<String>,
}

// ---- Tools ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ListToolsRequest {
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListToolsResponse {
    pub tools: Vec<Tool>,
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallToolRequest {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallToolResponse {
    pub content: Vec<Content>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

// ---- Roots ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ListRootsRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListRootsResponse {
    pub roots: Vec<Root>,
}

// ---- Progress ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressNotification {
    #[serde(rename = "progressToken")]
    pub progress_token: RequestTokenRef,
    pub progress: f64,
    pub total: Option<f64>,
    pub message: Option<String>,
}

/// A progress token as it travels on the wire: same string-or-number shape
/// as `RequestId`, but conceptually distinct (it tags a stream of updates,
/// not a single request/response pair).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestTokenRef {
    String(String),
    Number(i64),
}

impl fmt::Display for RequestTokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_version_rejects_unknown_tag() {
        assert!(ProtocolVersion::new("2099-01-01").is_err());
        assert!(ProtocolVersion::new(versions::CURRENT).is_ok());
        assert!(ProtocolVersion::new(versions::DRAFT).is_ok());
    }

    #[test]
    fn uri_requires_scheme() {
        assert!(Uri::new("file:///tmp").is_ok());
        assert!(Uri::new("not-a-uri").is_err());
    }

    #[test]
    fn mime_type_requires_slash() {
        assert!(MimeType::new("text/plain").is_ok());
        assert!(MimeType::new("invalid").is_err());
    }

    #[test]
    fn base64_rejects_embedded_padding() {
        assert!(Base64Data::new("SGVsbG8=").is_ok());
        assert!(Base64Data::new("SGVs=bG8=").is_err());
        assert!(Base64Data::new("not valid!@#").is_err());
    }

    #[test]
    fn audio_content_rejected_on_old_dialect() {
        let audio = Content::audio("SGVsbG8=", "audio/wav").unwrap();
        assert!(audio.validate_for_version(&ProtocolVersion::old()).is_err());
        assert!(audio
            .validate_for_version(&ProtocolVersion::current())
            .is_ok());
    }

    #[test]
    fn text_content_has_no_version_restriction() {
        let text = Content::text("hello");
        assert!(text.validate_for_version(&ProtocolVersion::old()).is_ok());
    }

    #[test]
    fn content_serializes_with_type_tag() {
        let content = Content::text("hello");
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "text");
    }
}
