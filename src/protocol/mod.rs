//! JSON-RPC envelope and MCP wire-type definitions.
//!
//! This module has no knowledge of transports or correlation; it only knows
//! how to shape and validate the bytes that cross the wire.

pub mod constants;
pub mod errors;
pub mod handler;
pub mod message;
pub mod types;

pub use constants::{defaults, error_codes, methods, versions};
pub use handler::{for_version, CurrentProtocolHandler, LegacyProtocolHandler, ProtocolHandler};
pub use errors::{JsonRpcError, McpError, ProtocolError, ProtocolResult};
pub use message::{
    JsonRpcErrorObject, JsonRpcMessage, JsonRpcMessageTrait, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, MessageKind, RequestId, JSONRPC_VERSION,
};
pub use types::{
    Base64Data, CallToolRequest, CallToolResponse, ClientCapabilities, ClientInfo, Content,
    GetPromptRequest, GetPromptResponse, InitializeRequest, InitializeResponse, ListPromptsRequest,
    ListPromptsResponse, ListResourceTemplatesRequest, ListResourceTemplatesResponse,
    ListResourcesRequest, ListResourcesResponse, ListRootsRequest, ListRootsResponse,
    ListToolsRequest, ListToolsResponse, LogLevel, LoggingCapabilities, MimeType, Prompt,
    PromptArgument, PromptCapabilities, PromptMessage, ProgressNotification, ProtocolVersion,
    ReadResourceRequest, ReadResourceResponse, RequestTokenRef, Resource, ResourceCapabilities,
    ResourceTemplate, Root, RootsCapabilities, SamplingCapabilities, ServerCapabilities,
    ServerInfo, SetLoggingRequest, SetLoggingResponse, SubscribeResourceRequest, Tool,
    ToolCapabilities, UnsubscribeResourceRequest, Uri,
};
