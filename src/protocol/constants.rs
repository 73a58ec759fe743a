//! MCP protocol constants: method names, protocol versions, and standard
//! JSON-RPC/MCP error codes.

/// MCP protocol method and notification names.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";

    pub const RESOURCES_LIST: &str = "resources/list";
    pub const RESOURCES_READ: &str = "resources/read";
    pub const RESOURCES_SUBSCRIBE: &str = "resources/subscribe";
    pub const RESOURCES_UNSUBSCRIBE: &str = "resources/unsubscribe";
    pub const RESOURCES_TEMPLATES_LIST: &str = "resources/templates/list";
    pub const RESOURCES_UPDATED: &str = "notifications/resources/updated";
    pub const RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";

    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";

    pub const PROMPTS_LIST: &str = "prompts/list";
    pub const PROMPTS_GET: &str = "prompts/get";
    pub const PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";

    pub const LOGGING_SET_LEVEL: &str = "logging/setLevel";
    pub const LOGGING_MESSAGE: &str = "notifications/message";

    /// Client-advertised filesystem roots, listed on server request.
    pub const ROOTS_LIST: &str = "roots/list";
    pub const ROOTS_ADD: &str = "roots/add";
    pub const ROOTS_REMOVE: &str = "roots/remove";
    pub const ROOTS_LIST_CHANGED: &str = "notifications/roots/list_changed";

    /// Server-initiated sampling request, routed but not leaf-implemented.
    pub const SAMPLING_CREATE_MESSAGE: &str = "sampling/createMessage";

    pub const PROGRESS: &str = "notifications/progress";
    pub const CANCELLED: &str = "notifications/cancelled";

    pub const PING: &str = "ping";
}

/// Protocol version tags this crate negotiates.
pub mod versions {
    /// Current dialect: `Mcp-Session-Id` header, inline or SSE-delivered
    /// initialize response.
    pub const CURRENT: &str = "2025-03-26";
    /// Old dialect: `endpoint` SSE event carries session identity.
    pub const OLD: &str = "2024-11-05";
    /// Accepted but treated like `CURRENT` for wire shaping purposes.
    pub const DRAFT: &str = "draft";

    pub const SUPPORTED: &[&str] = &[CURRENT, OLD, DRAFT];
}

/// Standard JSON-RPC 2.0 error codes, plus MCP-reserved extensions.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const SERVER_ERROR: i32 = -32000;

    /// MCP-reserved: requested resource does not exist.
    pub const RESOURCE_NOT_FOUND: i32 = -32002;
}

/// Default values used when a caller doesn't supply their own config.
pub mod defaults {
    pub const CLIENT_NAME: &str = "mcp-client";
    pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const TIMEOUT_SECONDS: u64 = 30;
    pub const MAX_RETRIES: u32 = 3;
    pub const BUFFER_SIZE: usize = 8192;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_versions_include_current_old_and_draft() {
        assert!(versions::SUPPORTED.contains(&versions::CURRENT));
        assert!(versions::SUPPORTED.contains(&versions::OLD));
        assert!(versions::SUPPORTED.contains(&versions::DRAFT));
    }
}
