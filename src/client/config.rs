//! Client configuration and builder.

use chrono::TimeDelta;

use crate::correlation::CorrelationConfig;
use crate::protocol::{constants::defaults, ClientCapabilities, ClientInfo, ProtocolVersion};

/// Configuration consumed by [`super::McpClient::connect`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_info: ClientInfo,
    pub capabilities: ClientCapabilities,
    pub preferred_version: ProtocolVersion,
    pub default_timeout: TimeDelta,
    pub correlation: CorrelationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_info: ClientInfo {
                name: defaults::CLIENT_NAME.to_string(),
                version: defaults::CLIENT_VERSION.to_string(),
            },
            capabilities: ClientCapabilities::default(),
            preferred_version: ProtocolVersion::current(),
            default_timeout: TimeDelta::seconds(defaults::TIMEOUT_SECONDS as i64),
            correlation: CorrelationConfig::default(),
        }
    }
}

/// Builder for [`ClientConfig`], mirroring the fluent style used across the
/// rest of this crate's configuration types.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.config.client_info = ClientInfo {
            name: name.into(),
            version: version.into(),
        };
        self
    }

    pub fn capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.config.capabilities = capabilities;
        self
    }

    pub fn preferred_version(mut self, version: ProtocolVersion) -> Self {
        self.config.preferred_version = version;
        self
    }

    pub fn default_timeout(mut self, timeout: TimeDelta) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn correlation_config(mut self, correlation: CorrelationConfig) -> Self {
        self.config.correlation = correlation;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
