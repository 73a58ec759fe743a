//! The MCP client core (spec §4.7): connection lifecycle, the
//! `initialize`/`initialized` handshake, request/response correlation, and
//! the high-level convenience methods built on top of `Call`.
//!
//! The dispatch loop (see `dispatch`) is the only task that ever touches the
//! transport directly; everything here reaches it through an outbound
//! channel, which is what lets `Call` be safe to invoke from any number of
//! concurrent callers.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod state;

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ClientError, ClientResult};
pub use state::{ConnectionState, SessionState};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::correlation::CorrelationManager;
use crate::protocol::{
    error_codes, for_version, methods, versions, CallToolResponse,
    GetPromptRequest, GetPromptResponse, InitializeRequest, InitializeResponse,
    JsonRpcErrorObject, JsonRpcMessageTrait, JsonRpcNotification, JsonRpcRequest, LogLevel,
    ListPromptsRequest, ListPromptsResponse, ListResourcesRequest, ListResourcesResponse,
    ListRootsResponse, ListToolsRequest, ListToolsResponse, ProtocolError, ProtocolHandler,
    ProtocolVersion, ReadResourceRequest, ReadResourceResponse, RequestId, Resource,
    ServerCapabilities, ServerInfo, SetLoggingRequest, SetLoggingResponse,
    SubscribeResourceRequest, Tool, Uri, UnsubscribeResourceRequest,
};
use crate::roots::{RootsError, RootsManager, RootsRpc};
use crate::router::{RequestHandler, Router};
use crate::transport::{Transport, TransportInfo};

use self::dispatch::{send_via_loop, OutboundMessage, OutboundSender};

/// The number of outbound writes that may be queued for the dispatch loop
/// before a sender backs up; generous enough that it only matters under
/// pathological fan-out.
const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// State and machinery shared between the public [`McpClient`] handle and
/// the [`RootsRpc`] implementation handed to [`RootsManager`]. Kept
/// separate from `McpClient` so cloning a client handle is cheap (an `Arc`
/// bump) and so `RootsManager` can hold a reference back without the two
/// modules depending on each other's public surface.
struct ClientInner {
    outbound_tx: OutboundSender,
    correlation: Arc<CorrelationManager>,
    router: Arc<Router>,
    state: RwLock<SessionState>,
    config: ClientConfig,
    transport_info: TransportInfo,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl ClientInner {
    async fn conn_state(&self) -> ConnectionState {
        self.state.read().await.conn_state()
    }

    async fn set_conn_state(&self, state: ConnectionState) {
        self.state.write().await.conn_state = Some(state);
    }

    async fn negotiated_version(&self) -> ProtocolVersion {
        self.state
            .read()
            .await
            .negotiated_version
            .clone()
            .unwrap_or_else(|| self.config.preferred_version.clone())
    }

    /// Send a request and wait for its matching response, enforcing `timeout`
    /// independently of the correlation table's own background expiry sweep
    /// (spec §8 scenario 6 requires sub-100ms resolution for a 50ms timeout).
    async fn call_raw(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> ClientResult<Value> {
        if self.conn_state().await != ConnectionState::Initialized && method != methods::INITIALIZE {
            return Err(ClientError::NotConnected);
        }

        let request_timeout =
            TimeDelta::from_std(timeout).unwrap_or(self.config.default_timeout);
        let (id, rx) = self
            .correlation
            .register_request(Some(request_timeout), params.clone().unwrap_or(Value::Null))
            .await
            .map_err(ClientError::from)?;

        let request = JsonRpcRequest::new(method, params, id.clone());
        let bytes = request
            .to_bytes()
            .map_err(ProtocolError::Serialization)
            .map_err(ClientError::from)?
            .to_vec();

        if let Err(err) = send_via_loop(&self.outbound_tx, bytes).await {
            let _ = self.correlation.cancel_request(&id);
            return Err(ClientError::Transport(err));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(envelope))) => extract_result(envelope),
            Ok(Ok(Err(correlation_err))) => Err(ClientError::from(correlation_err)),
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => {
                let _ = self.correlation.cancel_request(&id);
                Err(ClientError::Timeout(timeout))
            }
        }
    }

    async fn notify_raw(&self, method: &str, params: Option<Value>) -> ClientResult<()> {
        let notification = JsonRpcNotification::new(method, params);
        let bytes = notification
            .to_bytes()
            .map_err(ProtocolError::Serialization)
            .map_err(ClientError::from)?
            .to_vec();
        send_via_loop(&self.outbound_tx, bytes)
            .await
            .map_err(ClientError::Transport)
    }

    fn default_timeout_std(&self) -> Duration {
        self.config
            .default_timeout
            .to_std()
            .unwrap_or(Duration::from_secs(30))
    }

    /// Tear down the dispatch loop and mark the session as `target_state`.
    /// Idempotent: a second call finds no handle to join and returns at once.
    /// Also stops the correlation table's background cleanup task, so a
    /// closed client leaves no task ticking on its behalf (spec §5:
    /// "cancellation never leaks resources").
    async fn teardown(&self, target_state: ConnectionState) {
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.dispatch_handle.lock().await.take() {
            let _ = handle.await;
        }
        self.correlation.shutdown().await;
        self.set_conn_state(target_state).await;
    }
}

fn to_params(value: impl serde::Serialize) -> ClientResult<Value> {
    serde_json::to_value(value)
        .map_err(ProtocolError::Serialization)
        .map_err(ClientError::from)
}

fn extract_result(envelope: Value) -> ClientResult<Value> {
    if let Some(error) = envelope.get("error").filter(|v| !v.is_null()) {
        let error_obj: JsonRpcErrorObject = serde_json::from_value(error.clone())
            .unwrap_or_else(|_| JsonRpcErrorObject::new(error_codes::INTERNAL_ERROR, "malformed error envelope"));
        return Err(ClientError::Server(error_obj));
    }
    Ok(envelope.get("result").cloned().unwrap_or(Value::Null))
}

#[async_trait]
impl RootsRpc for ClientInner {
    async fn call_roots_add(&self, root: &crate::protocol::Root) -> Result<(), RootsError> {
        let params = serde_json::to_value(root).unwrap_or(Value::Null);
        self.call_raw(methods::ROOTS_ADD, Some(params), self.default_timeout_std())
            .await
            .map(|_| ())
            .map_err(|err| RootsError::Rpc(err.to_string()))
    }

    async fn call_roots_remove(&self, uri: &Uri) -> Result<(), RootsError> {
        let params = serde_json::json!({"uri": uri.as_str()});
        self.call_raw(methods::ROOTS_REMOVE, Some(params), self.default_timeout_std())
            .await
            .map(|_| ())
            .map_err(|err| RootsError::Rpc(err.to_string()))
    }

    async fn notify_roots_list_changed(&self) -> Result<(), RootsError> {
        self.notify_raw(methods::ROOTS_LIST_CHANGED, None)
            .await
            .map_err(|err| RootsError::Rpc(err.to_string()))
    }

    fn is_initialized(&self) -> bool {
        // `conn_state` is async; RootsManager's call sites are themselves
        // async, so checking through a blocking read here would risk
        // deadlocking the single-threaded test runtime. The session state
        // only moves forward once initialized, so a relaxed snapshot read
        // via try_read is sufficient for this advisory check.
        self.state
            .try_read()
            .map(|s| s.conn_state() == ConnectionState::Initialized)
            .unwrap_or(false)
    }

    fn roots_list_changed_enabled(&self) -> bool {
        self.state
            .try_read()
            .ok()
            .and_then(|s| s.client_capabilities.clone())
            .and_then(|caps| caps.roots)
            .and_then(|roots| roots.list_changed)
            .unwrap_or(false)
    }
}

/// A connected, handshaken MCP client. Cheap to clone (an `Arc` bump); every
/// clone shares the same dispatch loop, correlation table, and roots set.
#[derive(Clone)]
pub struct McpClient {
    inner: Arc<ClientInner>,
    roots: Arc<RootsManager>,
}

impl McpClient {
    /// Establish the transport connection and start the dispatch loop. The
    /// client is `Connected` but not yet `Initialized`; call
    /// [`McpClient::initialize`] next, or use [`McpClient::connect_and_initialize`]
    /// to do both in one step with handshake-failure teardown.
    pub async fn connect(mut transport: Box<dyn Transport>, config: ClientConfig) -> ClientResult<Self> {
        transport
            .connect()
            .await
            .map_err(|err| ClientError::Connection(err.to_string()))?;

        if let Err(err) = transport.establish_receiver().await {
            let _ = transport.close().await;
            return Err(ClientError::Connection(err.to_string()));
        }

        let transport_info = transport.get_transport_info();
        let correlation = Arc::new(CorrelationManager::new(config.correlation.clone()));
        let router = Arc::new(Router::new());
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let mut state = SessionState::new();
        state.conn_state = Some(ConnectionState::Connected);
        state.client_capabilities = Some(config.capabilities.clone());

        let inner = Arc::new(ClientInner {
            outbound_tx: outbound_tx.clone(),
            correlation: Arc::clone(&correlation),
            router: Arc::clone(&router),
            state: RwLock::new(state),
            config,
            transport_info,
            dispatch_handle: Mutex::new(None),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
        });

        let handle = tokio::spawn(dispatch::run(
            transport,
            outbound_rx,
            shutdown_rx,
            correlation,
            Arc::clone(&router),
            outbound_tx,
        ));
        *inner.dispatch_handle.lock().await = Some(handle);

        router.notify_connection_status(true).await;

        let roots = Arc::new(RootsManager::new(inner.clone() as Arc<dyn RootsRpc>));
        let client = Self { inner, roots };
        client.register_roots_list_handler().await;

        Ok(client)
    }

    /// Connect and run the `initialize`/`initialized` handshake in one step.
    /// On any handshake failure the transport is torn down and the client is
    /// left `Disconnected`, matching spec §8's "connect fails" scenarios.
    pub async fn connect_and_initialize(
        transport: Box<dyn Transport>,
        config: ClientConfig,
    ) -> ClientResult<(Self, ServerCapabilities)> {
        let client = Self::connect(transport, config).await?;
        match client.initialize().await {
            Ok(caps) => Ok((client, caps)),
            Err(err) => {
                client.inner.teardown(ConnectionState::Disconnected).await;
                Err(err)
            }
        }
    }

    /// Run the `initialize` handshake (spec §4.7). Rejects the negotiated
    /// version with [`ClientError::VersionMismatch`] if the server selects a
    /// dialect outside [`crate::protocol::versions::SUPPORTED`].
    pub async fn initialize(&self) -> ClientResult<ServerCapabilities> {
        match self.inner.conn_state().await {
            ConnectionState::Connected => {}
            ConnectionState::Initialized => return Err(ClientError::AlreadyConnected),
            _ => return Err(ClientError::NotConnected),
        }

        let request = InitializeRequest {
            protocol_version: self.inner.config.preferred_version.clone(),
            capabilities: self.inner.config.capabilities.clone(),
            client_info: self.inner.config.client_info.clone(),
        };
        let params = serde_json::to_value(&request)
            .map_err(ProtocolError::Serialization)
            .map_err(ClientError::from)?;

        let result = self
            .inner
            .call_raw(methods::INITIALIZE, Some(params), self.inner.default_timeout_std())
            .await?;

        let response: InitializeResponse = serde_json::from_value(result)
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;

        if !versions::SUPPORTED.contains(&response.protocol_version.as_str()) {
            let _ = self.inner.teardown(ConnectionState::Disconnected).await;
            return Err(ClientError::VersionMismatch {
                supported: versions::SUPPORTED.iter().map(|s| s.to_string()).collect(),
                offered: response.protocol_version.as_str().to_string(),
            });
        }

        {
            let mut state = self.inner.state.write().await;
            state.negotiated_version = Some(response.protocol_version.clone());
            state.server_info = Some(response.server_info.clone());
            state.server_capabilities = Some(response.capabilities.clone());
            state.conn_state = Some(ConnectionState::Initialized);
        }

        self.inner.notify_raw(methods::INITIALIZED, None).await?;

        Ok(response.capabilities)
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.inner.conn_state().await
    }

    pub async fn is_initialized(&self) -> bool {
        self.inner.conn_state().await == ConnectionState::Initialized
    }

    pub async fn negotiated_version(&self) -> Option<ProtocolVersion> {
        self.inner.state.read().await.negotiated_version.clone()
    }

    pub async fn server_info(&self) -> Option<ServerInfo> {
        self.inner.state.read().await.server_info.clone()
    }

    pub async fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.inner.state.read().await.server_capabilities.clone()
    }

    pub fn get_transport_info(&self) -> &TransportInfo {
        &self.inner.transport_info
    }

    /// Register a handler for server-initiated requests or notifications.
    /// Exposed directly for methods this client doesn't wrap (e.g.
    /// `sampling/createMessage`); the well-known notifications have typed
    /// subscription helpers below.
    pub fn router(&self) -> &Arc<Router> {
        &self.inner.router
    }

    pub async fn on_progress(&self, callback: Arc<dyn Fn(crate::protocol::ProgressNotification) + Send + Sync>) {
        self.inner.router.on_progress(callback).await;
    }

    pub async fn on_resource_update(&self, uri: Uri, callback: Arc<dyn Fn(Uri) + Send + Sync>) {
        self.inner.router.on_resource_update(uri, callback).await;
    }

    pub async fn on_log(&self, callback: Arc<dyn Fn(LogLevel, String) + Send + Sync>) {
        self.inner.router.on_log(callback).await;
    }

    pub async fn on_connection_status(&self, callback: Arc<dyn Fn(bool) + Send + Sync>) {
        self.inner.router.on_connection_status(callback).await;
    }

    async fn call(&self, method: &str, params: Option<Value>) -> ClientResult<Value> {
        self.inner
            .call_raw(method, params, self.inner.default_timeout_std())
            .await
    }

    /// Issue `method` with `params`, enforcing `timeout` instead of the
    /// client's configured default (spec §8 scenario 6).
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> ClientResult<Value> {
        self.inner.call_raw(method, params, timeout).await
    }

    // ---- Tools ----

    pub async fn list_tools(&self) -> ClientResult<Vec<Tool>> {
        let result = self
            .call(methods::TOOLS_LIST, Some(to_params(ListToolsRequest::default())?))
            .await?;
        let response: ListToolsResponse =
            serde_json::from_value(result).map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(response.tools)
    }

    pub async fn call_tool(&self, name: impl Into<String>, arguments: Value) -> ClientResult<CallToolResponse> {
        if self.inner.conn_state().await != ConnectionState::Initialized {
            return Err(ClientError::NotConnected);
        }

        let name = name.into();
        let version = self.inner.negotiated_version().await;
        let handler = for_version(version);

        let (id, rx) = self
            .inner
            .correlation
            .register_request(Some(self.inner.config.default_timeout), arguments.clone())
            .await
            .map_err(ClientError::from)?;

        let request = handler.format_call_tool_request(&name, arguments, id.clone());
        let bytes = request
            .to_bytes()
            .map_err(ProtocolError::Serialization)
            .map_err(ClientError::from)?
            .to_vec();

        if let Err(err) = send_via_loop(&self.inner.outbound_tx, bytes).await {
            let _ = self.inner.correlation.cancel_request(&id);
            return Err(ClientError::Transport(err));
        }

        let timeout = self.inner.default_timeout_std();
        let envelope = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(envelope))) => envelope,
            Ok(Ok(Err(correlation_err))) => return Err(ClientError::from(correlation_err)),
            Ok(Err(_)) => return Err(ClientError::Closed),
            Err(_) => {
                let _ = self.inner.correlation.cancel_request(&id);
                return Err(ClientError::Timeout(timeout));
            }
        };

        let result = extract_result(envelope)?;
        handler
            .parse_call_tool_result(result)
            .map_err(ClientError::from)
    }

    // ---- Resources ----

    pub async fn list_resources(&self) -> ClientResult<Vec<Resource>> {
        let result = self
            .call(methods::RESOURCES_LIST, Some(to_params(ListResourcesRequest::default())?))
            .await?;
        let response: ListResourcesResponse =
            serde_json::from_value(result).map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(response.resources)
    }

    pub async fn read_resource(&self, uri: Uri) -> ClientResult<ReadResourceResponse> {
        let request = ReadResourceRequest { uri };
        let result = self.call(methods::RESOURCES_READ, Some(to_params(request)?)).await?;
        serde_json::from_value(result).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    pub async fn subscribe_to_resource(&self, uri: Uri) -> ClientResult<()> {
        let request = SubscribeResourceRequest { uri };
        self.call(methods::RESOURCES_SUBSCRIBE, Some(to_params(request)?)).await?;
        Ok(())
    }

    pub async fn unsubscribe_from_resource(&self, uri: Uri) -> ClientResult<()> {
        let request = UnsubscribeResourceRequest { uri };
        self.call(methods::RESOURCES_UNSUBSCRIBE, Some(to_params(request)?)).await?;
        Ok(())
    }

    // ---- Prompts ----

    pub async fn list_prompts(&self) -> ClientResult<ListPromptsResponse> {
        let result = self
            .call(methods::PROMPTS_LIST, Some(to_params(ListPromptsRequest::default())?))
            .await?;
        serde_json::from_value(result).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    pub async fn get_prompt(
        &self,
        name: impl Into<String>,
        arguments: HashMap<String, String>,
    ) -> ClientResult<GetPromptResponse> {
        let request = GetPromptRequest { name: name.into(), arguments };
        let result = self.call(methods::PROMPTS_GET, Some(to_params(request)?)).await?;
        serde_json::from_value(result).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    // ---- Logging ----

    pub async fn set_logging_level(&self, level: LogLevel) -> ClientResult<SetLoggingResponse> {
        let request = SetLoggingRequest { level };
        let result = self.call(methods::LOGGING_SET_LEVEL, Some(to_params(request)?)).await?;
        serde_json::from_value(result).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    // ---- Roots ----

    pub async fn add_root(
        &self,
        uri: Uri,
        name: Option<impl Into<String>>,
        metadata: Option<Value>,
    ) -> ClientResult<()> {
        self.roots.add_root(uri, name, metadata).await.map_err(ClientError::from)
    }

    pub async fn remove_root(&self, uri: &Uri) -> ClientResult<()> {
        self.roots.remove_root(uri).await.map_err(ClientError::from)
    }

    pub async fn roots(&self) -> Vec<crate::protocol::Root> {
        self.roots.snapshot().await
    }

    /// Registers the server-facing `roots/list` handler once, at connect
    /// time, returning a snapshot of the local roots view.
    async fn register_roots_list_handler(&self) {
        let roots = Arc::clone(&self.roots);
        let handler: Arc<dyn RequestHandler> = Arc::new(RootsListHandler { roots });
        self.inner.router.on_request(methods::ROOTS_LIST, handler).await;
    }

    /// Close the client: stop the dispatch loop, close the transport, cancel
    /// every pending request. Idempotent — a second call finds nothing left
    /// to tear down.
    pub async fn close(&self) -> ClientResult<()> {
        if self.inner.conn_state().await == ConnectionState::Closed {
            return Ok(());
        }
        self.inner.set_conn_state(ConnectionState::Closing).await;
        self.inner.teardown(ConnectionState::Closed).await;
        Ok(())
    }
}

/// Server-facing `roots/list` handler: snapshots the local roots view on
/// every invocation rather than caching, since the set can change between
/// calls via `AddRoot`/`RemoveRoot`.
struct RootsListHandler {
    roots: Arc<RootsManager>,
}

#[async_trait]
impl RequestHandler for RootsListHandler {
    async fn handle(&self, id: RequestId, _params: Option<Value>) -> crate::protocol::JsonRpcResponse {
        let roots = self.roots.snapshot().await;
        let response = ListRootsResponse { roots };
        match serde_json::to_value(response) {
            Ok(value) => crate::protocol::JsonRpcResponse::success(value, id),
            Err(err) => crate::protocol::JsonRpcResponse::error(
                JsonRpcErrorObject::new(error_codes::INTERNAL_ERROR, err.to_string()),
                Some(id),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::InMemoryTransport;

    fn test_config() -> ClientConfig {
        ClientConfigBuilder::new()
            .client_info("test-client", "0.0.0")
            .build()
    }

    #[tokio::test]
    async fn connect_reaches_connected_state() {
        let (client_transport, _server_transport) = InMemoryTransport::pair();
        let client = McpClient::connect(Box::new(client_transport), test_config())
            .await
            .unwrap();
        assert_eq!(client.connection_state().await, ConnectionState::Connected);
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (client_transport, _server_transport) = InMemoryTransport::pair();
        let client = McpClient::connect(Box::new(client_transport), test_config())
            .await
            .unwrap();
        client.close().await.unwrap();
        client.close().await.unwrap();
        assert_eq!(client.connection_state().await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn call_before_initialize_is_rejected() {
        let (client_transport, _server_transport) = InMemoryTransport::pair();
        let client = McpClient::connect(Box::new(client_transport), test_config())
            .await
            .unwrap();
        let result = client.list_tools().await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn call_tool_before_initialize_is_rejected() {
        let (client_transport, _server_transport) = InMemoryTransport::pair();
        let client = McpClient::connect(Box::new(client_transport), test_config())
            .await
            .unwrap();
        let result = client.call_tool("echo", serde_json::json!({})).await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
        client.close().await.unwrap();
    }
}
