//! Server-initiated request/notification dispatch (spec §4.7 dispatch loop,
//! §4.7 typed notifications).
//!
//! One router handles both directions of server-initiated traffic:
//! - **Requests** (`roots/list`, `sampling/createMessage`, ...): routed by
//!   method name to a single registered [`RequestHandler`], which produces
//!   the reply envelope the dispatch loop sends back through the transport.
//! - **Notifications**: fanned out to every handler registered for that
//!   method, in registration order. Four well-known MCP notifications get a
//!   typed subscription API (`on_progress`, `on_resource_update`, `on_log`,
//!   `on_connection_status`) on top of the generic `on_notification` path;
//!   `on_connection_status` has no wire representation at all — the client
//!   core synthesizes it locally on transport connect/disconnect.
//!
//! A method with no registered handler is logged and dropped, never an
//! error: a late or unexpected notification must never tear down the
//! dispatch loop (spec §7 propagation policy).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use crate::protocol::{
    methods, JsonRpcErrorObject, JsonRpcResponse, LogLevel, ProgressNotification, RequestId, Uri,
};

/// A server-initiated request handler. Implementations receive the raw
/// params and the id to echo back; they are responsible for producing a
/// complete response envelope (success or error) — the router never
/// synthesizes one on their behalf.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse;
}

/// A plain closure can act as a `RequestHandler` for simple synchronous
/// cases (the common shape for `roots/list`).
#[async_trait]
impl<F> RequestHandler for F
where
    F: Fn(RequestId, Option<Value>) -> JsonRpcResponse + Send + Sync + 'static,
{
    async fn handle(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        self(id, params)
    }
}

type NotificationCallback = Arc<dyn Fn(Value) + Send + Sync>;
type ProgressCallback = Arc<dyn Fn(ProgressNotification) + Send + Sync>;
type ResourceUpdateCallback = Arc<dyn Fn(Uri) + Send + Sync>;
type LogCallback = Arc<dyn Fn(LogLevel, String) + Send + Sync>;
type ConnectionStatusCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Registry of server→client request handlers and notification fan-out
/// lists. Owned exclusively by the client core; the dispatch loop consults
/// it on every inbound message that isn't a response.
#[derive(Default)]
pub struct Router {
    request_handlers: RwLock<HashMap<String, Arc<dyn RequestHandler>>>,
    notification_handlers: RwLock<HashMap<String, Vec<NotificationCallback>>>,
    progress_handlers: RwLock<Vec<ProgressCallback>>,
    resource_update_handlers: RwLock<HashMap<String, Vec<ResourceUpdateCallback>>>,
    log_handlers: RwLock<Vec<LogCallback>>,
    connection_status_handlers: RwLock<Vec<ConnectionStatusCallback>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a server-initiated request method. A second
    /// registration for the same method replaces the first.
    pub async fn on_request(&self, method: impl Into<String>, handler: Arc<dyn RequestHandler>) {
        self.request_handlers.write().await.insert(method.into(), handler);
    }

    pub async fn remove_request_handler(&self, method: &str) {
        self.request_handlers.write().await.remove(method);
    }

    /// Register a raw notification handler for an arbitrary method. Handlers
    /// for the same method fire in registration order.
    pub async fn on_notification(&self, method: impl Into<String>, callback: NotificationCallback) {
        self.notification_handlers
            .write()
            .await
            .entry(method.into())
            .or_default()
            .push(callback);
    }

    pub async fn on_progress(&self, callback: ProgressCallback) {
        self.progress_handlers.write().await.push(callback);
    }

    /// Register a handler invoked only for resource-update notifications
    /// naming `uri`; handlers registered for other URIs are not invoked.
    pub async fn on_resource_update(&self, uri: Uri, callback: ResourceUpdateCallback) {
        self.resource_update_handlers
            .write()
            .await
            .entry(uri.as_str().to_string())
            .or_default()
            .push(callback);
    }

    pub async fn on_log(&self, callback: LogCallback) {
        self.log_handlers.write().await.push(callback);
    }

    /// `connection-status` is never a wire message; the client core calls
    /// [`Router::notify_connection_status`] directly on transport-level
    /// connect/disconnect transitions.
    pub async fn on_connection_status(&self, callback: ConnectionStatusCallback) {
        self.connection_status_handlers.write().await.push(callback);
    }

    pub async fn notify_connection_status(&self, connected: bool) {
        for handler in self.connection_status_handlers.read().await.iter() {
            handler(connected);
        }
    }

    /// Route one inbound server-initiated request, producing the response
    /// envelope to send back. `METHOD_NOT_FOUND` if nothing is registered.
    pub async fn dispatch_request(
        &self,
        method: &str,
        id: RequestId,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let handler = self.request_handlers.read().await.get(method).cloned();
        match handler {
            Some(handler) => handler.handle(id, params).await,
            None => {
                warn!(method, "no handler registered for server-initiated request");
                JsonRpcResponse::error(
                    JsonRpcErrorObject::new(
                        crate::protocol::error_codes::METHOD_NOT_FOUND,
                        format!("no handler registered for method {method}"),
                    ),
                    Some(id),
                )
            }
        }
    }

    /// Fan out one inbound notification to every registered handler, typed
    /// subscribers first (if the method is one of the well-known four),
    /// then any raw handlers registered under the literal method name.
    pub async fn dispatch_notification(&self, method: &str, params: Option<Value>) {
        let value = params.clone().unwrap_or(Value::Null);

        match method {
            methods::PROGRESS => {
                match serde_json::from_value::<ProgressNotification>(value.clone()) {
                    Ok(progress) => {
                        for handler in self.progress_handlers.read().await.iter() {
                            handler(progress.clone());
                        }
                    }
                    Err(err) => warn!(error = %err, "malformed progress notification dropped"),
                }
            }
            methods::RESOURCES_UPDATED => {
                if let Some(uri) = value.get("uri").and_then(Value::as_str) {
                    let handlers = self.resource_update_handlers.read().await;
                    if let Some(handlers) = handlers.get(uri) {
                        let uri = Uri::new_unchecked(uri);
                        for handler in handlers {
                            handler(uri.clone());
                        }
                    }
                }
            }
            methods::LOGGING_MESSAGE => {
                let level = value
                    .get("level")
                    .and_then(|v| serde_json::from_value::<LogLevel>(v.clone()).ok())
                    .unwrap_or(LogLevel::Info);
                let message = value
                    .get("data")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                for handler in self.log_handlers.read().await.iter() {
                    handler(level, message.clone());
                }
            }
            _ => {}
        }

        let raw_handlers = self.notification_handlers.read().await;
        match raw_handlers.get(method) {
            Some(handlers) => {
                for handler in handlers {
                    handler(value.clone());
                }
            }
            None => trace!(method, "no raw notification handler registered"),
        }
    }

    pub async fn has_request_handler(&self, method: &str) -> bool {
        self.request_handlers.read().await.contains_key(method)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn dispatch_notification_fans_out_in_registration_order() {
        let router = Router::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let order_a = Arc::clone(&order);
        router
            .on_notification("custom/event", Arc::new(move |_| order_a.lock().unwrap().push(1)))
            .await;
        let order_b = Arc::clone(&order);
        router
            .on_notification("custom/event", Arc::new(move |_| order_b.lock().unwrap().push(2)))
            .await;

        router.dispatch_notification("custom/event", None).await;
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn dispatch_notification_for_unregistered_method_does_not_panic() {
        let router = Router::new();
        router.dispatch_notification("unknown/method", None).await;
    }

    #[tokio::test]
    async fn dispatch_request_without_handler_returns_method_not_found() {
        let router = Router::new();
        let response = router
            .dispatch_request("roots/list", RequestId::new_number(1), None)
            .await;
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn dispatch_request_invokes_registered_handler() {
        let router = Router::new();
        router
            .on_request(
                "roots/list",
                Arc::new(|id: RequestId, _params: Option<Value>| {
                    JsonRpcResponse::success(serde_json::json!({"roots": []}), id)
                }),
            )
            .await;

        let response = router
            .dispatch_request("roots/list", RequestId::new_number(1), None)
            .await;
        assert!(!response.is_error());
    }

    #[tokio::test]
    async fn progress_handlers_each_invoked_once() {
        let router = Router::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let count = Arc::clone(&count);
            router
                .on_progress(Arc::new(move |_| {
                    count.fetch_add(1, Ordering::SeqCst);
                }))
                .await;
        }

        let params = serde_json::json!({"progressToken": "t1", "progress": 0.5});
        router.dispatch_notification(methods::PROGRESS, Some(params)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resource_update_only_invokes_handlers_for_matching_uri() {
        let router = Router::new();
        let matched = Arc::new(AtomicUsize::new(0));
        let other = Arc::new(AtomicUsize::new(0));

        let matched_clone = Arc::clone(&matched);
        router
            .on_resource_update(
                Uri::new("file:///a.txt").unwrap(),
                Arc::new(move |_| {
                    matched_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await;
        let other_clone = Arc::clone(&other);
        router
            .on_resource_update(
                Uri::new("file:///b.txt").unwrap(),
                Arc::new(move |_| {
                    other_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await;

        let params = serde_json::json!({"uri": "file:///a.txt"});
        router
            .dispatch_notification(methods::RESOURCES_UPDATED, Some(params))
            .await;

        assert_eq!(matched.load(Ordering::SeqCst), 1);
        assert_eq!(other.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn connection_status_is_synthesized_locally_not_dispatched() {
        let router = Router::new();
        let seen = Arc::new(std::sync::Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        router
            .on_connection_status(Arc::new(move |connected| *seen_clone.lock().unwrap() = Some(connected)))
            .await;

        router.notify_connection_status(true).await;
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }
}
