//! Pending-request correlation table.
//!
//! Every in-flight request gets exactly one slot, keyed by its `RequestId`,
//! holding a one-shot sender the dispatch loop completes when a matching
//! response arrives. A background task sweeps expired slots so a silently
//! dropped connection can't leak callers waiting forever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, trace, warn};

use crate::protocol::RequestId;

use super::error::{CorrelationError, CorrelationResult};
use super::types::{PendingRequest, RequestIdGenerator};

/// Configuration for a [`CorrelationManager`].
#[derive(Debug, Clone)]
pub struct CorrelationConfig {
    pub default_timeout: TimeDelta,
    pub cleanup_interval: Duration,
    pub max_pending_requests: usize,
    pub enable_tracing: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            default_timeout: TimeDelta::seconds(30),
            cleanup_interval: Duration::from_secs(10),
            max_pending_requests: 10_000,
            enable_tracing: true,
        }
    }
}

/// Table of outstanding requests awaiting a response.
///
/// At most one pending slot exists per `RequestId` at any instant: a second
/// `register_request` call for an id already pending is never issued by the
/// client core, which always mints a fresh id per call.
pub struct CorrelationManager {
    requests: Arc<DashMap<RequestId, PendingRequest>>,
    id_generator: Arc<RequestIdGenerator>,
    config: CorrelationConfig,
    cleanup_task: StdMutex<Option<JoinHandle<()>>>,
    shutdown_signal: Arc<AtomicBool>,
}

impl CorrelationManager {
    /// Build a manager and start its background cleanup task.
    pub fn new(config: CorrelationConfig) -> Self {
        let manager = Self::new_without_cleanup(config);
        manager.start_cleanup_task();
        manager
    }

    /// Build a manager without a cleanup task, for tests that want full
    /// control over expiry timing.
    pub fn new_without_cleanup(config: CorrelationConfig) -> Self {
        Self {
            requests: Arc::new(DashMap::new()),
            id_generator: Arc::new(RequestIdGenerator::new()),
            config,
            cleanup_task: StdMutex::new(None),
            shutdown_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mint a fresh request id, register a pending slot for it, and return
    /// the id alongside the receiver half the caller awaits.
    pub async fn register_request(
        &self,
        timeout: Option<TimeDelta>,
        request_data: Value,
    ) -> CorrelationResult<(RequestId, oneshot::Receiver<CorrelationResult<Value>>)> {
        if self.requests.len() >= self.config.max_pending_requests {
            return Err(CorrelationError::Internal {
                message: format!(
                    "pending request table full ({} requests)",
                    self.config.max_pending_requests
                ),
            });
        }

        let id = self.id_generator.next_id();
        let (tx, rx) = oneshot::channel();
        let pending = PendingRequest::new(tx, timeout.unwrap_or(self.config.default_timeout), request_data);
        self.requests.insert(id.clone(), pending);

        if self.config.enable_tracing {
            trace!(request_id = %id, "registered pending request");
        }

        Ok((id, rx))
    }

    /// Deliver a response to the slot matching `id`, consuming it.
    ///
    /// A response with no matching slot (already answered, expired, or
    /// never ours) is logged and dropped rather than treated as an error;
    /// the spec requires this path never panics or blocks the dispatch loop.
    pub fn correlate_response(&self, id: &RequestId, response: CorrelationResult<Value>) {
        match self.requests.remove(id) {
            Some((_, pending)) => {
                if pending.sender.send(response).is_err() && self.config.enable_tracing {
                    debug!(request_id = %id, "receiver dropped before response delivered");
                }
            }
            None => {
                if self.config.enable_tracing {
                    warn!(request_id = %id, "response for unknown or already-resolved request id");
                }
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.requests.len()
    }

    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.requests.contains_key(id)
    }

    pub fn get_pending_request_ids(&self) -> Vec<RequestId> {
        self.requests.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Cancel a single pending request, completing its waiter with
    /// `CorrelationError::Cancelled`.
    pub fn cancel_request(&self, id: &RequestId) -> CorrelationResult<()> {
        match self.requests.remove(id) {
            Some((_, pending)) => {
                let _ = pending.sender.send(Err(CorrelationError::Cancelled { id: id.clone() }));
                Ok(())
            }
            None => Err(CorrelationError::RequestNotFound { id: id.clone() }),
        }
    }

    /// Sweep expired slots, completing each waiter with `Timeout`.
    pub fn cleanup_expired_requests(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<RequestId> = self
            .requests
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();

        for id in &expired {
            if let Some((_, pending)) = self.requests.remove(id) {
                let duration = pending
                    .timeout
                    .to_std()
                    .unwrap_or(Duration::from_secs(0));
                let _ = pending.sender.send(Err(CorrelationError::Timeout {
                    id: id.clone(),
                    duration,
                }));
            }
        }

        if !expired.is_empty() && self.config.enable_tracing {
            debug!(count = expired.len(), "expired pending requests swept");
        }

        expired.len()
    }

    /// Spawn the periodic cleanup task. Idempotent: a second call replaces
    /// the previous handle, which drops (and thus aborts) the old task.
    pub fn start_cleanup_task(&self) {
        let requests = Arc::clone(&self.requests);
        let shutdown_signal = Arc::clone(&self.shutdown_signal);
        let cleanup_interval = self.config.cleanup_interval;
        let enable_tracing = self.config.enable_tracing;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(cleanup_interval);
            loop {
                ticker.tick().await;
                if shutdown_signal.load(Ordering::Acquire) {
                    break;
                }

                let now = Utc::now();
                let expired: Vec<RequestId> = requests
                    .iter()
                    .filter(|entry| entry.value().is_expired_at(now))
                    .map(|entry| entry.key().clone())
                    .collect();

                for id in expired {
                    if let Some((_, pending)) = requests.remove(&id) {
                        let duration = pending.timeout.to_std().unwrap_or(Duration::from_secs(0));
                        let _ = pending
                            .sender
                            .send(Err(CorrelationError::Timeout { id, duration }));
                    }
                }

                if enable_tracing {
                    trace!("cleanup tick complete, {} requests pending", requests.len());
                }
            }
        });

        // Store the handle synchronously so a `shutdown` call that races with
        // `start_cleanup_task` can never observe `cleanup_task == None` for a
        // task that is, in fact, already running.
        *self.cleanup_task.lock().unwrap_or_else(|err| err.into_inner()) = Some(handle);
    }

    /// Tear down the manager: stop the cleanup task and complete every
    /// still-pending waiter with `Cancelled`. Idempotent and callable through
    /// a shared `Arc<CorrelationManager>` — does not consume `self`, since
    /// the manager is typically owned jointly by the client core and its
    /// background cleanup task.
    pub async fn shutdown(&self) {
        self.shutdown_signal.store(true, Ordering::Release);

        let handle = self
            .cleanup_task
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }

        let ids: Vec<RequestId> = self.requests.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, pending)) = self.requests.remove(&id) {
                let _ = pending.sender.send(Err(CorrelationError::Cancelled { id }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config() -> CorrelationConfig {
        CorrelationConfig {
            default_timeout: TimeDelta::seconds(30),
            cleanup_interval: Duration::from_millis(10),
            max_pending_requests: 100,
            enable_tracing: false,
        }
    }

    #[tokio::test]
    async fn register_then_correlate_delivers_response() {
        let manager = CorrelationManager::new_without_cleanup(test_config());
        let (id, rx) = manager.register_request(None, json!({"method": "ping"})).await.unwrap();
        assert!(manager.is_pending(&id));

        manager.correlate_response(&id, Ok(json!({"pong": true})));
        let result = rx.await.unwrap().unwrap();
        assert_eq!(result, json!({"pong": true}));
        assert!(!manager.is_pending(&id));
    }

    #[tokio::test]
    async fn correlating_unknown_id_does_not_panic() {
        let manager = CorrelationManager::new_without_cleanup(test_config());
        manager.correlate_response(&RequestId::new_number(999), Ok(json!(null)));
        assert_eq!(manager.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancel_request_completes_waiter_with_cancelled() {
        let manager = CorrelationManager::new_without_cleanup(test_config());
        let (id, rx) = manager.register_request(None, json!({})).await.unwrap();
        manager.cancel_request(&id).unwrap();
        let result = rx.await.unwrap();
        assert!(matches!(result, Err(CorrelationError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn cleanup_expires_requests_past_their_timeout() {
        let manager = CorrelationManager::new_without_cleanup(test_config());
        let (_id, rx) = manager
            .register_request(Some(TimeDelta::zero()), json!({}))
            .await
            .unwrap();

        let expired = manager.cleanup_expired_requests();
        assert_eq!(expired, 1);
        let result = rx.await.unwrap();
        assert!(matches!(result, Err(CorrelationError::Timeout { .. })));
    }

    #[tokio::test]
    async fn max_pending_requests_limit_is_enforced() {
        let manager = CorrelationManager::new_without_cleanup(CorrelationConfig {
            max_pending_requests: 1,
            ..test_config()
        });
        let _first = manager.register_request(None, json!({})).await.unwrap();
        let second = manager.register_request(None, json!({})).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn shutdown_cancels_all_pending_requests() {
        let manager = CorrelationManager::new_without_cleanup(test_config());
        let (_id_a, rx_a) = manager.register_request(None, json!({})).await.unwrap();
        let (_id_b, rx_b) = manager.register_request(None, json!({})).await.unwrap();

        manager.shutdown().await;

        assert!(matches!(rx_a.await.unwrap(), Err(CorrelationError::Cancelled { .. })));
        assert!(matches!(rx_b.await.unwrap(), Err(CorrelationError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn concurrent_registrations_get_distinct_ids() {
        let manager = Arc::new(CorrelationManager::new_without_cleanup(test_config()));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                manager.register_request(None, json!({})).await.unwrap().0
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }

        let unique: std::collections::HashSet<_> = ids.into_iter().collect();
        assert_eq!(unique.len(), 20);
    }
}
