//! Client-advertised filesystem roots (spec §4.8).
//!
//! A local mapping from root URI to `{name, metadata?}`, mutated only
//! through [`RootsManager::add_root`]/[`RootsManager::remove_root`]. When the
//! client is initialized, those calls also issue the corresponding RPC
//! (`roots/add`/`roots/remove`) and, if the server enabled
//! `roots.listChanged`, a `notifications/roots/list_changed` notification;
//! on RPC failure the local mutation is rolled back so the local view never
//! drifts from what the server believes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::protocol::{Root, Uri};

/// Narrow RPC surface the roots subsystem needs from the client core.
/// Kept as a trait so this module has no dependency on `client`; the core
/// implements it and hands itself to [`RootsManager::new`].
#[async_trait]
pub trait RootsRpc: Send + Sync {
    async fn call_roots_add(&self, root: &Root) -> Result<(), RootsError>;
    async fn call_roots_remove(&self, uri: &Uri) -> Result<(), RootsError>;
    async fn notify_roots_list_changed(&self) -> Result<(), RootsError>;
    fn is_initialized(&self) -> bool;
    fn roots_list_changed_enabled(&self) -> bool;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RootsError {
    #[error("root {0} already exists")]
    AlreadyExists(String),

    #[error("root {0} not found")]
    NotFound(String),

    #[error("roots RPC failed: {0}")]
    Rpc(String),
}

/// Local view of the client's advertised roots, kept in sync with the
/// server through `roots/add`/`roots/remove` once the session is
/// initialized (spec §4.8's `roots/list` server-request handler reads a
/// snapshot of this same map).
pub struct RootsManager {
    roots: RwLock<HashMap<String, Root>>,
    rpc: Arc<dyn RootsRpc>,
}

impl RootsManager {
    pub fn new(rpc: Arc<dyn RootsRpc>) -> Self {
        Self {
            roots: RwLock::new(HashMap::new()),
            rpc,
        }
    }

    /// Add a root. If the session is initialized this also issues
    /// `roots/add` and, if enabled, the `list_changed` notification; on RPC
    /// failure the local insert is rolled back so `roots()` never reports a
    /// root the server doesn't know about.
    pub async fn add_root(
        &self,
        uri: Uri,
        name: Option<impl Into<String>>,
        metadata: Option<Value>,
    ) -> Result<(), RootsError> {
        let key = uri.as_str().to_string();
        let mut root = Root::new(uri, name);
        if let Some(metadata) = metadata {
            root = root.with_metadata(metadata);
        }

        {
            let mut roots = self.roots.write().await;
            if roots.contains_key(&key) {
                return Err(RootsError::AlreadyExists(key));
            }
            roots.insert(key.clone(), root.clone());
        }

        if self.rpc.is_initialized() {
            if let Err(err) = self.rpc.call_roots_add(&root).await {
                self.roots.write().await.remove(&key);
                return Err(err);
            }
            if self.rpc.roots_list_changed_enabled() {
                let _ = self.rpc.notify_roots_list_changed().await;
            }
        }

        debug!(uri = %key, "root added");
        Ok(())
    }

    /// Remove a root by URI, mirroring [`add_root`](Self::add_root)'s RPC
    /// and rollback policy.
    pub async fn remove_root(&self, uri: &Uri) -> Result<(), RootsError> {
        let key = uri.as_str().to_string();

        let removed = {
            let mut roots = self.roots.write().await;
            roots.remove(&key)
        };
        let Some(removed) = removed else {
            return Err(RootsError::NotFound(key));
        };

        if self.rpc.is_initialized() {
            if let Err(err) = self.rpc.call_roots_remove(uri).await {
                self.roots.write().await.insert(key.clone(), removed);
                return Err(err);
            }
            if self.rpc.roots_list_changed_enabled() {
                let _ = self.rpc.notify_roots_list_changed().await;
            }
        }

        debug!(uri = %key, "root removed");
        Ok(())
    }

    /// Snapshot of the local view, used both by direct introspection and by
    /// the server-side `roots/list` handler the client registers on its own
    /// router.
    pub async fn snapshot(&self) -> Vec<Root> {
        self.roots.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.roots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.roots.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeRpc {
        initialized: AtomicBool,
        list_changed_enabled: AtomicBool,
        fail_next: AtomicBool,
        add_calls: AtomicUsize,
        remove_calls: AtomicUsize,
        notify_calls: AtomicUsize,
    }

    impl FakeRpc {
        fn new(initialized: bool) -> Arc<Self> {
            Arc::new(Self {
                initialized: AtomicBool::new(initialized),
                list_changed_enabled: AtomicBool::new(true),
                fail_next: AtomicBool::new(false),
                add_calls: AtomicUsize::new(0),
                remove_calls: AtomicUsize::new(0),
                notify_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RootsRpc for FakeRpc {
        async fn call_roots_add(&self, _root: &Root) -> Result<(), RootsError> {
            self.add_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(RootsError::Rpc("simulated failure".into()));
            }
            Ok(())
        }

        async fn call_roots_remove(&self, _uri: &Uri) -> Result<(), RootsError> {
            self.remove_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(RootsError::Rpc("simulated failure".into()));
            }
            Ok(())
        }

        async fn notify_roots_list_changed(&self) -> Result<(), RootsError> {
            self.notify_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_initialized(&self) -> bool {
            self.initialized.load(Ordering::SeqCst)
        }

        fn roots_list_changed_enabled(&self) -> bool {
            self.list_changed_enabled.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn add_then_remove_returns_to_empty_and_issues_one_rpc_each() {
        let rpc = FakeRpc::new(true);
        let manager = RootsManager::new(rpc.clone());

        let uri = Uri::new("file:///tmp").unwrap();
        manager.add_root(uri.clone(), Some("tmp"), None).await.unwrap();
        assert_eq!(manager.len().await, 1);

        manager.remove_root(&uri).await.unwrap();
        assert!(manager.is_empty().await);

        assert_eq!(rpc.add_calls.load(Ordering::SeqCst), 1);
        assert_eq!(rpc.remove_calls.load(Ordering::SeqCst), 1);
        assert_eq!(rpc.notify_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn add_root_without_initialization_skips_rpc() {
        let rpc = FakeRpc::new(false);
        let manager = RootsManager::new(rpc.clone());

        manager
            .add_root(Uri::new("file:///tmp").unwrap(), Some("tmp"), None)
            .await
            .unwrap();

        assert_eq!(rpc.add_calls.load(Ordering::SeqCst), 0);
        assert_eq!(manager.len().await, 1);
    }

    #[tokio::test]
    async fn failed_rpc_rolls_back_local_mutation() {
        let rpc = FakeRpc::new(true);
        rpc.fail_next.store(true, Ordering::SeqCst);
        let manager = RootsManager::new(rpc);

        let result = manager
            .add_root(Uri::new("file:///tmp").unwrap(), Some("tmp"), None)
            .await;
        assert!(result.is_err());
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_uri_is_rejected() {
        let rpc = FakeRpc::new(true);
        let manager = RootsManager::new(rpc);
        let uri = Uri::new("file:///tmp").unwrap();

        manager.add_root(uri.clone(), Some("tmp"), None).await.unwrap();
        let result = manager.add_root(uri, Some("tmp"), None).await;
        assert!(matches!(result, Err(RootsError::AlreadyExists(_))));
    }
}
