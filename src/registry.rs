use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use kube::api::ListParams;
use kube::Api;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::client_factory::{ClientFactory, KubernetesClientHandle};
use crate::error::{CoreError, Result};
use crate::models::{ClusterConfig, ClusterInfo, ClusterInventory, ClusterStatus};
use crate::store::ClusterStore;

const REFRESH_INTERVAL: chrono::Duration = chrono::Duration::minutes(1);

/// C1 — Cluster Registry & Client Factory. Owns the persistent store and
/// the in-memory client cache; these are the only two global state stores
/// in the whole system.
pub struct ClusterRegistry {
    store: Arc<dyn ClusterStore>,
    clients: DashMap<Uuid, KubernetesClientHandle>,
}

impl ClusterRegistry {
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self {
            store,
            clients: DashMap::new(),
        }
    }

    /// On process start, load every persisted `ClusterConfig` and attempt to
    /// rebuild a client; a failure on one cluster is logged and does not
    /// block the others.
    pub async fn reconcile_on_startup(&self) {
        let configs = match self.store.all_configs() {
            Ok(c) => c,
            Err(e) => {
                error!("failed to load persisted cluster configs: {}", e);
                return;
            }
        };

        for config in configs {
            match ClientFactory::build(&config) {
                Ok(handle) => {
                    info!(cluster_id = %config.id, "rebuilt client from persisted config");
                    self.clients.insert(config.id, handle);
                }
                Err(e) => {
                    warn!(cluster_id = %config.id, error = %e, "failed to rebuild client on startup");
                }
            }
        }
    }

    /// Registers a new cluster: build a client, probe liveness, collect
    /// inventory, then persist both records. All-or-nothing — nothing is
    /// persisted if the probe fails.
    pub async fn register(&self, draft: ClusterConfig) -> Result<ClusterInfo> {
        draft
            .validate()
            .map_err(CoreError::ValidationFailed)?;

        let handle = ClientFactory::build(&draft)?;
        let inventory = probe_inventory(&handle).await.map_err(|e| {
            CoreError::ConnectionFailed(format!("liveness probe failed: {}", e))
        })?;

        let now = Utc::now();
        let info = ClusterInfo {
            id: draft.id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            api_server_url: draft.api_server_url.clone(),
            version: inventory.version,
            status: ClusterStatus::Connected,
            created_at: now,
            last_checked: now,
            node_count: inventory.node_count,
            namespace_count: inventory.namespace_count,
            pod_count: inventory.pod_count,
        };

        self.store.insert(draft.clone(), info.clone())?;
        self.clients.insert(draft.id, handle);
        info!(cluster_id = %draft.id, "cluster registered");
        Ok(info)
    }

    pub fn list(&self) -> Result<Vec<ClusterInfo>> {
        self.store.list()
    }

    pub fn get(&self, id: Uuid) -> Result<Option<ClusterInfo>> {
        self.store.get_info(id)
    }

    pub fn get_config(&self, id: Uuid) -> Result<Option<ClusterConfig>> {
        self.store.get_config(id)
    }

    pub fn get_client(&self, id: Uuid) -> Option<KubernetesClientHandle> {
        self.clients.get(&id).map(|entry| entry.clone())
    }

    /// Reprobes a cluster: on success writes `CONNECTED` plus refreshed
    /// inventory, on failure writes `ERROR` and `lastChecked=now`, then
    /// still returns the error.
    pub async fn test_connection(&self, id: Uuid) -> Result<ClusterInfo> {
        let config = self
            .store
            .get_config(id)?
            .ok_or_else(|| CoreError::NotFound(format!("cluster {} not found", id)))?;
        let mut info = self
            .store
            .get_info(id)?
            .ok_or_else(|| CoreError::NotFound(format!("cluster {} not found", id)))?;

        let handle = match self.clients.get(&id).map(|e| e.clone()) {
            Some(h) => h,
            None => ClientFactory::build(&config)?,
        };

        match probe_inventory(&handle).await {
            Ok(inventory) => {
                info.status = ClusterStatus::Connected;
                info.last_checked = Utc::now();
                info.version = inventory.version;
                info.node_count = inventory.node_count;
                info.namespace_count = inventory.namespace_count;
                info.pod_count = inventory.pod_count;
                self.store.update_info(info.clone())?;
                self.clients.insert(id, handle);
                Ok(info)
            }
            Err(e) => {
                info.status = ClusterStatus::Error;
                info.last_checked = Utc::now();
                self.store.update_info(info)?;
                Err(CoreError::ConnectionFailed(format!(
                    "connection test failed for {}: {}",
                    id, e
                )))
            }
        }
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.store.delete(id)?;
        self.clients.remove(&id);
        Ok(())
    }

    /// Best-effort opportunistic refresh: reprobes only if the last check is
    /// stale, and swallows failures (they are logged, never propagated).
    pub async fn refresh_if_needed(&self, id: Uuid) {
        let info = match self.store.get_info(id) {
            Ok(Some(info)) => info,
            Ok(None) => return,
            Err(e) => {
                warn!(cluster_id = %id, error = %e, "refresh_if_needed: store read failed");
                return;
            }
        };

        if Utc::now() - info.last_checked < REFRESH_INTERVAL {
            return;
        }

        if let Err(e) = self.test_connection(id).await {
            debug!(cluster_id = %id, error = %e, "opportunistic refresh failed, swallowed");
        }
    }
}

async fn probe_inventory(handle: &KubernetesClientHandle) -> Result<ClusterInventory> {
    let version = handle
        .client
        .apiserver_version()
        .await
        .map(|v| v.git_version)
        .unwrap_or_default();

    let nodes: Api<Node> = Api::all(handle.client.clone());
    let namespaces: Api<Namespace> = Api::all(handle.client.clone());
    let pods: Api<Pod> = Api::all(handle.client.clone());

    let node_count = nodes.list(&ListParams::default()).await?.items.len() as u32;
    let namespace_count = namespaces.list(&ListParams::default()).await?.items.len() as u32;
    let pod_count = pods.list(&ListParams::default()).await?.items.len() as u32;

    Ok(ClusterInventory {
        version,
        node_count,
        namespace_count,
        pod_count,
    })
}
