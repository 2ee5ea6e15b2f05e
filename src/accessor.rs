use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Event, Namespace, Node, Pod};
use kube::api::{Api, ListParams, LogParams};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::registry::ClusterRegistry;

const LIST_CACHE_TTL: chrono::Duration = chrono::Duration::minutes(5);
const EVENT_LIST_LIMIT: usize = 20;
const MAX_LOG_LINES: i64 = 100;
const JOB_LOG_LINES: i64 = 100;

type ListCacheKey = (Uuid, &'static str, Option<String>);

struct CachedList {
    items: Vec<serde_json::Value>,
    inserted_at: chrono::DateTime<Utc>,
}

/// C2 — thin, read-only facade over a cluster's Kubernetes client. No
/// business logic lives here: detectors never talk to `kube` directly.
pub struct ResourceAccessor {
    registry: Arc<ClusterRegistry>,
    list_cache: DashMap<ListCacheKey, CachedList>,
}

impl ResourceAccessor {
    pub fn new(registry: Arc<ClusterRegistry>) -> Self {
        Self {
            registry,
            list_cache: DashMap::new(),
        }
    }

    fn client(&self, cluster_id: Uuid) -> Result<kube::Client> {
        self.registry
            .get_client(cluster_id)
            .map(|h| h.client)
            .ok_or_else(|| CoreError::NotFound(format!("no client for cluster {}", cluster_id)))
    }

    fn map_kube_err(err: kube::Error) -> CoreError {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => {
                CoreError::NotFound(format!("resource not found: {}", resp.message))
            }
            _ => CoreError::ClusterUnreachable(err.to_string()),
        }
    }

    /// List endpoints MAY be cached for 5 minutes keyed by
    /// `(clusterId, kind, namespace)`. `get` operations never go
    /// through this path.
    async fn cached_list<K, F, Fut>(
        &self,
        cluster_id: Uuid,
        kind: &'static str,
        namespace: Option<&str>,
        fetch: F,
    ) -> Result<Vec<K>>
    where
        K: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<K>>>,
    {
        let key: ListCacheKey = (cluster_id, kind, namespace.map(|s| s.to_string()));

        if let Some(cached) = self.list_cache.get(&key) {
            if Utc::now() - cached.inserted_at < LIST_CACHE_TTL {
                return Ok(cached
                    .items
                    .iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect());
            }
        }

        let items = fetch().await?;
        let cached_items = items
            .iter()
            .filter_map(|item| serde_json::to_value(item).ok())
            .collect();
        self.list_cache.insert(
            key,
            CachedList {
                items: cached_items,
                inserted_at: Utc::now(),
            },
        );
        Ok(items)
    }

    pub async fn list_namespaces(&self, cluster_id: Uuid) -> Result<Vec<Namespace>> {
        let client = self.client(cluster_id)?;
        self.cached_list(cluster_id, "Namespace", None, || async move {
            let api: Api<Namespace> = Api::all(client);
            Ok(api.list(&ListParams::default()).await.map_err(Self::map_kube_err)?.items)
        })
        .await
    }

    pub async fn list_pods(&self, cluster_id: Uuid, namespace: Option<&str>) -> Result<Vec<Pod>> {
        let client = self.client(cluster_id)?;
        let ns = namespace.map(|s| s.to_string());
        self.cached_list(cluster_id, "Pod", namespace, || async move {
            let api: Api<Pod> = namespace_scoped_api(client, ns.as_deref());
            Ok(api.list(&ListParams::default()).await.map_err(Self::map_kube_err)?.items)
        })
        .await
    }

    pub async fn get_pod(&self, cluster_id: Uuid, namespace: &str, name: &str) -> Result<Pod> {
        let api: Api<Pod> = Api::namespaced(self.client(cluster_id)?, namespace);
        api.get(name).await.map_err(Self::map_kube_err)
    }

    pub async fn list_deployments(&self, cluster_id: Uuid, namespace: Option<&str>) -> Result<Vec<Deployment>> {
        let client = self.client(cluster_id)?;
        let ns = namespace.map(|s| s.to_string());
        self.cached_list(cluster_id, "Deployment", namespace, || async move {
            let api: Api<Deployment> = namespace_scoped_api(client, ns.as_deref());
            Ok(api.list(&ListParams::default()).await.map_err(Self::map_kube_err)?.items)
        })
        .await
    }

    pub async fn list_daemonsets(&self, cluster_id: Uuid, namespace: Option<&str>) -> Result<Vec<DaemonSet>> {
        let client = self.client(cluster_id)?;
        let ns = namespace.map(|s| s.to_string());
        self.cached_list(cluster_id, "DaemonSet", namespace, || async move {
            let api: Api<DaemonSet> = namespace_scoped_api(client, ns.as_deref());
            Ok(api.list(&ListParams::default()).await.map_err(Self::map_kube_err)?.items)
        })
        .await
    }

    pub async fn list_statefulsets(&self, cluster_id: Uuid, namespace: Option<&str>) -> Result<Vec<StatefulSet>> {
        let client = self.client(cluster_id)?;
        let ns = namespace.map(|s| s.to_string());
        self.cached_list(cluster_id, "StatefulSet", namespace, || async move {
            let api: Api<StatefulSet> = namespace_scoped_api(client, ns.as_deref());
            Ok(api.list(&ListParams::default()).await.map_err(Self::map_kube_err)?.items)
        })
        .await
    }

    pub async fn list_replicasets(&self, cluster_id: Uuid, namespace: Option<&str>) -> Result<Vec<ReplicaSet>> {
        let client = self.client(cluster_id)?;
        let ns = namespace.map(|s| s.to_string());
        self.cached_list(cluster_id, "ReplicaSet", namespace, || async move {
            let api: Api<ReplicaSet> = namespace_scoped_api(client, ns.as_deref());
            Ok(api.list(&ListParams::default()).await.map_err(Self::map_kube_err)?.items)
        })
        .await
    }

    pub async fn list_jobs(&self, cluster_id: Uuid, namespace: Option<&str>) -> Result<Vec<Job>> {
        let client = self.client(cluster_id)?;
        let ns = namespace.map(|s| s.to_string());
        self.cached_list(cluster_id, "Job", namespace, || async move {
            let api: Api<Job> = namespace_scoped_api(client, ns.as_deref());
            Ok(api.list(&ListParams::default()).await.map_err(Self::map_kube_err)?.items)
        })
        .await
    }

    pub async fn list_cronjobs(&self, cluster_id: Uuid, namespace: Option<&str>) -> Result<Vec<CronJob>> {
        let client = self.client(cluster_id)?;
        let ns = namespace.map(|s| s.to_string());
        self.cached_list(cluster_id, "CronJob", namespace, || async move {
            let api: Api<CronJob> = namespace_scoped_api(client, ns.as_deref());
            Ok(api.list(&ListParams::default()).await.map_err(Self::map_kube_err)?.items)
        })
        .await
    }

    pub async fn list_nodes(&self, cluster_id: Uuid) -> Result<Vec<Node>> {
        let client = self.client(cluster_id)?;
        self.cached_list(cluster_id, "Node", None, || async move {
            let api: Api<Node> = Api::all(client);
            Ok(api.list(&ListParams::default()).await.map_err(Self::map_kube_err)?.items)
        })
        .await
    }

    /// Returns the last `tail_lines` lines of a container's log; on any
    /// failure returns an empty string and logs a warning — it never
    /// propagates.
    pub async fn get_logs(
        &self,
        cluster_id: Uuid,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        tail_lines: i64,
    ) -> String {
        let client = match self.client(cluster_id) {
            Ok(c) => c,
            Err(e) => {
                warn!(cluster_id = %cluster_id, error = %e, "get_logs: no client");
                return String::new();
            }
        };
        let api: Api<Pod> = Api::namespaced(client, namespace);
        let params = LogParams {
            container: container.map(|c| c.to_string()),
            tail_lines: Some(tail_lines.min(MAX_LOG_LINES)),
            ..Default::default()
        };

        match api.logs(pod, &params).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(cluster_id = %cluster_id, pod = %pod, error = %e, "failed to fetch logs");
                String::new()
            }
        }
    }

    /// Locates pods labeled `job-name=<jobName>`, picks the most recently
    /// created, and returns up to 100 lines of its logs.
    pub async fn get_logs_for_job(&self, cluster_id: Uuid, namespace: &str, job_name: &str) -> String {
        let client = match self.client(cluster_id) {
            Ok(c) => c,
            Err(_) => return String::new(),
        };
        let api: Api<Pod> = Api::namespaced(client, namespace);
        let params = ListParams::default().labels(&format!("job-name={}", job_name));

        let pods = match api.list(&params).await {
            Ok(list) => list.items,
            Err(e) => {
                warn!(cluster_id = %cluster_id, job_name = %job_name, error = %e, "failed to list job pods");
                return String::new();
            }
        };

        let most_recent = pods.into_iter().max_by_key(|p| {
            p.metadata
                .creation_timestamp
                .as_ref()
                .map(|t| t.0)
                .unwrap_or_else(Utc::now)
        });

        match most_recent {
            Some(pod) => {
                let name = pod.metadata.name.clone().unwrap_or_default();
                self.get_logs(cluster_id, namespace, &name, None, JOB_LOG_LINES).await
            }
            None => String::new(),
        }
    }

    /// Events filtered by `involvedObject.kind`/`involvedObject.name`,
    /// sorted by last-timestamp descending, limited to 20.
    pub async fn get_events(&self, cluster_id: Uuid, namespace: &str, kind: &str, name: &str) -> Vec<Event> {
        let client = match self.client(cluster_id) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        let api: Api<Event> = Api::namespaced(client, namespace);
        let params = ListParams::default().fields(&format!(
            "involvedObject.kind={},involvedObject.name={}",
            kind, name
        ));

        let mut events = match api.list(&params).await {
            Ok(list) => list.items,
            Err(e) => {
                warn!(cluster_id = %cluster_id, kind = %kind, name = %name, error = %e, "failed to list events");
                return Vec::new();
            }
        };

        events.sort_by(|a, b| {
            let a_ts = a.last_timestamp.as_ref().map(|t| t.0);
            let b_ts = b.last_timestamp.as_ref().map(|t| t.0);
            b_ts.cmp(&a_ts)
        });
        events.truncate(EVENT_LIST_LIMIT);
        events
    }

    pub async fn list_events_in_namespace(&self, cluster_id: Uuid, namespace: &str, limit: usize) -> Vec<Event> {
        let client = match self.client(cluster_id) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        let api: Api<Event> = Api::namespaced(client, namespace);
        match api.list(&ListParams::default()).await {
            Ok(mut list) => {
                list.items.truncate(limit);
                list.items
            }
            Err(e) => {
                warn!(cluster_id = %cluster_id, namespace = %namespace, error = %e, "failed to list namespace events");
                Vec::new()
            }
        }
    }
}

fn namespace_scoped_api<K>(client: kube::Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = kube::core::NamespaceResourceScope>,
    K: k8s_openapi::Metadata<Ty = k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta>,
    <K as kube::Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}
