//! C5 — Scan Orchestrator. Walks a cluster (optionally one namespace)
//! across every workload kind, invokes the classification service per
//! resource, and exposes the post-collection one-fault-per-resource dedup
//! pass.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::accessor::ResourceAccessor;
use crate::classification::ClassificationService;
use crate::error::Result;
use crate::models::{FaultInfo, ResourceKind, WorkloadResource};

pub struct ScanOrchestrator {
    accessor: Arc<ResourceAccessor>,
    classifier: ClassificationService,
}

impl ScanOrchestrator {
    pub fn new(accessor: Arc<ResourceAccessor>) -> Self {
        Self {
            accessor,
            classifier: ClassificationService::new(),
        }
    }

    pub async fn scan_cluster(&self, cluster_id: Uuid) -> Result<Vec<FaultInfo>> {
        self.scan(cluster_id, None).await
    }

    pub async fn scan_namespace(&self, cluster_id: Uuid, namespace: &str) -> Result<Vec<FaultInfo>> {
        self.scan(cluster_id, Some(namespace)).await
    }

    /// Walks each workload kind in `ResourceKind::SCAN_ORDER`, fetching
    /// resources via C2 and classifying each in turn. Resources are
    /// enumerated sequentially and detectors for one resource always run
    /// in a single pass, so fault emission order is deterministic
    /// (kind order × resource order × detector declaration order).
    async fn scan(&self, cluster_id: Uuid, namespace: Option<&str>) -> Result<Vec<FaultInfo>> {
        let mut faults = Vec::new();

        for kind in ResourceKind::SCAN_ORDER {
            let resources = self.fetch_kind(cluster_id, namespace, kind).await?;
            for resource in &resources {
                let resource_ns = resource.namespace();
                faults.extend(self.classifier.detect_faults(
                    cluster_id,
                    resource_ns.as_deref().or(namespace),
                    resource,
                ));
            }
        }

        Ok(faults)
    }

    /// Same coverage as [`scan_cluster`](Self::scan_cluster) but issues the
    /// per-kind list calls concurrently instead of walking
    /// `ResourceKind::SCAN_ORDER` one kind at a time. Useful against a
    /// cluster with many namespaces, where each list call is dominated by
    /// API server round-trip latency rather than local work.
    ///
    /// Fault *content* is identical to the sequential scan; emission
    /// *order* is not, since kinds may come back in any order once their
    /// list calls race. Callers that need deterministic ordering (snapshot
    /// comparisons, golden-file tests) should use [`scan_cluster`] instead,
    /// then run [`dedup_faults`] over either result.
    pub async fn scan_cluster_concurrent(&self, cluster_id: Uuid) -> Result<Vec<FaultInfo>> {
        let fetches = ResourceKind::SCAN_ORDER
            .iter()
            .map(|&kind| self.fetch_kind(cluster_id, None, kind));
        let fetched = futures::future::join_all(fetches).await;

        let mut faults = Vec::new();
        for resources in fetched {
            for resource in &resources? {
                let resource_ns = resource.namespace();
                faults.extend(self.classifier.detect_faults(cluster_id, resource_ns.as_deref(), resource));
            }
        }
        Ok(faults)
    }

    async fn fetch_kind(
        &self,
        cluster_id: Uuid,
        namespace: Option<&str>,
        kind: ResourceKind,
    ) -> Result<Vec<WorkloadResource>> {
        let resources = match kind {
            ResourceKind::Pod => self
                .accessor
                .list_pods(cluster_id, namespace)
                .await?
                .into_iter()
                .map(|r| WorkloadResource::Pod(Box::new(r)))
                .collect(),
            ResourceKind::Deployment => self
                .accessor
                .list_deployments(cluster_id, namespace)
                .await?
                .into_iter()
                .map(|r| WorkloadResource::Deployment(Box::new(r)))
                .collect(),
            ResourceKind::DaemonSet => self
                .accessor
                .list_daemonsets(cluster_id, namespace)
                .await?
                .into_iter()
                .map(|r| WorkloadResource::DaemonSet(Box::new(r)))
                .collect(),
            ResourceKind::StatefulSet => self
                .accessor
                .list_statefulsets(cluster_id, namespace)
                .await?
                .into_iter()
                .map(|r| WorkloadResource::StatefulSet(Box::new(r)))
                .collect(),
            ResourceKind::ReplicaSet => self
                .accessor
                .list_replicasets(cluster_id, namespace)
                .await?
                .into_iter()
                .map(|r| WorkloadResource::ReplicaSet(Box::new(r)))
                .collect(),
            ResourceKind::Job => self
                .accessor
                .list_jobs(cluster_id, namespace)
                .await?
                .into_iter()
                .map(|r| WorkloadResource::Job(Box::new(r)))
                .collect(),
            ResourceKind::CronJob => self
                .accessor
                .list_cronjobs(cluster_id, namespace)
                .await?
                .into_iter()
                .map(|r| WorkloadResource::CronJob(Box::new(r)))
                .collect(),
            ResourceKind::Node => self
                .accessor
                .list_nodes(cluster_id)
                .await?
                .into_iter()
                .map(|r| WorkloadResource::Node(Box::new(r)))
                .collect(),
        };
        Ok(resources)
    }
}

/// The caller-facing one-fault-per-resource dedup pass: keyed by
/// `(namespace, kind, name)`, keeps the fault with the lowest severity
/// ordinal (most severe); ties broken by detector declaration order, which
/// is exactly the order faults already arrive in from [`ScanOrchestrator`].
pub fn dedup_faults(faults: Vec<FaultInfo>) -> Vec<FaultInfo> {
    let mut best: HashMap<(Option<String>, ResourceKind, String), FaultInfo> = HashMap::new();
    let mut order: Vec<(Option<String>, ResourceKind, String)> = Vec::new();

    for fault in faults {
        let key = fault.dedup_key();
        match best.get(&key) {
            Some(existing) if existing.severity <= fault.severity => {}
            Some(_) => {
                best.insert(key, fault);
            }
            None => {
                order.push(key.clone());
                best.insert(key, fault);
            }
        }
    }

    order.into_iter().filter_map(|key| best.remove(&key)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FaultType, Severity};
    use chrono::Utc;

    fn fault(name: &str, severity: Severity, fault_type: FaultType) -> FaultInfo {
        FaultInfo {
            fault_type,
            severity,
            resource_kind: ResourceKind::Pod,
            namespace: Some("default".to_string()),
            resource_name: name.to_string(),
            summary: "s".to_string(),
            description: "d".to_string(),
            symptoms: Vec::new(),
            context: Default::default(),
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn dedup_keeps_one_per_resource_and_the_most_severe() {
        let faults = vec![
            fault("api-0", Severity::High, FaultType::OomKilled),
            fault("api-0", Severity::Critical, FaultType::CrashLoopBackOff),
            fault("other-0", Severity::Medium, FaultType::Pending),
        ];
        let deduped = dedup_faults(faults);
        assert_eq!(deduped.len(), 2);
        let api = deduped.iter().find(|f| f.resource_name == "api-0").unwrap();
        assert_eq!(api.severity, Severity::Critical);
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let faults = vec![
            fault("b", Severity::Medium, FaultType::Pending),
            fault("a", Severity::Medium, FaultType::Pending),
        ];
        let deduped = dedup_faults(faults);
        assert_eq!(deduped[0].resource_name, "b");
        assert_eq!(deduped[1].resource_name, "a");
    }

    #[test]
    fn dedup_breaks_ties_by_first_declaration_order() {
        let faults = vec![
            fault("x", Severity::Critical, FaultType::OomKilled),
            fault("x", Severity::Critical, FaultType::CrashLoopBackOff),
        ];
        let deduped = dedup_faults(faults);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].fault_type, FaultType::OomKilled);
    }
}
