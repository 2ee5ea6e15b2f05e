mod job;
mod node;
mod pod;
mod workload;

use k8s_openapi::api::core::v1::Pod;
use uuid::Uuid;

use crate::models::{FaultType, ResourceKind, WorkloadResource};

pub use job::{CronJobFailedDetector, JobFailedDetector};
pub use node::NodeConditionDetector;
pub use pod::{
    CreateContainerConfigErrorDetector, CreateContainerErrorDetector, CrashLoopBackOffDetector,
    EvictedDetector, ImagePullBackOffDetector, LivenessProbeFailedDetector, NetworkErrorDetector,
    OomKilledDetector, PendingDetector, ReadinessProbeFailedDetector, StartupProbeFailedDetector,
    TerminatingStuckDetector, VolumeMountErrorDetector,
};
pub use workload::{
    DaemonSetUnavailableDetector, DeploymentUnavailableDetector, ReplicaSetUnavailableDetector,
    StatefulSetUnavailableDetector,
};

use crate::models::FaultInfo;

/// C3 — the shared detector contract. A detector is pure with respect to
/// its inputs: it MUST NOT panic on an unexpected shape, returning an
/// empty vec instead.
pub trait Detector: Send + Sync {
    fn fault_type(&self) -> FaultType;
    fn can_detect(&self, kind: ResourceKind) -> bool;
    fn detect(&self, cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo>;
}

/// The detector set is open: registering a new one here is the only change
/// C4 needs. Declaration order here is the tie-break order used by the
/// scan orchestrator's dedup pass.
pub fn all_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(CrashLoopBackOffDetector),
        Box::new(ImagePullBackOffDetector),
        Box::new(OomKilledDetector),
        Box::new(PendingDetector),
        Box::new(LivenessProbeFailedDetector),
        Box::new(ReadinessProbeFailedDetector),
        Box::new(StartupProbeFailedDetector),
        Box::new(CreateContainerConfigErrorDetector),
        Box::new(CreateContainerErrorDetector),
        Box::new(VolumeMountErrorDetector),
        Box::new(NetworkErrorDetector),
        Box::new(EvictedDetector),
        Box::new(TerminatingStuckDetector),
        Box::new(DeploymentUnavailableDetector),
        Box::new(StatefulSetUnavailableDetector),
        Box::new(DaemonSetUnavailableDetector),
        Box::new(ReplicaSetUnavailableDetector),
        Box::new(JobFailedDetector),
        Box::new(CronJobFailedDetector),
        Box::new(NodeConditionDetector),
    ]
}

/// For any Pod, resolves `(ownerKind, ownerName)` from
/// `metadata.ownerReferences[0]`. A bare ReplicaSet owner is promoted to
/// `Deployment` with its hash suffix (text after the last `-`) stripped —
/// the common `deploy-7f8c9d` → `deploy` case.
pub fn resolve_owner(pod: &Pod) -> (String, String) {
    let owner_ref = pod
        .metadata
        .owner_references
        .as_ref()
        .and_then(|refs| refs.first());

    match owner_ref {
        None => (
            "Pod".to_string(),
            pod.metadata.name.clone().unwrap_or_default(),
        ),
        Some(owner) if owner.kind == "ReplicaSet" => {
            let name = match owner.name.rsplit_once('-') {
                Some((base, _suffix)) => base.to_string(),
                None => owner.name.clone(),
            };
            ("Deployment".to_string(), name)
        }
        Some(owner) => (owner.kind.clone(), owner.name.clone()),
    }
}

/// Case-insensitive "does this text contain any of these keywords" check,
/// shared by every message-classification branch in the detector catalog.
pub(crate) fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    keywords.iter().any(|kw| lower.contains(&kw.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

    fn pod_with_owner(kind: &str, name: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("victim-pod".to_string()),
                owner_references: Some(vec![OwnerReference {
                    kind: kind.to_string(),
                    name: name.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn resolve_owner_promotes_replicaset_and_strips_hash() {
        let pod = pod_with_owner("ReplicaSet", "checkout-7f8c9d9c6b");
        assert_eq!(resolve_owner(&pod), ("Deployment".to_string(), "checkout".to_string()));
    }

    #[test]
    fn resolve_owner_falls_back_to_pod_when_no_owner() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("standalone".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(resolve_owner(&pod), ("Pod".to_string(), "standalone".to_string()));
    }

    #[test]
    fn resolve_owner_keeps_statefulset_kind_verbatim() {
        let pod = pod_with_owner("StatefulSet", "db");
        assert_eq!(resolve_owner(&pod), ("StatefulSet".to_string(), "db".to_string()));
    }

    #[test]
    fn contains_any_is_case_insensitive() {
        assert!(contains_any("Connection TIMEOUT while pulling", &["timeout"]));
        assert!(!contains_any("all good", &["timeout", "error"]));
    }

    #[test]
    fn all_detectors_registers_every_catalog_entry() {
        assert_eq!(all_detectors().len(), 20);
    }
}
