use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Node, Pod};
use serde::{Deserialize, Serialize};

/// The closed set of workload kinds this crate scans, plus the cluster-scoped
/// Node kind. Detectors are keyed off this rather than any client-library
/// type so the client library stays confined to the resource accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Pod,
    Deployment,
    StatefulSet,
    DaemonSet,
    ReplicaSet,
    Job,
    CronJob,
    Node,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::StatefulSet => "StatefulSet",
            ResourceKind::DaemonSet => "DaemonSet",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::Job => "Job",
            ResourceKind::CronJob => "CronJob",
            ResourceKind::Node => "Node",
        }
    }

    /// The order `ResourceKind`s are walked in during a scan (stable so
    /// fault emission order is `kind order × resource order × detector
    /// order`).
    pub const SCAN_ORDER: [ResourceKind; 8] = [
        ResourceKind::Pod,
        ResourceKind::Deployment,
        ResourceKind::DaemonSet,
        ResourceKind::StatefulSet,
        ResourceKind::ReplicaSet,
        ResourceKind::Job,
        ResourceKind::CronJob,
        ResourceKind::Node,
    ];
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tagged variant wrapping the already-parsed resource. Detectors receive
/// this rather than a raw client response; the `kube`/`k8s-openapi` types
/// only ever surface here and in the resource accessor, never in the
/// classification or diagnosis layers' public signatures.
#[derive(Clone, Debug)]
pub enum WorkloadResource {
    Pod(Box<Pod>),
    Deployment(Box<Deployment>),
    StatefulSet(Box<StatefulSet>),
    DaemonSet(Box<DaemonSet>),
    ReplicaSet(Box<ReplicaSet>),
    Job(Box<Job>),
    CronJob(Box<CronJob>),
    Node(Box<Node>),
}

impl WorkloadResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            WorkloadResource::Pod(_) => ResourceKind::Pod,
            WorkloadResource::Deployment(_) => ResourceKind::Deployment,
            WorkloadResource::StatefulSet(_) => ResourceKind::StatefulSet,
            WorkloadResource::DaemonSet(_) => ResourceKind::DaemonSet,
            WorkloadResource::ReplicaSet(_) => ResourceKind::ReplicaSet,
            WorkloadResource::Job(_) => ResourceKind::Job,
            WorkloadResource::CronJob(_) => ResourceKind::CronJob,
            WorkloadResource::Node(_) => ResourceKind::Node,
        }
    }

    pub fn name(&self) -> String {
        let meta = match self {
            WorkloadResource::Pod(r) => &r.metadata,
            WorkloadResource::Deployment(r) => &r.metadata,
            WorkloadResource::StatefulSet(r) => &r.metadata,
            WorkloadResource::DaemonSet(r) => &r.metadata,
            WorkloadResource::ReplicaSet(r) => &r.metadata,
            WorkloadResource::Job(r) => &r.metadata,
            WorkloadResource::CronJob(r) => &r.metadata,
            WorkloadResource::Node(r) => &r.metadata,
        };
        meta.name.clone().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<String> {
        let meta = match self {
            WorkloadResource::Pod(r) => &r.metadata,
            WorkloadResource::Deployment(r) => &r.metadata,
            WorkloadResource::StatefulSet(r) => &r.metadata,
            WorkloadResource::DaemonSet(r) => &r.metadata,
            WorkloadResource::ReplicaSet(r) => &r.metadata,
            WorkloadResource::Job(r) => &r.metadata,
            WorkloadResource::CronJob(r) => &r.metadata,
            WorkloadResource::Node(_) => return None,
        };
        meta.namespace.clone()
    }
}
