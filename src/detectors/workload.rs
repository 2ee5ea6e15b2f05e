use uuid::Uuid;

use crate::detectors::Detector;
use crate::models::{FaultInfo, FaultType, ResourceKind, WorkloadResource};

fn name_of(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

pub struct DeploymentUnavailableDetector;

impl Detector for DeploymentUnavailableDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::DeploymentUnavailable
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Deployment
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let WorkloadResource::Deployment(deployment) = resource else { return Vec::new() };
        let desired = deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
        let status = deployment.status.as_ref();
        let available = status.and_then(|s| s.available_replicas).unwrap_or(0);
        let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);

        if available >= desired {
            return Vec::new();
        }

        vec![FaultInfo::new(
            FaultType::DeploymentUnavailable,
            ResourceKind::Deployment,
            namespace.map(|s| s.to_string()),
            name_of(&deployment.metadata),
            "Deployment has fewer available replicas than desired",
            format!("{} of {} replicas desired are available", available, desired),
        )
        .with_context("desired", desired as i64)
        .with_context("available", available as i64)
        .with_context("ready", ready as i64)]
    }
}

pub struct StatefulSetUnavailableDetector;

impl Detector for StatefulSetUnavailableDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::DeploymentUnavailable
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::StatefulSet
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let WorkloadResource::StatefulSet(sts) = resource else { return Vec::new() };
        let desired = sts.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
        let ready = sts.status.as_ref().map(|s| s.ready_replicas.unwrap_or(0)).unwrap_or(0);

        if ready >= desired {
            return Vec::new();
        }

        let name = name_of(&sts.metadata);
        let ordinal_hint = if ready > 0 {
            format!("{}-0..{}-{} are ready", name, name, ready - 1)
        } else {
            format!("no replicas of {} are ready", name)
        };

        vec![FaultInfo::new(
            FaultType::DeploymentUnavailable,
            ResourceKind::StatefulSet,
            namespace.map(|s| s.to_string()),
            name,
            "StatefulSet has fewer ready replicas than desired",
            ordinal_hint,
        )
        .with_context("desired", desired as i64)
        .with_context("ready", ready as i64)]
    }
}

pub struct DaemonSetUnavailableDetector;

impl Detector for DaemonSetUnavailableDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::DeploymentUnavailable
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::DaemonSet
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let WorkloadResource::DaemonSet(ds) = resource else { return Vec::new() };
        let Some(status) = &ds.status else { return Vec::new() };
        if status.number_ready >= status.desired_number_scheduled {
            return Vec::new();
        }

        let mut fault = FaultInfo::new(
            FaultType::DeploymentUnavailable,
            ResourceKind::DaemonSet,
            namespace.map(|s| s.to_string()),
            name_of(&ds.metadata),
            "DaemonSet has fewer ready pods than desired",
            format!("{} of {} scheduled pods are ready", status.number_ready, status.desired_number_scheduled),
        )
        .with_context("desired", status.desired_number_scheduled as i64)
        .with_context("ready", status.number_ready as i64);

        if status.number_misscheduled > 0 {
            fault = fault.with_context("misscheduled", status.number_misscheduled as i64);
        }

        vec![fault]
    }
}

pub struct ReplicaSetUnavailableDetector;

impl Detector for ReplicaSetUnavailableDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::DeploymentUnavailable
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::ReplicaSet
    }

    /// Skipped when the ReplicaSet is owned by a Deployment, since the
    /// Deployment-level detector already reports the same unavailability
    /// to avoid double-reporting the same outage from both resources.
    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let WorkloadResource::ReplicaSet(rs) = resource else { return Vec::new() };
        let owned_by_deployment = rs
            .metadata
            .owner_references
            .as_ref()
            .map(|refs| refs.iter().any(|r| r.kind == "Deployment"))
            .unwrap_or(false);
        if owned_by_deployment {
            return Vec::new();
        }

        let desired = rs.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
        let ready = rs.status.ready_replicas.unwrap_or(0);
        if ready >= desired {
            return Vec::new();
        }

        vec![FaultInfo::new(
            FaultType::DeploymentUnavailable,
            ResourceKind::ReplicaSet,
            namespace.map(|s| s.to_string()),
            name_of(&rs.metadata),
            "ReplicaSet has fewer ready replicas than desired",
            format!("{} of {} replicas are ready", ready, desired),
        )
        .with_context("desired", desired as i64)
        .with_context("ready", ready as i64)]
    }
}
