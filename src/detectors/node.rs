use uuid::Uuid;

use crate::detectors::Detector;
use crate::models::{FaultInfo, FaultType, ResourceKind, Severity, WorkloadResource};

const PRESSURE_CONDITIONS: &[(&str, &str)] = &[
    ("MemoryPressure", "MEMORY_PRESSURE"),
    ("DiskPressure", "DISK_PRESSURE"),
    ("PIDPressure", "PID_PRESSURE"),
    ("NetworkUnavailable", "NETWORK_UNAVAILABLE"),
];

/// A single detector covering both node fault families: `NodeNotReady`
/// fires once per node, `NodePressure` fires once per `True` pressure
/// condition.
pub struct NodeConditionDetector;

impl Detector for NodeConditionDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::NodeNotReady
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Node
    }

    fn detect(&self, _cluster_id: Uuid, _namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let WorkloadResource::Node(node) = resource else { return Vec::new() };
        let name = node.metadata.name.clone().unwrap_or_default();
        let conditions = node.status.as_ref().and_then(|s| s.conditions.clone()).unwrap_or_default();
        let mut faults = Vec::new();

        let ready = conditions.iter().any(|c| c.type_ == "Ready" && c.status == "True");
        if !ready {
            let reason = conditions
                .iter()
                .find(|c| c.type_ == "Ready")
                .and_then(|c| c.reason.clone())
                .unwrap_or_default();
            faults.push(
                FaultInfo::new(
                    FaultType::NodeNotReady,
                    ResourceKind::Node,
                    None,
                    name.clone(),
                    "Node is not in the Ready condition",
                    if reason.is_empty() { "No Ready=True condition reported".to_string() } else { reason.clone() },
                )
                .with_context("nodeName", name.clone())
                .with_context("issueCategory", "NODE_NOT_READY"),
            );
        }

        for (pressure_type, issue_category) in PRESSURE_CONDITIONS {
            let is_active = conditions
                .iter()
                .any(|c| &c.type_ == pressure_type && c.status == "True");
            if !is_active {
                continue;
            }

            faults.push(
                FaultInfo::new(
                    FaultType::NodePressure,
                    ResourceKind::Node,
                    None,
                    name.clone(),
                    format!("Node is under {}", pressure_type),
                    conditions
                        .iter()
                        .find(|c| &c.type_ == pressure_type)
                        .and_then(|c| c.message.clone())
                        .unwrap_or_default(),
                )
                .with_severity(Severity::High)
                .with_context("nodeName", name.clone())
                .with_context("issueCategory", *issue_category),
            );
        }

        faults
    }
}
