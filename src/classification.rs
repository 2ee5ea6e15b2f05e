//! C4 — Classification Service. Fans detection out across every registered
//! detector for one resource, then offers grouping/filtering/statistics
//! utilities over the resulting fault list.

use std::panic::{catch_unwind, AssertUnwindSafe};
use uuid::Uuid;

use crate::detectors::{all_detectors, Detector};
use crate::models::{FaultInfo, ResourceKind, Severity, WorkloadResource};

/// Per-severity counts produced by [`statistics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaultStatistics {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

pub struct ClassificationService {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for ClassificationService {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassificationService {
    pub fn new() -> Self {
        Self {
            detectors: all_detectors(),
        }
    }

    /// Fans detection out across every detector whose `can_detect(kind)` is
    /// true. A detector panicking on unexpected shape is swallowed and
    /// logged, never propagated — the detector contract already
    /// forbids this, but a plugin author's bug should not take down a scan.
    pub fn detect_faults(
        &self,
        cluster_id: Uuid,
        namespace: Option<&str>,
        resource: &WorkloadResource,
    ) -> Vec<FaultInfo> {
        let kind = resource.kind();
        let mut faults = Vec::new();

        for detector in &self.detectors {
            if !detector.can_detect(kind) {
                continue;
            }

            let result = catch_unwind(AssertUnwindSafe(|| detector.detect(cluster_id, namespace, resource)));
            match result {
                Ok(detected) => faults.extend(detected),
                Err(_) => {
                    tracing::error!(
                        cluster_id = %cluster_id,
                        fault_type = ?detector.fault_type(),
                        "detector panicked, discarding its output for this resource"
                    );
                }
            }
        }

        faults
    }
}

pub fn group_by_severity(faults: &[FaultInfo]) -> [Vec<&FaultInfo>; 4] {
    let mut groups: [Vec<&FaultInfo>; 4] = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];
    for fault in faults {
        groups[fault.severity as usize].push(fault);
    }
    groups
}

/// Keeps faults whose severity ordinal is ≤ `min_severity`'s ordinal — i.e.
/// at least as severe.
pub fn filter_by_severity(faults: &[FaultInfo], min_severity: Severity) -> Vec<&FaultInfo> {
    faults.iter().filter(|f| f.severity <= min_severity).collect()
}

pub fn statistics(faults: &[FaultInfo]) -> FaultStatistics {
    let mut stats = FaultStatistics {
        total: faults.len(),
        ..Default::default()
    };
    for fault in faults {
        match fault.severity {
            Severity::Critical => stats.critical += 1,
            Severity::High => stats.high += 1,
            Severity::Medium => stats.medium += 1,
            Severity::Low => stats.low += 1,
        }
    }
    stats
}

/// Every `FaultInfo` the classifier can ever hand back carries one of the
/// closed resource kinds and one of the four severities.
pub fn resource_kind_is_supported(kind: ResourceKind) -> bool {
    matches!(
        kind,
        ResourceKind::Pod
            | ResourceKind::Deployment
            | ResourceKind::StatefulSet
            | ResourceKind::DaemonSet
            | ResourceKind::ReplicaSet
            | ResourceKind::Job
            | ResourceKind::CronJob
            | ResourceKind::Node
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FaultType;
    use chrono::Utc;

    fn fault(severity: Severity) -> FaultInfo {
        FaultInfo {
            fault_type: FaultType::Unknown,
            severity,
            resource_kind: ResourceKind::Pod,
            namespace: Some("default".to_string()),
            resource_name: "p".to_string(),
            summary: "s".to_string(),
            description: "d".to_string(),
            symptoms: Vec::new(),
            context: Default::default(),
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn statistics_counts_each_severity_bucket() {
        let faults = vec![
            fault(Severity::Critical),
            fault(Severity::Critical),
            fault(Severity::High),
            fault(Severity::Low),
        ];
        let stats = statistics(&faults);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.critical, 2);
        assert_eq!(stats.high, 1);
        assert_eq!(stats.medium, 0);
        assert_eq!(stats.low, 1);
    }

    #[test]
    fn filter_by_severity_keeps_at_least_as_severe() {
        let faults = vec![fault(Severity::Critical), fault(Severity::Medium), fault(Severity::Low)];
        let filtered = filter_by_severity(&faults, Severity::Medium);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn group_by_severity_buckets_correctly() {
        let faults = vec![fault(Severity::High), fault(Severity::High), fault(Severity::Low)];
        let groups = group_by_severity(&faults);
        assert_eq!(groups[Severity::High as usize].len(), 2);
        assert_eq!(groups[Severity::Low as usize].len(), 1);
    }
}
