use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::models::ResourceKind;

/// Ordinal-comparable severity. Declaration order matches the required
/// `CRITICAL < HIGH < MEDIUM < LOW` ordering exactly — derive(Ord) walks
/// variants in declaration order, so `Severity::Critical` is the smallest
/// ordinal (most severe).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CRITICAL" => Some(Severity::Critical),
            "HIGH" => Some(Severity::High),
            "MEDIUM" => Some(Severity::Medium),
            "LOW" => Some(Severity::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed catalog of fault families. Each carries a stable string code, a
/// human description, and a default severity which a detector may override.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultType {
    CrashLoopBackOff,
    ImagePullBackOff,
    OomKilled,
    Pending,
    LivenessProbeFailed,
    ReadinessProbeFailed,
    StartupProbeFailed,
    ConfigError,
    CreateContainerConfigError,
    CreateContainerError,
    PvcError,
    VolumeMountError,
    NetworkError,
    ResourceQuotaExceeded,
    InsufficientResources,
    NodeNotReady,
    NodePressure,
    DeploymentUnavailable,
    Evicted,
    TerminatingStuck,
    JobFailed,
    CronJobFailed,
    Unknown,
}

impl FaultType {
    pub fn code(&self) -> &'static str {
        match self {
            FaultType::CrashLoopBackOff => "CRASH_LOOP_BACK_OFF",
            FaultType::ImagePullBackOff => "IMAGE_PULL_BACK_OFF",
            FaultType::OomKilled => "OOM_KILLED",
            FaultType::Pending => "PENDING",
            FaultType::LivenessProbeFailed => "LIVENESS_PROBE_FAILED",
            FaultType::ReadinessProbeFailed => "READINESS_PROBE_FAILED",
            FaultType::StartupProbeFailed => "STARTUP_PROBE_FAILED",
            FaultType::ConfigError => "CONFIG_ERROR",
            FaultType::CreateContainerConfigError => "CREATE_CONTAINER_CONFIG_ERROR",
            FaultType::CreateContainerError => "CREATE_CONTAINER_ERROR",
            FaultType::PvcError => "PVC_ERROR",
            FaultType::VolumeMountError => "VOLUME_MOUNT_ERROR",
            FaultType::NetworkError => "NETWORK_ERROR",
            FaultType::ResourceQuotaExceeded => "RESOURCE_QUOTA_EXCEEDED",
            FaultType::InsufficientResources => "INSUFFICIENT_RESOURCES",
            FaultType::NodeNotReady => "NODE_NOT_READY",
            FaultType::NodePressure => "NODE_PRESSURE",
            FaultType::DeploymentUnavailable => "DEPLOYMENT_UNAVAILABLE",
            FaultType::Evicted => "EVICTED",
            FaultType::TerminatingStuck => "TERMINATING_STUCK",
            FaultType::JobFailed => "JOB_FAILED",
            FaultType::CronJobFailed => "CRONJOB_FAILED",
            FaultType::Unknown => "UNKNOWN",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FaultType::CrashLoopBackOff => "Container is repeatedly crashing and being restarted",
            FaultType::ImagePullBackOff => "Container image could not be pulled",
            FaultType::OomKilled => "Container was killed by the OOM killer",
            FaultType::Pending => "Pod has not been scheduled onto a node",
            FaultType::LivenessProbeFailed => "Liveness probe is failing, causing restarts",
            FaultType::ReadinessProbeFailed => "Readiness probe is failing, pod is not serving",
            FaultType::StartupProbeFailed => "Startup probe has not succeeded",
            FaultType::ConfigError => "Container configuration is invalid",
            FaultType::CreateContainerConfigError => {
                "Container could not be configured from ConfigMap/Secret references"
            }
            FaultType::CreateContainerError => "Container runtime failed to create the container",
            FaultType::PvcError => "PersistentVolumeClaim could not be bound or mounted",
            FaultType::VolumeMountError => "A volume failed to mount into the container",
            FaultType::NetworkError => "Pod networking could not be established",
            FaultType::ResourceQuotaExceeded => "Namespace resource quota was exceeded",
            FaultType::InsufficientResources => "Cluster lacks sufficient CPU/memory to schedule the pod",
            FaultType::NodeNotReady => "Node is not in the Ready condition",
            FaultType::NodePressure => "Node is under resource pressure",
            FaultType::DeploymentUnavailable => "Deployment has fewer available replicas than desired",
            FaultType::Evicted => "Pod was evicted from its node",
            FaultType::TerminatingStuck => "Pod has been stuck terminating",
            FaultType::JobFailed => "Job did not complete successfully",
            FaultType::CronJobFailed => "CronJob is suspended, stale, or over-concurrent",
            FaultType::Unknown => "Unclassified fault",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            FaultType::CrashLoopBackOff => Severity::Critical,
            FaultType::ImagePullBackOff => Severity::Critical,
            FaultType::OomKilled => Severity::Critical,
            FaultType::Pending => Severity::High,
            FaultType::LivenessProbeFailed => Severity::High,
            FaultType::ReadinessProbeFailed => Severity::Medium,
            FaultType::StartupProbeFailed => Severity::High,
            FaultType::ConfigError => Severity::Critical,
            FaultType::CreateContainerConfigError => Severity::Critical,
            FaultType::CreateContainerError => Severity::Critical,
            FaultType::PvcError => Severity::High,
            FaultType::VolumeMountError => Severity::High,
            FaultType::NetworkError => Severity::High,
            FaultType::ResourceQuotaExceeded => Severity::High,
            FaultType::InsufficientResources => Severity::High,
            FaultType::NodeNotReady => Severity::Critical,
            FaultType::NodePressure => Severity::High,
            FaultType::DeploymentUnavailable => Severity::High,
            FaultType::Evicted => Severity::High,
            FaultType::TerminatingStuck => Severity::High,
            FaultType::JobFailed => Severity::High,
            FaultType::CronJobFailed => Severity::Medium,
            FaultType::Unknown => Severity::Low,
        }
    }
}

impl std::fmt::Display for FaultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single detected fault on one resource.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaultInfo {
    pub fault_type: FaultType,
    pub severity: Severity,
    pub resource_kind: ResourceKind,
    pub namespace: Option<String>,
    pub resource_name: String,
    pub summary: String,
    pub description: String,
    pub symptoms: Vec<String>,
    pub context: HashMap<String, Value>,
    pub detected_at: DateTime<Utc>,
}

impl FaultInfo {
    /// Builds a fault with the family's default severity; callers that need
    /// a detector-specific override should set `severity` afterwards.
    pub fn new(
        fault_type: FaultType,
        resource_kind: ResourceKind,
        namespace: Option<String>,
        resource_name: impl Into<String>,
        summary: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            severity: fault_type.default_severity(),
            fault_type,
            resource_kind,
            namespace,
            resource_name: resource_name.into(),
            summary: summary.into(),
            description: description.into(),
            symptoms: Vec::new(),
            context: HashMap::new(),
            detected_at: Utc::now(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_symptom(mut self, symptom: impl Into<String>) -> Self {
        self.symptoms.push(symptom.into());
        self
    }

    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(|v| v.as_str())
    }

    pub fn context_bool(&self, key: &str) -> Option<bool> {
        self.context.get(key).and_then(|v| v.as_bool())
    }

    pub fn context_i64(&self, key: &str) -> Option<i64> {
        self.context.get(key).and_then(|v| v.as_i64())
    }

    /// `(namespace, kind, name)` dedup key used by the scan orchestrator.
    pub fn dedup_key(&self) -> (Option<String>, ResourceKind, String) {
        (self.namespace.clone(), self.resource_kind, self.resource_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_matches_spec() {
        assert!(Severity::Critical < Severity::High);
        assert!(Severity::High < Severity::Medium);
        assert!(Severity::Medium < Severity::Low);
    }

    #[test]
    fn severity_parse_roundtrip() {
        assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
        assert_eq!(Severity::parse("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse("bogus"), None);
    }

    #[test]
    fn fault_info_carries_default_severity() {
        let fault = FaultInfo::new(
            FaultType::OomKilled,
            ResourceKind::Pod,
            Some("default".to_string()),
            "api-0",
            "OOM",
            "Container was OOM killed",
        );
        assert_eq!(fault.severity, Severity::Critical);
    }
}
