use chrono::Utc;
use k8s_openapi::api::core::v1::{Container, ContainerState, ContainerStatus, Pod};
use uuid::Uuid;

use crate::detectors::{contains_any, resolve_owner, Detector};
use crate::models::{FaultInfo, FaultType, ResourceKind, WorkloadResource};

const TERMINATING_STUCK_THRESHOLD: chrono::Duration = chrono::Duration::minutes(5);

fn as_pod<'a>(resource: &'a WorkloadResource) -> Option<&'a Pod> {
    match resource {
        WorkloadResource::Pod(pod) => Some(pod),
        _ => None,
    }
}

fn container_statuses(pod: &Pod) -> Vec<&ContainerStatus> {
    let mut statuses: Vec<&ContainerStatus> = Vec::new();
    if let Some(status) = &pod.status {
        if let Some(cs) = &status.init_container_statuses {
            statuses.extend(cs.iter());
        }
        if let Some(cs) = &status.container_statuses {
            statuses.extend(cs.iter());
        }
    }
    statuses
}

fn container_spec<'a>(pod: &'a Pod, name: &str) -> Option<&'a Container> {
    pod.spec.as_ref().and_then(|spec| {
        spec.containers
            .iter()
            .chain(spec.init_containers.iter().flatten())
            .find(|c| c.name == name)
    })
}

fn has_liveness_probe(pod: &Pod, name: &str) -> bool {
    container_spec(pod, name).map(|c| c.liveness_probe.is_some()).unwrap_or(false)
}

fn has_startup_probe(pod: &Pod, name: &str) -> bool {
    container_spec(pod, name).map(|c| c.startup_probe.is_some()).unwrap_or(false)
}

fn has_readiness_probe(pod: &Pod, name: &str) -> bool {
    container_spec(pod, name).map(|c| c.readiness_probe.is_some()).unwrap_or(false)
}

fn base_fault(
    fault_type: FaultType,
    pod: &Pod,
    namespace: Option<&str>,
    summary: impl Into<String>,
    description: impl Into<String>,
) -> FaultInfo {
    let (owner_kind, owner_name) = resolve_owner(pod);
    FaultInfo::new(
        fault_type,
        ResourceKind::Pod,
        namespace.map(|s| s.to_string()),
        pod.metadata.name.clone().unwrap_or_default(),
        summary,
        description,
    )
    .with_context("ownerKind", owner_kind)
    .with_context("ownerName", owner_name)
}

/// Exit-code → category map shared by CrashLoopBackOff's fallback branch.
fn exit_code_category(exit_code: i32) -> &'static str {
    match exit_code {
        127 => "COMMAND_NOT_FOUND",
        126 => "PERMISSION_DENIED",
        1 => "APPLICATION_ERROR",
        143 => "SIGTERM_RECEIVED",
        _ => "SIGNAL_KILLED",
    }
}

pub struct CrashLoopBackOffDetector;

impl Detector for CrashLoopBackOffDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::CrashLoopBackOff
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let mut faults = Vec::new();

        for status in container_statuses(pod) {
            let waiting_reason = status
                .state
                .as_ref()
                .and_then(|s: &ContainerState| s.waiting.as_ref())
                .map(|w| w.reason.clone().unwrap_or_default());

            if waiting_reason.as_deref() != Some("CrashLoopBackOff") {
                continue;
            }

            let terminated = status.last_state.as_ref().and_then(|s| s.terminated.as_ref());
            let termination_reason = terminated.and_then(|t| t.reason.clone()).unwrap_or_default();
            let termination_message = terminated.and_then(|t| t.message.clone()).unwrap_or_default();
            let exit_code = terminated.map(|t| t.exit_code).unwrap_or(0);
            let message_lower = termination_message.to_lowercase();
            let has_liveness = has_liveness_probe(pod, &status.name);
            let has_startup = has_startup_probe(pod, &status.name);

            let issue_category = if termination_reason == "OOMKilled" {
                "OOM_KILLED"
            } else if contains_any(&message_lower, &["liveness", "probe"]) {
                "LIVENESS_PROBE_KILLED"
            } else if contains_any(&message_lower, &["startup"]) && message_lower.contains("probe") {
                "STARTUP_PROBE_KILLED"
            } else if exit_code == 137 {
                if has_startup {
                    "STARTUP_PROBE_KILLED"
                } else if has_liveness {
                    "LIVENESS_PROBE_KILLED"
                } else {
                    "SIGKILL_NOT_OOM"
                }
            } else {
                exit_code_category(exit_code)
            };

            let fault = base_fault(
                FaultType::CrashLoopBackOff,
                pod,
                namespace,
                format!("Container {} is in CrashLoopBackOff", status.name),
                format!("Container {} has restarted {} times and is backing off", status.name, status.restart_count),
            )
            .with_context("containerName", status.name.clone())
            .with_context("restartCount", status.restart_count as i64)
            .with_context("exitCode", exit_code as i64)
            .with_context("terminationReason", termination_reason)
            .with_context("terminationMessage", termination_message)
            .with_context("issueCategory", issue_category)
            .with_context("hasLivenessProbe", has_liveness)
            .with_context("hasStartupProbe", has_startup);

            faults.push(fault);
        }

        faults
    }
}

pub struct ImagePullBackOffDetector;

impl Detector for ImagePullBackOffDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::ImagePullBackOff
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let mut faults = Vec::new();

        for status in container_statuses(pod) {
            let waiting = status.state.as_ref().and_then(|s| s.waiting.as_ref());
            let Some(waiting) = waiting else { continue };
            let reason = waiting.reason.clone().unwrap_or_default();
            if reason != "ImagePullBackOff" && reason != "ErrImagePull" {
                continue;
            }

            let message = waiting.message.clone().unwrap_or_default();
            let lower = message.to_lowercase();
            let error_category = if lower.contains("unauthorized") || lower.contains("401") {
                "UNAUTHORIZED"
            } else if lower.contains("not found") || lower.contains("404") {
                "NOT_FOUND"
            } else if lower.contains("timeout") {
                "TIMEOUT"
            } else if lower.contains("rate limit") || lower.contains("429") || lower.contains("toomanyrequests") {
                "RATE_LIMIT"
            } else if lower.contains("manifest") {
                "MANIFEST_ERROR"
            } else if lower.contains("forbidden") || lower.contains("403") {
                "FORBIDDEN"
            } else {
                "PULL_ERROR_UNKNOWN"
            };

            let image = container_spec(pod, &status.name)
                .and_then(|c| c.image.clone())
                .unwrap_or_default();

            faults.push(
                base_fault(
                    FaultType::ImagePullBackOff,
                    pod,
                    namespace,
                    format!("Container {} cannot pull its image", status.name),
                    message.clone(),
                )
                .with_context("containerName", status.name.clone())
                .with_context("image", image)
                .with_context("errorMessage", message)
                .with_context("issueCategory", error_category),
            );
        }

        faults
    }
}

pub struct OomKilledDetector;

impl Detector for OomKilledDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::OomKilled
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    /// Intentionally overlaps with `CrashLoopBackOffDetector` — the scan
    /// orchestrator's one-fault-per-resource dedup resolves the overlap.
    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let mut faults = Vec::new();

        for status in container_statuses(pod) {
            let terminated = status.last_state.as_ref().and_then(|s| s.terminated.as_ref());
            let Some(terminated) = terminated else { continue };
            if terminated.reason.as_deref() != Some("OOMKilled") {
                continue;
            }

            faults.push(
                base_fault(
                    FaultType::OomKilled,
                    pod,
                    namespace,
                    format!("Container {} was OOM killed", status.name),
                    "The container exceeded its memory limit and was killed by the kernel",
                )
                .with_context("containerName", status.name.clone())
                .with_context("exitCode", terminated.exit_code as i64)
                .with_context("restartCount", status.restart_count as i64)
                .with_context("issueCategory", "OOM_KILLED"),
            );
        }

        faults
    }
}

pub struct PendingDetector;

impl Detector for PendingDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::Pending
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let Some(status) = &pod.status else { return Vec::new() };
        if status.phase.as_deref() != Some("Pending") {
            return Vec::new();
        }

        let scheduled_condition = status
            .conditions
            .as_ref()
            .and_then(|conds| conds.iter().find(|c| c.type_ == "PodScheduled" && c.status == "False"));
        let message = scheduled_condition
            .and_then(|c| c.message.clone())
            .unwrap_or_default();
        let lower = message.to_lowercase();

        let issue_category = if contains_any(&lower, &["unbound", "persistentvolumeclaim", "storage"]) {
            "PVC_BINDING"
        } else if lower.contains("insufficient cpu") {
            "RESOURCE_SHORTAGE_CPU"
        } else if lower.contains("insufficient memory") {
            "RESOURCE_SHORTAGE_MEMORY"
        } else if lower.contains("insufficient") {
            "RESOURCE_SHORTAGE"
        } else if contains_any(&lower, &["didn't match", "matchnodeselector"]) {
            "NODE_SELECTION"
        } else if contains_any(&lower, &["taint", "toleration"]) {
            "TAINT_TOLERATION"
        } else if contains_any(&lower, &["affinity"]) {
            "NODE_SELECTION"
        } else {
            "UNSCHEDULABLE_UNKNOWN"
        };

        vec![base_fault(
            FaultType::Pending,
            pod,
            namespace,
            "Pod has not been scheduled onto a node",
            if message.is_empty() { "No scheduling condition reported yet".to_string() } else { message.clone() },
        )
        .with_context("schedulingMessage", message)
        .with_context("issueCategory", issue_category)]
    }
}

pub struct LivenessProbeFailedDetector;

impl Detector for LivenessProbeFailedDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::LivenessProbeFailed
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let mut faults = Vec::new();

        for status in container_statuses(pod) {
            let waiting_reason = status.state.as_ref().and_then(|s| s.waiting.as_ref()).and_then(|w| w.reason.clone());
            if waiting_reason.as_deref() == Some("CrashLoopBackOff") {
                continue;
            }
            if status.state.as_ref().and_then(|s| s.running.as_ref()).is_none() {
                continue;
            }
            if !has_liveness_probe(pod, &status.name) || status.restart_count < 1 {
                continue;
            }

            let terminated = status.last_state.as_ref().and_then(|s| s.terminated.as_ref());
            let was_oom = terminated.map(|t| t.reason.as_deref() == Some("OOMKilled")).unwrap_or(false);
            let exit_code = terminated.map(|t| t.exit_code).unwrap_or(0);
            if was_oom || (exit_code != 137 && exit_code != 143) {
                continue;
            }

            faults.push(
                base_fault(
                    FaultType::LivenessProbeFailed,
                    pod,
                    namespace,
                    format!("Container {} is being restarted by its liveness probe", status.name),
                    "The liveness probe is failing and kubelet is restarting the container",
                )
                .with_context("containerName", status.name.clone())
                .with_context("restartCount", status.restart_count as i64)
                .with_context("hasLivenessProbe", true)
                .with_context("issueCategory", "LIVENESS_PROBE_FAILED"),
            );
        }

        faults
    }
}

pub struct ReadinessProbeFailedDetector;

impl Detector for ReadinessProbeFailedDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::ReadinessProbeFailed
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let Some(status) = &pod.status else { return Vec::new() };
        if status.phase.as_deref() != Some("Running") {
            return Vec::new();
        }

        let mut faults = Vec::new();
        for cstatus in container_statuses(pod) {
            if cstatus.state.as_ref().and_then(|s| s.running.as_ref()).is_none() {
                continue;
            }
            if cstatus.ready || !has_readiness_probe(pod, &cstatus.name) {
                continue;
            }

            faults.push(
                base_fault(
                    FaultType::ReadinessProbeFailed,
                    pod,
                    namespace,
                    format!("Container {} is not ready", cstatus.name),
                    "The readiness probe is failing; the pod is not serving traffic",
                )
                .with_context("containerName", cstatus.name.clone())
                .with_context("issueCategory", "READINESS_PROBE_FAILED"),
            );
        }

        faults
    }
}

pub struct StartupProbeFailedDetector;

impl Detector for StartupProbeFailedDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::StartupProbeFailed
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let mut faults = Vec::new();

        for status in container_statuses(pod) {
            if !has_startup_probe(pod, &status.name) {
                continue;
            }
            let started = status.started.unwrap_or(true);
            if started {
                continue;
            }

            let in_crash_loop = status
                .state
                .as_ref()
                .and_then(|s| s.waiting.as_ref())
                .and_then(|w| w.reason.clone())
                .as_deref()
                == Some("CrashLoopBackOff");

            if status.restart_count == 0 && !in_crash_loop {
                continue;
            }

            faults.push(
                base_fault(
                    FaultType::StartupProbeFailed,
                    pod,
                    namespace,
                    format!("Container {} has not passed its startup probe", status.name),
                    "The startup probe has not succeeded since the container started",
                )
                .with_context("containerName", status.name.clone())
                .with_context("hasStartupProbe", true)
                .with_context("issueCategory", "STARTUP_PROBE_FAILED"),
            );
        }

        faults
    }
}

pub struct CreateContainerConfigErrorDetector;

impl Detector for CreateContainerConfigErrorDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::CreateContainerConfigError
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let mut faults = Vec::new();

        for status in container_statuses(pod) {
            let waiting = status.state.as_ref().and_then(|s| s.waiting.as_ref());
            let Some(waiting) = waiting else { continue };
            if waiting.reason.as_deref() != Some("CreateContainerConfigError") {
                continue;
            }

            let message = waiting.message.clone().unwrap_or_default();
            let lower = message.to_lowercase();
            let issue_category = if lower.contains("key") && lower.contains("configmap") {
                "CONFIGMAP_KEY_NOT_FOUND"
            } else if lower.contains("key") && lower.contains("secret") {
                "SECRET_KEY_NOT_FOUND"
            } else if lower.contains("configmap") {
                "CONFIGMAP_NOT_FOUND"
            } else if lower.contains("secret") {
                "SECRET_NOT_FOUND"
            } else if lower.contains("envfrom") {
                "ENVFROM_REFERENCE_ERROR"
            } else if contains_any(&lower, &["volume", "mount"]) {
                "VOLUME_MOUNT_CONFIG_ERROR"
            } else {
                "CONFIG_REFERENCE_ERROR"
            };

            faults.push(
                base_fault(
                    FaultType::CreateContainerConfigError,
                    pod,
                    namespace,
                    format!("Container {} could not be configured", status.name),
                    message.clone(),
                )
                .with_context("containerName", status.name.clone())
                .with_context("errorMessage", message)
                .with_context("issueCategory", issue_category),
            );
        }

        faults
    }
}

pub struct CreateContainerErrorDetector;

impl Detector for CreateContainerErrorDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::CreateContainerError
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let mut faults = Vec::new();

        for status in container_statuses(pod) {
            let waiting = status.state.as_ref().and_then(|s| s.waiting.as_ref());
            let Some(waiting) = waiting else { continue };
            if waiting.reason.as_deref() != Some("CreateContainerError") {
                continue;
            }

            let message = waiting.message.clone().unwrap_or_default();
            let lower = message.to_lowercase();
            let issue_category = if lower.contains("executable file not found") || lower.contains("command not found") {
                "COMMAND_NOT_FOUND"
            } else if lower.contains("permission denied") {
                "PERMISSION_DENIED"
            } else if lower.contains("entrypoint") {
                "ENTRYPOINT_ERROR"
            } else if contains_any(&lower, &["mount", "volume"]) {
                "VOLUME_MOUNT_ERROR"
            } else if lower.contains("oci runtime") {
                "OCI_RUNTIME_ERROR"
            } else if contains_any(&lower, &["securitycontext", "security context", "capability"]) {
                "SECURITY_CONTEXT_ERROR"
            } else {
                "CONTAINER_CREATE_ERROR"
            };

            faults.push(
                base_fault(
                    FaultType::CreateContainerError,
                    pod,
                    namespace,
                    format!("Container runtime failed to create {}", status.name),
                    message.clone(),
                )
                .with_context("containerName", status.name.clone())
                .with_context("errorMessage", message)
                .with_context("issueCategory", issue_category),
            );
        }

        faults
    }
}

const VOLUME_KEYWORDS: &[&str] = &[
    "mountvolume",
    "failed to mount",
    "read-only",
    "fsgroup",
    "chown",
    "csi",
];

pub struct VolumeMountErrorDetector;

impl Detector for VolumeMountErrorDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::VolumeMountError
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let Some(status) = &pod.status else { return Vec::new() };

        let condition_message = status
            .conditions
            .as_ref()
            .and_then(|conds| conds.iter().find(|c| c.status == "False" && contains_any(&c.message.clone().unwrap_or_default(), VOLUME_KEYWORDS)))
            .and_then(|c| c.message.clone());

        let waiting_message = container_statuses(pod).into_iter().find_map(|cs| {
            let waiting = cs.state.as_ref().and_then(|s| s.waiting.as_ref())?;
            let msg = waiting.message.clone().unwrap_or_default();
            if contains_any(&msg, VOLUME_KEYWORDS) {
                Some(msg)
            } else {
                None
            }
        });

        let Some(message) = condition_message.or(waiting_message) else {
            return Vec::new();
        };

        let lower = message.to_lowercase();
        let issue_category = if lower.contains("read-only") {
            "READONLY_FS"
        } else if lower.contains("fsgroup") {
            "FSGROUP_ERROR"
        } else if lower.contains("permission") {
            "PERMISSION_DENIED"
        } else if lower.contains("subpath") {
            "SUBPATH_ERROR"
        } else if lower.contains("csi") {
            "CSI_MOUNT_ERROR"
        } else if contains_any(&lower, &["mountvolume", "failed to mount"]) {
            "MOUNT_SETUP_FAILED"
        } else {
            "VOLUME_MOUNT_UNKNOWN"
        };

        vec![base_fault(
            FaultType::VolumeMountError,
            pod,
            namespace,
            "A volume failed to mount",
            message.clone(),
        )
        .with_context("errorMessage", message)
        .with_context("issueCategory", issue_category)]
    }
}

const NETWORK_KEYWORDS: &[&str] = &["network", "cni", "sandbox", "failed to create pod sandbox"];

pub struct NetworkErrorDetector;

impl Detector for NetworkErrorDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::NetworkError
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let Some(status) = &pod.status else { return Vec::new() };

        let condition_hit = status.conditions.as_ref().and_then(|conds| {
            conds.iter().find(|c| {
                (c.type_ == "ContainersReady" && c.status == "False" && contains_any(&c.message.clone().unwrap_or_default(), NETWORK_KEYWORDS))
                    || contains_any(&c.reason.clone().unwrap_or_default(), &["networknotready", "cni", "sandboxcreate"])
            })
        });

        let waiting_hit = container_statuses(pod).into_iter().find_map(|cs| {
            let waiting = cs.state.as_ref().and_then(|s| s.waiting.as_ref())?;
            let reason = waiting.reason.clone().unwrap_or_default();
            let message = waiting.message.clone().unwrap_or_default();
            if contains_any(&reason, NETWORK_KEYWORDS) || contains_any(&message, NETWORK_KEYWORDS) {
                Some(message)
            } else {
                None
            }
        });

        let message = condition_hit
            .and_then(|c| c.message.clone())
            .or(waiting_hit);
        let Some(message) = message else { return Vec::new() };

        let lower = message.to_lowercase();
        let issue_category = if lower.contains("cni") {
            "CNI_ERROR"
        } else if lower.contains("dns") {
            "DNS_ERROR"
        } else if lower.contains("sandbox") {
            "SANDBOX_ERROR"
        } else if lower.contains("networkpolicy") || lower.contains("network policy") {
            "NETWORK_POLICY_BLOCKED"
        } else if lower.contains("kube-proxy") || lower.contains("kubeproxy") {
            "KUBE_PROXY_ERROR"
        } else {
            "NETWORK_UNKNOWN"
        };

        vec![base_fault(
            FaultType::NetworkError,
            pod,
            namespace,
            "Pod networking could not be established",
            message.clone(),
        )
        .with_context("errorMessage", message)
        .with_context("issueCategory", issue_category)]
    }
}

pub struct EvictedDetector;

impl Detector for EvictedDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::Evicted
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let Some(status) = &pod.status else { return Vec::new() };
        if status.phase.as_deref() != Some("Failed") || status.reason.as_deref() != Some("Evicted") {
            return Vec::new();
        }

        let message = status.message.clone().unwrap_or_default();
        let lower = message.to_lowercase();
        let issue_category = if lower.contains("ephemeral-storage") || lower.contains("ephemeral storage") {
            "EPHEMERAL_STORAGE_EXCEEDED"
        } else if lower.contains("diskpressure") || lower.contains("disk pressure") {
            "DISK_PRESSURE"
        } else if lower.contains("memorypressure") || lower.contains("memory pressure") {
            "MEMORY_PRESSURE"
        } else if lower.contains("pidpressure") || lower.contains("pid pressure") {
            "PID_PRESSURE"
        } else {
            "NODE_RESOURCE_PRESSURE"
        };

        vec![base_fault(
            FaultType::Evicted,
            pod,
            namespace,
            "Pod was evicted from its node",
            message.clone(),
        )
        .with_context("errorMessage", message)
        .with_context("issueCategory", issue_category)]
    }
}

pub struct TerminatingStuckDetector;

impl Detector for TerminatingStuckDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::TerminatingStuck
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Pod
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let Some(pod) = as_pod(resource) else { return Vec::new() };
        let Some(deletion_timestamp) = pod.metadata.deletion_timestamp.as_ref() else {
            return Vec::new();
        };
        if Utc::now() - deletion_timestamp.0 < TERMINATING_STUCK_THRESHOLD {
            return Vec::new();
        }

        let finalizers = pod.metadata.finalizers.clone().unwrap_or_default();
        let finalizer_text = finalizers.join(",").to_lowercase();
        let phase_running = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .as_deref()
            == Some("Running");

        let issue_category = if contains_any(&finalizer_text, &["volume", "csi"]) {
            "VOLUME_DETACH_STUCK"
        } else if contains_any(&finalizer_text, &["cni", "calico", "flannel", "weave"]) {
            "CNI_CLEANUP_STUCK"
        } else if contains_any(&finalizer_text, &["kubernetes", "foreground"]) {
            "KUBERNETES_FINALIZER_STUCK"
        } else if !finalizers.is_empty() {
            "CUSTOM_FINALIZER_STUCK"
        } else if phase_running {
            "GRACEFUL_SHUTDOWN_STUCK"
        } else {
            "TERMINATING_UNKNOWN"
        };

        let stuck_minutes = (Utc::now() - deletion_timestamp.0).num_minutes();

        vec![base_fault(
            FaultType::TerminatingStuck,
            pod,
            namespace,
            "Pod has been stuck terminating",
            format!("Deletion was requested {} minutes ago and has not completed", stuck_minutes),
        )
        .with_context("finalizers", finalizers.join(","))
        .with_context("stuckMinutes", stuck_minutes)
        .with_context("issueCategory", issue_category)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ContainerStateWaiting, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use rstest::rstest;

    #[rstest]
    #[case(127, "COMMAND_NOT_FOUND")]
    #[case(126, "PERMISSION_DENIED")]
    #[case(1, "APPLICATION_ERROR")]
    #[case(143, "SIGTERM_RECEIVED")]
    #[case(137, "SIGNAL_KILLED")]
    #[case(2, "SIGNAL_KILLED")]
    fn exit_code_category_maps_known_and_fallback_codes(#[case] exit_code: i32, #[case] expected: &str) {
        assert_eq!(exit_code_category(exit_code), expected);
    }

    fn pod_waiting_config_error(message: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("broken".to_string()),
                ..Default::default()
            },
            status: Some(PodStatus {
                container_statuses: Some(vec![ContainerStatus {
                    name: "app".to_string(),
                    state: Some(ContainerState {
                        waiting: Some(ContainerStateWaiting {
                            reason: Some("CreateContainerConfigError".to_string()),
                            message: Some(message.to_string()),
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[rstest]
    #[case("couldn't find key api-key in ConfigMap default/app-config", "CONFIGMAP_KEY_NOT_FOUND")]
    #[case("couldn't find key password in Secret default/app-secret", "SECRET_KEY_NOT_FOUND")]
    #[case("configmap \"app-config\" not found", "CONFIGMAP_NOT_FOUND")]
    #[case("secret \"app-secret\" not found", "SECRET_NOT_FOUND")]
    #[case("error reading envFrom source", "ENVFROM_REFERENCE_ERROR")]
    fn create_container_config_error_categorizes_by_message(#[case] message: &str, #[case] expected: &str) {
        let pod = pod_waiting_config_error(message);
        let resource = WorkloadResource::Pod(Box::new(pod));
        let faults = CreateContainerConfigErrorDetector.detect(Uuid::new_v4(), Some("default"), &resource);
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].context_str("issueCategory"), Some(expected));
    }
}
