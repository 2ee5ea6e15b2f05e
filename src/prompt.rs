//! C6 prompt construction. Both system and user messages use
//! XML-like tag sections so the reply stays structured even across model
//! providers that don't reliably respect a JSON response format.

use crate::models::FaultInfo;

const OUTPUT_HEADINGS: [&str; 3] = ["### 근본 원인", "### 해결 방법", "### 재발 방지"];

pub fn output_headings() -> &'static [&'static str; 3] {
    &OUTPUT_HEADINGS
}

/// Falls back to a keyword scan over the fault's description when
/// `context.issueCategory` is absent — used both for prompt routing and
/// for the cache key.
pub fn issue_category(fault: &FaultInfo) -> String {
    if let Some(category) = fault.context_str("issueCategory") {
        return category.to_string();
    }

    let lower = fault.description.to_lowercase();
    if lower.contains("oom") || lower.contains("memory") {
        "OOM_KILLED".to_string()
    } else if lower.contains("pvc") || lower.contains("persistentvolumeclaim") {
        "PVC_BINDING".to_string()
    } else if lower.contains("image") {
        "PULL_ERROR_UNKNOWN".to_string()
    } else if lower.contains("network") {
        "NETWORK_UNKNOWN".to_string()
    } else {
        "UNKNOWN".to_string()
    }
}

fn owner_kind(fault: &FaultInfo) -> String {
    fault.context_str("ownerKind").unwrap_or("Pod").to_string()
}

pub fn build_system_prompt(fault: &FaultInfo) -> String {
    let mut prompt = String::new();

    prompt.push_str("<role>\n");
    prompt.push_str(
        "You are a senior Kubernetes site reliability engineer writing a root-cause report for an on-call operator.\n",
    );
    prompt.push_str("</role>\n\n");

    prompt.push_str("<constraints>\n");
    prompt.push_str("- Never guess at a root cause you cannot support from the evidence given.\n");
    prompt.push_str("- Never suggest dropping into a shell with a trailing `bash` or `sh` word; give the full command.\n");
    prompt.push_str("- Never propose creating or resizing a PersistentVolumeClaim when the evidence instead shows a CPU/memory resource shortage.\n");
    prompt.push_str("- Never suggest editing the Pod directly when it has an owning controller; edit the owner.\n");
    prompt.push_str("</constraints>\n\n");

    prompt.push_str("<diagnostic_rules>\n");
    prompt.push_str(&diagnostic_rules(fault));
    prompt.push_str("</diagnostic_rules>\n\n");

    prompt.push_str("<solution_requirements>\n");
    prompt.push_str("- Every fix MUST be expressed as a fixed, ready-to-apply YAML manifest or a single complete command — never a before/after diff.\n");
    prompt.push_str("- Never suggest a generic `kubectl apply`, `kubectl get`, or `kubectl delete pod` with no target filled in.\n");
    prompt.push_str("</solution_requirements>\n\n");

    prompt.push_str("<placeholders>\n");
    prompt.push_str("- Use UPPERCASE_WITH_UNDERSCORES for any value the operator must substitute (e.g. NAMESPACE, DEPLOYMENT_NAME).\n");
    prompt.push_str("- Never use angle-bracket placeholders like <namespace> — they can be mistaken for HTML.\n");
    prompt.push_str("</placeholders>\n\n");

    prompt.push_str("<output_format>\n");
    prompt.push_str(&format!(
        "Respond with exactly these three headings, in this order: {}, {}, {}.\n",
        OUTPUT_HEADINGS[0], OUTPUT_HEADINGS[1], OUTPUT_HEADINGS[2]
    ));
    prompt.push_str("Under the solutions heading, number each step `1.`, `2.`, ... Under the prevention heading, use one `-` bullet per item.\n");
    prompt.push_str("</output_format>\n");

    prompt
}

fn diagnostic_rules(fault: &FaultInfo) -> String {
    let category = issue_category(fault);
    let owner = owner_kind(fault);
    let mut rules = String::new();

    match (fault.fault_type, category.as_str()) {
        (crate::models::FaultType::Pending, "PVC_BINDING") if owner == "StatefulSet" => {
            rules.push_str("- This is a StatefulSet Pod stuck on an unbound PersistentVolumeClaim. Instruct editing `spec.volumeClaimTemplates[].spec.storageClassName` on the StatefulSet itself.\n");
            rules.push_str("- Do NOT suggest creating a separate, standalone PVC; StatefulSet PVCs are templated per-replica.\n");
        }
        (crate::models::FaultType::Pending, cat) if cat.starts_with("RESOURCE_SHORTAGE") => {
            if cat.contains("CPU") {
                rules.push_str("- The scheduler reports insufficient CPU. Recommend lowering the pod's CPU request or adding capacity; do not suggest a memory-only fix.\n");
            } else if cat.contains("MEMORY") {
                rules.push_str("- The scheduler reports insufficient memory. Recommend lowering the pod's memory request or adding capacity; do not suggest a CPU-only fix.\n");
            } else {
                rules.push_str("- The scheduler reports a generic resource shortage. Ask the operator to check both CPU and memory requests against node allocatable capacity.\n");
            }
            rules.push_str("- Do NOT suggest a PersistentVolumeClaim or StorageClass change for a resource-shortage scheduling failure.\n");
        }
        (crate::models::FaultType::Pending, "PVC_BINDING") | (crate::models::FaultType::PvcError, _) => {
            match owner.as_str() {
                "StatefulSet" => {
                    rules.push_str("- Edit `spec.volumeClaimTemplates[].spec.storageClassName` on the StatefulSet; never create a standalone PVC for a templated volume.\n");
                }
                _ => {
                    rules.push_str("- Check the PersistentVolumeClaim's `storageClassName` and the cluster's available StorageClasses before proposing a fix.\n");
                }
            }
        }
        (crate::models::FaultType::CrashLoopBackOff, _) => {
            rules.push_str("- Exit code cheatsheet: 1 = application error, 126 = command found but not executable, 127 = command not found, 137 = SIGKILL (often OOM), 143 = SIGTERM (graceful shutdown requested).\n");
            rules.push_str("- If `hasLivenessProbe` is true and the kill came from the probe, say so explicitly and reference the probe's timing fields.\n");
        }
        (crate::models::FaultType::ImagePullBackOff, _) => {
            rules.push_str("- Recommend checking `imagePullSecrets` and registry credentials; show a `kubectl create secret docker-registry` example with placeholder values.\n");
        }
        (crate::models::FaultType::OomKilled, _) => {
            rules.push_str("- Recommend raising `resources.limits.memory`; if the workload is a JVM process, its heap should be configured to at most 75% of the container memory limit.\n");
        }
        (crate::models::FaultType::LivenessProbeFailed, _) => {
            rules.push_str("- A failing liveness probe causes restarts; distinguish this from a failing readiness probe, which only removes the pod from service without restarting it, and from a failing startup probe, which blocks both.\n");
        }
        (crate::models::FaultType::ReadinessProbeFailed, _) => {
            rules.push_str("- A failing readiness probe removes the pod from Service endpoints without restarting the container; do not suggest a restart as the fix.\n");
        }
        (crate::models::FaultType::StartupProbeFailed, _) => {
            rules.push_str("- A failing startup probe blocks liveness/readiness checks entirely; check `initialDelaySeconds`/`failureThreshold` against the application's real startup time.\n");
        }
        (crate::models::FaultType::NodeNotReady, _) | (crate::models::FaultType::NodePressure, _) => {
            rules.push_str("- This is operator/infrastructure-level guidance: the on-call engineer controls the node, not the workload. Recommend node-level remediation (cordon/drain, capacity, kubelet health), not pod-level edits.\n");
        }
        (crate::models::FaultType::ResourceQuotaExceeded, _) | (crate::models::FaultType::InsufficientResources, _) => {
            rules.push_str("- This is operator-centric: recommend reviewing the namespace ResourceQuota or cluster capacity, not editing the workload's own limits alone.\n");
        }
        _ => {
            rules.push_str("- Ground every claim in the evidence provided; do not introduce fault types or categories not present in the input.\n");
        }
    }

    rules
}

pub struct UserPromptInput<'a> {
    pub fault: &'a FaultInfo,
    pub related_faults: &'a [FaultInfo],
    pub filtered_logs: &'a [String],
    pub deduped_events: &'a [String],
}

pub fn build_user_prompt(input: UserPromptInput<'_>) -> String {
    let fault = input.fault;
    let mut prompt = String::new();

    let owner = owner_kind(fault);
    let edit_target = if owner == "Pod" {
        "the Pod directly".to_string()
    } else {
        format!("its owning {} (not the Pod directly)", owner)
    };

    prompt.push_str(&format!(
        "A {} fault was detected on {} `{}`{}. {}\n",
        fault.fault_type.code(),
        fault.resource_kind,
        fault.resource_name,
        fault
            .namespace
            .as_deref()
            .map(|ns| format!(" in namespace `{}`", ns))
            .unwrap_or_default(),
        fault.summary,
    ));
    prompt.push_str(&format!("Any remediation should edit {}.\n\n", edit_target));

    if let Some(scheduling_message) = fault.context_str("schedulingMessage") {
        prompt.push_str(&format!("Scheduling condition message: {}\n\n", scheduling_message));
    }

    prompt.push_str(&format!("Issue category: {}\n\n", issue_category(fault)));

    if !fault.symptoms.is_empty() {
        prompt.push_str("Symptoms:\n");
        for symptom in &fault.symptoms {
            prompt.push_str(&format!("- {}\n", symptom));
        }
        prompt.push('\n');
    }

    let context_entries: Vec<(&String, &serde_json::Value)> = fault
        .context
        .iter()
        .filter(|(k, _)| k.as_str() != "clusterId")
        .take(3)
        .collect();
    if !context_entries.is_empty() {
        prompt.push_str("Context:\n");
        for (key, value) in context_entries {
            prompt.push_str(&format!("- {}: {}\n", key, value));
        }
        prompt.push('\n');
    }

    if !input.related_faults.is_empty() {
        prompt.push_str("Related faults on the same resource:\n");
        for related in input.related_faults.iter().take(2) {
            prompt.push_str(&format!("- {}: {}\n", related.fault_type.code(), related.summary));
        }
        prompt.push('\n');
    }

    if !input.filtered_logs.is_empty() {
        prompt.push_str("Relevant log lines:\n");
        for line in input.filtered_logs {
            prompt.push_str(&format!("{}\n", line));
        }
        prompt.push('\n');
    }

    if !input.deduped_events.is_empty() {
        prompt.push_str("Recent events:\n");
        for event in input.deduped_events {
            prompt.push_str(&format!("{}\n", event));
        }
        prompt.push('\n');
    }

    prompt.push_str("Answer using exactly these headings:\n");
    prompt.push_str(&format!("{}\n<prose root cause>\n\n", OUTPUT_HEADINGS[0]));
    prompt.push_str(&format!("{}\n1. <first step>\n2. <second step>\n\n", OUTPUT_HEADINGS[1]));
    prompt.push_str(&format!("{}\n- <first prevention>\n", OUTPUT_HEADINGS[2]));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FaultType, ResourceKind, Severity};
    use chrono::Utc;

    fn statefulset_pvc_fault() -> FaultInfo {
        FaultInfo {
            fault_type: FaultType::Pending,
            severity: Severity::High,
            resource_kind: ResourceKind::Pod,
            namespace: Some("default".to_string()),
            resource_name: "web-0".to_string(),
            summary: "Pod has not been scheduled onto a node".to_string(),
            description: "unbound immediate PersistentVolumeClaim".to_string(),
            symptoms: Vec::new(),
            context: [
                ("ownerKind".to_string(), serde_json::json!("StatefulSet")),
                ("ownerName".to_string(), serde_json::json!("web")),
                ("issueCategory".to_string(), serde_json::json!("PVC_BINDING")),
                (
                    "schedulingMessage".to_string(),
                    serde_json::json!("unbound immediate PersistentVolumeClaim: web-data-web-0"),
                ),
            ]
            .into_iter()
            .collect(),
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn statefulset_pvc_rule_forbids_separate_pvc() {
        let fault = statefulset_pvc_fault();
        let system = build_system_prompt(&fault);
        assert!(system.contains("volumeClaimTemplates"));
        assert!(system.contains("Do NOT suggest creating a separate"));
    }

    #[test]
    fn user_prompt_includes_scheduling_message_verbatim() {
        let fault = statefulset_pvc_fault();
        let user = build_user_prompt(UserPromptInput {
            fault: &fault,
            related_faults: &[],
            filtered_logs: &[],
            deduped_events: &[],
        });
        assert!(user.contains("unbound immediate PersistentVolumeClaim: web-data-web-0"));
        assert!(user.contains("its owning StatefulSet"));
    }

    #[test]
    fn issue_category_falls_back_to_keyword_inference() {
        let mut fault = statefulset_pvc_fault();
        fault.context.remove("issueCategory");
        fault.description = "Container was OOM killed".to_string();
        assert_eq!(issue_category(&fault), "OOM_KILLED");
    }
}
