//! C6 — AI Diagnosis Orchestrator. Severity-gated, cache-backed pipeline
//! that collects evidence, builds a prompt, calls the LLM, parses the
//! reply, and degrades to a deterministic fallback on any failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::accessor::ResourceAccessor;
use crate::config::AiDiagnosisConfig;
use crate::evidence::{dedup_events, filter_log_lines};
use crate::llm::{temperature_for, ChatCompletionRequest, LlmClient};
use crate::models::{DiagnosisResult, FaultInfo, Solution};
use crate::prompt::{build_system_prompt, build_user_prompt, issue_category, UserPromptInput};
use crate::reply_parser::parse_llm_reply;

const MAX_AI_EVIDENCE_LOG_LINES: i64 = 50;
const DIAGNOSIS_MAX_TOKENS: u32 = 700;

pub struct DiagnosisOrchestrator {
    accessor: Arc<ResourceAccessor>,
    llm: Option<Arc<dyn LlmClient>>,
    config: AiDiagnosisConfig,
    cache: DashMap<String, (DiagnosisResult, DateTime<Utc>)>,
}

impl DiagnosisOrchestrator {
    pub fn new(accessor: Arc<ResourceAccessor>, llm: Option<Arc<dyn LlmClient>>, config: AiDiagnosisConfig) -> Self {
        Self {
            accessor,
            llm,
            config,
            cache: DashMap::new(),
        }
    }

    /// Never fails: every path returns a well-formed `DiagnosisResult`,
    /// degrading to the fallback template on any gating/cache/LLM/parse
    /// outcome that isn't a clean success. No variant of this failure is
    /// ever surfaced to the caller as an error.
    pub async fn diagnose(&self, cluster_id: Uuid, fault: &FaultInfo, all_faults: &[FaultInfo]) -> DiagnosisResult {
        let related_faults = related_faults(fault, all_faults);

        if !self.is_gated_in(fault) {
            return fallback_result(fault.clone(), related_faults, "AI diagnosis is disabled or below the configured severity gate.");
        }

        let cache_key = cache_key(fault);
        if self.config.cache_enabled {
            if let Some(hit) = self.cache_lookup(&cache_key) {
                info!(cache_key = %cache_key, "diagnosis cache hit");
                return hit;
            }
        }

        let Some(llm) = &self.llm else {
            return fallback_result(fault.clone(), related_faults, "No LLM client is configured.");
        };

        let (logs, events) = self.collect_evidence(cluster_id, fault).await;
        let filtered_logs = filter_log_lines(&logs);
        let deduped_events = dedup_events(&events);

        let system = build_system_prompt(fault);
        let user = build_user_prompt(UserPromptInput {
            fault,
            related_faults: &related_faults,
            filtered_logs: &filtered_logs,
            deduped_events: &deduped_events,
        });

        let request = ChatCompletionRequest {
            system,
            user,
            max_tokens: DIAGNOSIS_MAX_TOKENS,
            temperature: temperature_for(fault.fault_type),
        };

        let result = match llm.chat_completion(request).await {
            Ok(reply) => match parse_llm_reply(&reply) {
                Some(parsed) => DiagnosisResult {
                    fault: fault.clone(),
                    related_faults: related_faults.clone(),
                    root_cause: parsed.root_cause,
                    diagnosis: reply,
                    solutions: parsed.solutions,
                    preventions: parsed.preventions,
                    is_fallback: false,
                    created_at: Utc::now(),
                },
                None => {
                    warn!("LLM reply did not match the expected heading structure, using fallback solutions");
                    let mut fallback = fallback_result(
                        fault.clone(),
                        related_faults.clone(),
                        "The model's reply could not be parsed into structured guidance.",
                    );
                    fallback.diagnosis = reply;
                    fallback
                }
            },
            Err(e) => {
                warn!(error = %e, "LLM call failed, degrading to fallback diagnosis");
                fallback_result(fault.clone(), related_faults.clone(), "The AI analysis call failed.")
            }
        };

        if self.config.cache_enabled {
            self.cache.insert(cache_key, (result.clone(), Utc::now()));
        }

        result
    }

    /// Proceed to the full pipeline only when AI diagnosis is
    /// enabled and the fault is at least as severe as the configured
    /// minimum (CRITICAL/HIGH/MEDIUM by default).
    fn is_gated_in(&self, fault: &FaultInfo) -> bool {
        self.config.enabled && fault.severity <= self.config.min_severity
    }

    fn cache_lookup(&self, key: &str) -> Option<DiagnosisResult> {
        let ttl = chrono::Duration::minutes(self.config.cache_ttl_minutes as i64);
        match self.cache.get(key) {
            Some(entry) if Utc::now() - entry.1 < ttl => Some(entry.0.clone()),
            _ => None,
        }
    }

    /// Pod-only evidence collection: up to 50 log lines from the primary
    /// container plus all events for the pod. Failures degrade to empty
    /// evidence, never fail the pipeline.
    async fn collect_evidence(&self, cluster_id: Uuid, fault: &FaultInfo) -> (String, Vec<k8s_openapi::api::core::v1::Event>) {
        if fault.resource_kind != crate::models::ResourceKind::Pod {
            return (String::new(), Vec::new());
        }
        let Some(namespace) = fault.namespace.as_deref() else {
            return (String::new(), Vec::new());
        };

        let container = fault.context_str("containerName");
        let logs = self
            .accessor
            .get_logs(cluster_id, namespace, &fault.resource_name, container, MAX_AI_EVIDENCE_LOG_LINES)
            .await;
        let events = self
            .accessor
            .get_events(cluster_id, namespace, fault.resource_kind.as_str(), &fault.resource_name)
            .await;

        (logs, events)
    }
}

/// Cache key: `"<faultType>:<resourceKind>:<ownerKind>:<issueCategory>"`.
fn cache_key(fault: &FaultInfo) -> String {
    let owner_kind = fault.context_str("ownerKind").unwrap_or("None");
    format!(
        "{}:{}:{}:{}",
        fault.fault_type.code(),
        fault.resource_kind,
        owner_kind,
        issue_category(fault)
    )
}

/// Other faults sharing `(resourceKind, resourceName, namespace)`,
/// excluding the primary fault itself.
fn related_faults(fault: &FaultInfo, all_faults: &[FaultInfo]) -> Vec<FaultInfo> {
    let is_primary = |f: &FaultInfo| {
        f.fault_type == fault.fault_type
            && f.resource_kind == fault.resource_kind
            && f.resource_name == fault.resource_name
            && f.namespace == fault.namespace
    };
    all_faults
        .iter()
        .filter(|f| {
            f.resource_kind == fault.resource_kind
                && f.resource_name == fault.resource_name
                && f.namespace == fault.namespace
                && !is_primary(f)
        })
        .cloned()
        .collect()
}

fn fallback_result(fault: FaultInfo, related_faults: Vec<FaultInfo>, root_cause: &str) -> DiagnosisResult {
    let solutions = fallback_solutions(fault.fault_type);
    let preventions = fallback_preventions(fault.fault_type);
    DiagnosisResult::fallback(fault, related_faults, root_cause, solutions, preventions)
}

fn fallback_solutions(fault_type: crate::models::FaultType) -> Vec<Solution> {
    use crate::models::FaultType::*;
    let steps: Vec<&str> = match fault_type {
        ImagePullBackOff => vec![
            "Verify the image name and tag exist in the registry.",
            "Confirm `imagePullSecrets` references a valid, non-expired registry credential.",
            "Check the node's network path to the registry for DNS or egress failures.",
        ],
        CrashLoopBackOff => vec![
            "Check the container's exit code and last termination reason in `kubectl describe pod`.",
            "Review the last 50 lines of container logs for a stack trace or startup error.",
            "If the exit code is 137, check whether the container is being OOM killed or hitting its liveness probe.",
        ],
        OomKilled => vec![
            "Raise `resources.limits.memory` for the container.",
            "Profile the workload's real memory usage under load and compare it to the configured limit.",
            "If the process is a JVM, set its heap to at most 75% of the container memory limit.",
        ],
        Pending => vec![
            "Check `kubectl describe pod` for the PodScheduled condition's message.",
            "Compare the pod's resource requests against node allocatable capacity.",
            "If the message mentions a PersistentVolumeClaim, check its binding status and StorageClass.",
        ],
        _ => vec![
            "Review `kubectl describe` output for the resource and its recent events.",
            "Check container/controller logs for the window around the fault's detection time.",
            "Compare the resource's current spec against its last known-good configuration.",
        ],
    };
    steps
        .into_iter()
        .enumerate()
        .map(|(i, body)| Solution {
            step: (i + 1) as u32,
            body: body.to_string(),
        })
        .collect()
}

fn fallback_preventions(fault_type: crate::models::FaultType) -> Vec<String> {
    use crate::models::FaultType::*;
    let items: Vec<&str> = match fault_type {
        ImagePullBackOff => vec![
            "Rotate registry credentials before they expire and alert on pull failures.",
            "Pin image tags to immutable digests in CI.",
        ],
        CrashLoopBackOff => vec![
            "Add a startup probe sized to the application's real boot time.",
            "Alert on restart-count growth rather than waiting for CrashLoopBackOff.",
        ],
        OomKilled => vec![
            "Set memory requests/limits from observed usage, not guesswork.",
            "Alert when memory usage approaches the configured limit.",
        ],
        Pending => vec![
            "Track cluster capacity headroom and alert before it is exhausted.",
            "Validate StorageClass availability as part of manifest review.",
        ],
        _ => vec![
            "Add alerting on this fault's detection so it is caught before it compounds.",
            "Capture this incident in a runbook for the next on-call engineer.",
        ],
    };
    items.into_iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiDiagnosisConfig;
    use crate::llm::MockLlmClient;
    use crate::models::{ClusterConfig, FaultType, ResourceKind, Severity};
    use crate::registry::ClusterRegistry;
    use crate::store::InMemoryClusterStore;
    use chrono::Utc;

    fn fault(fault_type: FaultType, severity: Severity) -> FaultInfo {
        FaultInfo {
            fault_type,
            severity,
            resource_kind: ResourceKind::Pod,
            namespace: Some("default".to_string()),
            resource_name: "api-0".to_string(),
            summary: "s".to_string(),
            description: "d".to_string(),
            symptoms: Vec::new(),
            context: [("ownerKind".to_string(), serde_json::json!("Deployment"))]
                .into_iter()
                .collect(),
            detected_at: Utc::now(),
        }
    }

    fn accessor() -> Arc<ResourceAccessor> {
        let store = Arc::new(InMemoryClusterStore::new());
        let registry = Arc::new(ClusterRegistry::new(store));
        Arc::new(ResourceAccessor::new(registry))
    }

    #[tokio::test]
    async fn low_severity_fault_skips_the_llm_entirely() {
        let orchestrator = DiagnosisOrchestrator::new(accessor(), None, AiDiagnosisConfig::default());
        let f = fault(FaultType::ReadinessProbeFailed, Severity::Low);
        let result = orchestrator.diagnose(Uuid::new_v4(), &f, &[]).await;
        assert!(result.is_fallback);
    }

    #[tokio::test]
    async fn disabled_ai_always_falls_back() {
        let mut config = AiDiagnosisConfig::default();
        config.enabled = false;
        let orchestrator = DiagnosisOrchestrator::new(accessor(), None, config);
        let f = fault(FaultType::OomKilled, Severity::Critical);
        let result = orchestrator.diagnose(Uuid::new_v4(), &f, &[]).await;
        assert!(result.is_fallback);
        assert!(!result.solutions.is_empty());
    }

    #[tokio::test]
    async fn missing_llm_client_degrades_to_fallback_not_panic() {
        let orchestrator = DiagnosisOrchestrator::new(accessor(), None, AiDiagnosisConfig::default());
        let f = fault(FaultType::CrashLoopBackOff, Severity::Critical);
        let result = orchestrator.diagnose(Uuid::new_v4(), &f, &[]).await;
        assert!(result.is_fallback);
        assert_eq!(result.solutions.len(), 3);
    }

    #[tokio::test]
    async fn second_call_with_same_cache_key_is_a_cache_hit_and_skips_the_llm() {
        let mut mock = MockLlmClient::new();
        mock.expect_chat_completion().times(1).returning(|_| {
            Box::pin(async {
                Ok("### 근본 원인\nroot\n\n### 해결 방법\n1. step one\n\n### 재발 방지\n- prevent\n".to_string())
            })
        });

        let orchestrator = DiagnosisOrchestrator::new(accessor(), Some(Arc::new(mock)), AiDiagnosisConfig::default());
        let f1 = fault(FaultType::ImagePullBackOff, Severity::Critical);
        let mut f2 = fault(FaultType::ImagePullBackOff, Severity::Critical);
        f2.resource_name = "api-1".to_string();
        f2.context.insert("issueCategory".to_string(), serde_json::json!("AUTHENTICATION_FAILED"));
        let mut f1 = f1;
        f1.context.insert("issueCategory".to_string(), serde_json::json!("AUTHENTICATION_FAILED"));

        let cluster_id = Uuid::new_v4();
        let first = orchestrator.diagnose(cluster_id, &f1, &[]).await;
        let second = orchestrator.diagnose(cluster_id, &f2, &[]).await;

        assert!(!first.is_fallback);
        assert_eq!(first.root_cause, second.root_cause);
        assert_eq!(first.solutions.len(), second.solutions.len());
    }

    #[test]
    fn related_faults_excludes_the_primary_and_other_resources() {
        let primary = fault(FaultType::CrashLoopBackOff, Severity::Critical);
        let mut same_resource = fault(FaultType::OomKilled, Severity::Critical);
        same_resource.resource_name = primary.resource_name.clone();
        let mut other_resource = fault(FaultType::Pending, Severity::High);
        other_resource.resource_name = "other-0".to_string();

        let related = related_faults(&primary, &[primary.clone(), same_resource.clone(), other_resource]);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].fault_type, FaultType::OomKilled);
    }
}
