use chrono::Utc;
use uuid::Uuid;

use crate::detectors::{contains_any, Detector};
use crate::models::{FaultInfo, FaultType, ResourceKind, WorkloadResource};

const SCHEDULE_STALE_THRESHOLD: chrono::Duration = chrono::Duration::hours(24);
const SCHEDULE_NEVER_RUN_THRESHOLD: chrono::Duration = chrono::Duration::hours(1);

fn name_of(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

pub struct JobFailedDetector;

impl Detector for JobFailedDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::JobFailed
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Job
    }

    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let WorkloadResource::Job(job) = resource else { return Vec::new() };
        let Some(status) = &job.status else { return Vec::new() };

        let complete = status
            .conditions
            .as_ref()
            .map(|conds| conds.iter().any(|c| c.type_ == "Complete" && c.status == "True"))
            .unwrap_or(false);
        if complete {
            return Vec::new();
        }

        let failed_condition = status
            .conditions
            .as_ref()
            .and_then(|conds| conds.iter().find(|c| c.type_ == "Failed" && c.status == "True"));
        let failed_count = status.failed.unwrap_or(0);

        if failed_condition.is_none() && failed_count <= 0 {
            return Vec::new();
        }

        let message = failed_condition
            .and_then(|c| c.message.clone())
            .unwrap_or_default();
        let reason = failed_condition.and_then(|c| c.reason.clone()).unwrap_or_default();
        let combined = format!("{} {}", reason, message).to_lowercase();

        let issue_category = if combined.contains("backofflimitexceeded") || combined.contains("backoff limit") {
            "BACKOFF_LIMIT_EXCEEDED"
        } else if combined.contains("deadlineexceeded") || combined.contains("deadline") {
            "DEADLINE_EXCEEDED"
        } else if contains_any(&combined, &["oom", "outofmemory"]) {
            "OOM"
        } else if contains_any(&combined, &["imagepull", "errimagepull", "image"]) {
            "IMAGE_ERROR"
        } else {
            "EXECUTION_FAILED"
        };

        vec![FaultInfo::new(
            FaultType::JobFailed,
            ResourceKind::Job,
            namespace.map(|s| s.to_string()),
            name_of(&job.metadata),
            "Job did not complete successfully",
            if message.is_empty() { format!("{} failed pod(s) recorded", failed_count) } else { message.clone() },
        )
        .with_context("failedCount", failed_count as i64)
        .with_context("backoffLimit", job.spec.as_ref().and_then(|s| s.backoff_limit).unwrap_or(6) as i64)
        .with_context("issueCategory", issue_category)]
    }
}

pub struct CronJobFailedDetector;

impl Detector for CronJobFailedDetector {
    fn fault_type(&self) -> FaultType {
        FaultType::CronJobFailed
    }

    fn can_detect(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::CronJob
    }

    /// Emits up to three independent faults per resource — suspension,
    /// concurrency overrun, and schedule staleness are orthogonal
    /// conditions.
    fn detect(&self, _cluster_id: Uuid, namespace: Option<&str>, resource: &WorkloadResource) -> Vec<FaultInfo> {
        let WorkloadResource::CronJob(cronjob) = resource else { return Vec::new() };
        let mut faults = Vec::new();
        let name = name_of(&cronjob.metadata);
        let spec = cronjob.spec.as_ref();

        if spec.and_then(|s| s.suspend).unwrap_or(false) {
            faults.push(
                FaultInfo::new(
                    FaultType::CronJobFailed,
                    ResourceKind::CronJob,
                    namespace.map(|s| s.to_string()),
                    name.clone(),
                    "CronJob is suspended",
                    "spec.suspend is true; scheduled runs will not fire",
                )
                .with_context("issueCategory", "SUSPENDED"),
            );
        }

        let concurrency_policy = spec.and_then(|s| s.concurrency_policy.clone()).unwrap_or_default();
        let active_count = cronjob.status.as_ref().and_then(|s| s.active.as_ref()).map(|a| a.len()).unwrap_or(0);
        if concurrency_policy == "Forbid" && active_count > 1 {
            faults.push(
                FaultInfo::new(
                    FaultType::CronJobFailed,
                    ResourceKind::CronJob,
                    namespace.map(|s| s.to_string()),
                    name.clone(),
                    "CronJob has more active runs than its concurrency policy allows",
                    format!("{} runs are active under a Forbid concurrency policy", active_count),
                )
                .with_severity(crate::models::Severity::High)
                .with_context("concurrencyPolicy", concurrency_policy)
                .with_context("activeCount", active_count as i64)
                .with_context("issueCategory", "TOO_MANY_ACTIVE"),
            );
        }

        let last_schedule = cronjob.status.as_ref().and_then(|s| s.last_schedule_time.as_ref());
        let is_stale = match last_schedule {
            Some(t) => Utc::now() - t.0 > SCHEDULE_STALE_THRESHOLD,
            None => {
                let created = cronjob.metadata.creation_timestamp.as_ref();
                created.map(|t| Utc::now() - t.0 > SCHEDULE_NEVER_RUN_THRESHOLD).unwrap_or(false)
            }
        };
        if is_stale {
            let last_schedule_time = last_schedule.map(|t| t.0.to_rfc3339()).unwrap_or_default();
            faults.push(
                FaultInfo::new(
                    FaultType::CronJobFailed,
                    ResourceKind::CronJob,
                    namespace.map(|s| s.to_string()),
                    name,
                    "CronJob has not run recently",
                    if last_schedule_time.is_empty() {
                        "No run has ever been recorded for this schedule".to_string()
                    } else {
                        format!("Last scheduled run was at {}", last_schedule_time)
                    },
                )
                .with_context("lastScheduleTime", last_schedule_time)
                .with_context("schedule", spec.map(|s| s.schedule.clone()).unwrap_or_default())
                .with_context("issueCategory", "SCHEDULE_STALE"),
            );
        }

        faults
    }
}
