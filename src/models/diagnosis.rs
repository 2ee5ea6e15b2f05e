use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::FaultInfo;

/// One entry in the ordered solution list; `body` may embed a post-formatted
/// `kubectl-block`/`yaml-block` wrapped snippet produced by the reply parser.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Solution {
    pub step: u32,
    pub body: String,
}

/// The result of diagnosing one fault, cached by C6 for the configured TTL.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub fault: FaultInfo,
    pub related_faults: Vec<FaultInfo>,
    pub root_cause: String,
    /// The raw model reply, kept for auditing.
    pub diagnosis: String,
    pub solutions: Vec<Solution>,
    pub preventions: Vec<String>,
    pub is_fallback: bool,
    pub created_at: DateTime<Utc>,
}

impl DiagnosisResult {
    pub fn fallback(
        fault: FaultInfo,
        related_faults: Vec<FaultInfo>,
        root_cause: impl Into<String>,
        solutions: Vec<Solution>,
        preventions: Vec<String>,
    ) -> Self {
        Self {
            fault,
            related_faults,
            root_cause: root_cause.into(),
            diagnosis: String::new(),
            solutions,
            preventions,
            is_fallback: true,
            created_at: Utc::now(),
        }
    }
}
