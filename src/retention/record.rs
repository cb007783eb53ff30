//! Execution records and retention decisions

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::retention::signature::{FailureSignature, Normalizer};

/// Result of one journey run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    #[serde(alias = "PASSED", alias = "passed", alias = "pass")]
    Pass,
    #[serde(alias = "FAILED", alias = "failed", alias = "fail")]
    Fail,
    #[serde(alias = "ERRORED", alias = "error")]
    Error,
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pass => "PASS",
            Outcome::Fail => "FAIL",
            Outcome::Error => "ERROR",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of a journey. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub journey_id: String,
    pub execution_id: u64,
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_signature: Option<FailureSignature>,
    pub raw_payload_ref: String,
}

impl ExecutionRecord {
    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            execution_id: self.execution_id,
            outcome: self.outcome,
            started_at: self.started_at,
        }
    }

    /// Sort key: start time, then execution id for equal timestamps
    pub fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.started_at, self.execution_id)
    }
}

/// Failure detail as reported upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetail {
    pub step_id: String,
    pub message: String,
}

/// Execution as exported from the platform, before fingerprinting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExecution {
    pub journey_id: String,
    pub execution_id: u64,
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub failure: Option<FailureDetail>,
    #[serde(default)]
    pub raw_payload_ref: Option<String>,
}

impl RawExecution {
    /// Build the immutable record, deriving a failure signature for
    /// non-passing runs that report one.
    pub fn into_record(self, normalizer: &dyn Normalizer) -> ExecutionRecord {
        let failure_signature = match (&self.failure, self.outcome.is_pass()) {
            (Some(detail), false) => Some(FailureSignature::derive(
                &detail.step_id,
                &detail.message,
                normalizer,
            )),
            _ => None,
        };

        ExecutionRecord {
            raw_payload_ref: self
                .raw_payload_ref
                .unwrap_or_else(|| format!("executions/{}", self.execution_id)),
            journey_id: self.journey_id,
            execution_id: self.execution_id,
            outcome: self.outcome,
            started_at: self.started_at,
            duration_ms: self.duration_ms,
            failure_signature,
        }
    }
}

/// Compact view of an execution kept in per-journey windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub execution_id: u64,
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
}

impl ExecutionSummary {
    pub fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.started_at, self.execution_id)
    }
}

/// What the caller should do with an evaluated record.
///
/// Never stored; the caller performs the write or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetentionDecision {
    /// Persist as the journey's current success
    KeepAsLatestSuccess,
    /// Persist as a distinct record (new failure cluster, or unconditional keep)
    KeepAsNewFailureCluster,
    /// Persist, then delete the previously persisted execution with this id
    Supersede(u64),
    /// Do not persist
    Discard,
}

impl RetentionDecision {
    /// Plain keep for strategies that do not cluster
    pub fn keep_for(outcome: Outcome) -> Self {
        if outcome.is_pass() {
            RetentionDecision::KeepAsLatestSuccess
        } else {
            RetentionDecision::KeepAsNewFailureCluster
        }
    }

    pub fn persists(&self) -> bool {
        !matches!(self, RetentionDecision::Discard)
    }

    pub fn superseded(&self) -> Option<u64> {
        match self {
            RetentionDecision::Supersede(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for RetentionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionDecision::KeepAsLatestSuccess => f.write_str("KEEP_AS_LATEST_SUCCESS"),
            RetentionDecision::KeepAsNewFailureCluster => {
                f.write_str("KEEP_AS_NEW_FAILURE_CLUSTER")
            }
            RetentionDecision::Supersede(id) => write!(f, "SUPERSEDE({})", id),
            RetentionDecision::Discard => f.write_str("DISCARD"),
        }
    }
}
