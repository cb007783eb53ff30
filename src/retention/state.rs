//! Per-journey retention bookkeeping

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use serde::Serialize;

use crate::retention::record::{ExecutionRecord, ExecutionSummary, Outcome, RetentionDecision};
use crate::retention::signature::FailureSignature;
use crate::retention::strategy::RetentionStrategy;

/// One distinct failure kind seen for a journey
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureCluster {
    /// First execution seen with this signature; stays the exemplar
    pub representative_id: u64,
    pub count: u64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// Newest execution counted so far
    pub last_seen_id: u64,
}

impl FailureCluster {
    fn last_seen_key(&self) -> (DateTime<Utc>, u64) {
        (self.last_seen_at, self.last_seen_id)
    }
}

/// Limits and parameters the state machine needs for one decision
#[derive(Debug, Clone, Copy)]
pub(crate) struct DecisionContext {
    pub strategy: RetentionStrategy,
    pub max_failure_clusters: usize,
    pub history_window: usize,
    pub utc_offset: FixedOffset,
}

/// Everything the engine remembers about one journey. In-memory only;
/// rebuilt from storage after a restart.
#[derive(Debug, Clone)]
pub struct JourneyRetentionState {
    journey_id: String,
    latest_success: Option<ExecutionSummary>,
    failure_clusters: HashMap<FailureSignature, FailureCluster>,
    recent_window: VecDeque<ExecutionSummary>,
    last_evaluated_at: Option<DateTime<Utc>>,
    last_persisted_outcome: Option<Outcome>,
    last_persisted_bucket: Option<i64>,
    evicted_clusters: u64,
}

impl JourneyRetentionState {
    pub fn new(journey_id: impl Into<String>) -> Self {
        Self {
            journey_id: journey_id.into(),
            latest_success: None,
            failure_clusters: HashMap::new(),
            recent_window: VecDeque::new(),
            last_evaluated_at: None,
            last_persisted_outcome: None,
            last_persisted_bucket: None,
            evicted_clusters: 0,
        }
    }

    #[cfg(test)]
    pub fn failure_cluster(&self, signature: &FailureSignature) -> Option<&FailureCluster> {
        self.failure_clusters.get(signature)
    }

    #[cfg(test)]
    pub fn recent_window(&self) -> impl Iterator<Item = &ExecutionSummary> {
        self.recent_window.iter()
    }

    pub fn last_evaluated_at(&self) -> Option<DateTime<Utc>> {
        self.last_evaluated_at
    }

    /// Decide what to do with `record` and update bookkeeping accordingly.
    /// Ordering checks are the engine's job.
    pub(crate) fn decide(
        &mut self,
        record: &ExecutionRecord,
        ctx: &DecisionContext,
    ) -> RetentionDecision {
        let decision = match ctx.strategy {
            RetentionStrategy::Smart => {
                if record.outcome.is_pass() {
                    self.track_success(record)
                } else {
                    self.track_failure(record, ctx.max_failure_clusters)
                }
            }
            RetentionStrategy::Failures => {
                if record.outcome.is_pass() {
                    RetentionDecision::Discard
                } else {
                    self.track_failure(record, ctx.max_failure_clusters)
                }
            }
            RetentionStrategy::All => {
                if record.outcome.is_pass() {
                    self.track_success(record);
                } else {
                    self.track_failure(record, ctx.max_failure_clusters);
                }
                RetentionDecision::keep_for(record.outcome)
            }
            RetentionStrategy::LatestN(n) => self.slide_window(record, n),
            RetentionStrategy::Daily { window_days } => {
                let bucket = day_bucket(record.started_at, ctx.utc_offset, window_days);
                if self.last_persisted_bucket == Some(bucket) {
                    RetentionDecision::Discard
                } else {
                    self.last_persisted_bucket = Some(bucket);
                    RetentionDecision::keep_for(record.outcome)
                }
            }
            RetentionStrategy::Changes => {
                let previous = self.last_persisted_outcome.map(|o| o.is_pass());
                if previous == Some(record.outcome.is_pass()) {
                    RetentionDecision::Discard
                } else {
                    RetentionDecision::keep_for(record.outcome)
                }
            }
        };

        self.last_evaluated_at = Some(match self.last_evaluated_at {
            Some(last) if last > record.started_at => last,
            _ => record.started_at,
        });

        if decision.persists() {
            self.last_persisted_outcome = Some(record.outcome);
            if !matches!(ctx.strategy, RetentionStrategy::LatestN(_)) {
                if let Some(old) = decision.superseded() {
                    self.recent_window.retain(|s| s.execution_id != old);
                }
                insert_ordered(&mut self.recent_window, record.summary());
                while self.recent_window.len() > ctx.history_window {
                    self.recent_window.pop_front();
                }
            }
        }

        decision
    }

    /// Keep the newest success. An older or repeated success never displaces it.
    fn track_success(&mut self, record: &ExecutionRecord) -> RetentionDecision {
        match self.latest_success {
            Some(current) if record.order_key() <= current.order_key() => {
                RetentionDecision::Discard
            }
            Some(current) => {
                self.latest_success = Some(record.summary());
                RetentionDecision::Supersede(current.execution_id)
            }
            None => {
                self.latest_success = Some(record.summary());
                RetentionDecision::KeepAsLatestSuccess
            }
        }
    }

    fn track_failure(&mut self, record: &ExecutionRecord, max_clusters: usize) -> RetentionDecision {
        let signature = record
            .failure_signature
            .clone()
            .unwrap_or_else(FailureSignature::unclassified);

        if let Some(cluster) = self.failure_clusters.get_mut(&signature) {
            // Only occurrences newer than the last one counted move the tally,
            // so replaying a batch after a rebuild leaves it unchanged.
            if record.order_key() > cluster.last_seen_key() {
                cluster.count += 1;
                cluster.last_seen_at = record.started_at;
                cluster.last_seen_id = record.execution_id;
            }
            return RetentionDecision::Discard;
        }

        if max_clusters > 0 && self.failure_clusters.len() >= max_clusters {
            self.evict_stalest_cluster();
        }

        self.failure_clusters.insert(
            signature,
            FailureCluster {
                representative_id: record.execution_id,
                count: 1,
                first_seen_at: record.started_at,
                last_seen_at: record.started_at,
                last_seen_id: record.execution_id,
            },
        );
        RetentionDecision::KeepAsNewFailureCluster
    }

    fn evict_stalest_cluster(&mut self) {
        let stalest = self
            .failure_clusters
            .iter()
            .min_by_key(|(signature, cluster)| (cluster.last_seen_at, (*signature).clone()))
            .map(|(signature, _)| signature.clone());

        if let Some(signature) = stalest {
            if let Some(cluster) = self.failure_clusters.remove(&signature) {
                self.evicted_clusters += 1;
                log::warn!(
                    "Journey '{}': failure cluster cap reached, forgetting cluster {} (exemplar {}, seen {} times)",
                    self.journey_id,
                    signature,
                    cluster.representative_id,
                    cluster.count
                );
            }
        }
    }

    fn slide_window(&mut self, record: &ExecutionRecord, n: usize) -> RetentionDecision {
        if self
            .recent_window
            .iter()
            .any(|s| s.execution_id == record.execution_id)
        {
            return RetentionDecision::Discard;
        }
        insert_ordered(&mut self.recent_window, record.summary());
        if self.recent_window.len() <= n {
            return RetentionDecision::keep_for(record.outcome);
        }

        match self.recent_window.pop_front() {
            Some(oldest) if oldest.execution_id == record.execution_id => {
                RetentionDecision::Discard
            }
            Some(oldest) => RetentionDecision::Supersede(oldest.execution_id),
            None => RetentionDecision::keep_for(record.outcome),
        }
    }

    pub fn snapshot(&self) -> JourneySnapshot {
        JourneySnapshot {
            journey_id: self.journey_id.clone(),
            latest_success_id: self.latest_success.map(|s| s.execution_id),
            failure_clusters: self.failure_clusters.len(),
            failure_occurrences: self.failure_clusters.values().map(|c| c.count).sum(),
            evicted_clusters: self.evicted_clusters,
            window_size: self.recent_window.len(),
            last_evaluated_at: self.last_evaluated_at,
            last_persisted_outcome: self.last_persisted_outcome,
        }
    }
}

/// Read-only summary of a journey's state for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySnapshot {
    pub journey_id: String,
    pub latest_success_id: Option<u64>,
    pub failure_clusters: usize,
    pub failure_occurrences: u64,
    pub evicted_clusters: u64,
    pub window_size: usize,
    pub last_evaluated_at: Option<DateTime<Utc>>,
    pub last_persisted_outcome: Option<Outcome>,
}

/// Calendar window index of `at`, in the configured offset
pub(crate) fn day_bucket(at: DateTime<Utc>, offset: FixedOffset, window_days: u32) -> i64 {
    let day = i64::from(at.with_timezone(&offset).date_naive().num_days_from_ce());
    day.div_euclid(i64::from(window_days.max(1)))
}

fn insert_ordered(window: &mut VecDeque<ExecutionSummary>, summary: ExecutionSummary) {
    let key = summary.order_key();
    let position = window.partition_point(|s| s.order_key() <= key);
    window.insert(position, summary);
}
