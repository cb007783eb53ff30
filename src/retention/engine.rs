//! Retention engine
//!
//! Owns one `JourneyRetentionState` per journey behind its own lock, so
//! decisions for one journey are serialized while different journeys proceed
//! in parallel. The engine only decides; callers persist and delete.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{FixedOffset, Local, Offset};
use serde::Serialize;

use crate::error::RetentionError;
use crate::retention::record::{ExecutionRecord, RetentionDecision};
use crate::retention::state::{DecisionContext, JourneyRetentionState, JourneySnapshot};
use crate::retention::strategy::RetentionStrategy;

/// Engine configuration, resolved once at startup
#[derive(Debug, Clone, Copy)]
pub struct RetentionSettings {
    pub strategy: RetentionStrategy,
    /// Distinct failure kinds remembered per journey; the stalest is forgotten
    /// beyond this. Zero means unbounded.
    pub max_failure_clusters: usize,
    /// Persisted summaries kept per journey for reporting
    pub history_window: usize,
    /// Offset used to assign calendar days for the daily strategy
    pub utc_offset: FixedOffset,
}

impl RetentionSettings {
    pub fn new(strategy: RetentionStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn with_max_failure_clusters(mut self, max: usize) -> Self {
        self.max_failure_clusters = max;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.max(1);
        self
    }

    fn context(&self) -> DecisionContext {
        let history_window = match self.strategy {
            RetentionStrategy::LatestN(n) => n,
            _ => self.history_window,
        };
        DecisionContext {
            strategy: self.strategy,
            max_failure_clusters: self.max_failure_clusters,
            history_window,
            utc_offset: self.utc_offset,
        }
    }
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            strategy: RetentionStrategy::Smart,
            max_failure_clusters: 256,
            history_window: 20,
            utc_offset: Local::now().offset().fix(),
        }
    }
}

/// Decision counters across all journeys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionStats {
    pub evaluated: u64,
    pub kept: u64,
    pub superseded: u64,
    pub discarded: u64,
    pub out_of_order: u64,
    pub journeys: usize,
}

#[derive(Debug, Default)]
struct Counters {
    evaluated: AtomicU64,
    kept: AtomicU64,
    superseded: AtomicU64,
    discarded: AtomicU64,
    out_of_order: AtomicU64,
}

type SharedState = Arc<Mutex<JourneyRetentionState>>;

/// Per-journey retention state machine
#[derive(Debug)]
pub struct RetentionEngine {
    settings: RetentionSettings,
    journeys: Mutex<HashMap<String, SharedState>>,
    counters: Counters,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RetentionEngine {
    pub fn new(settings: RetentionSettings) -> Self {
        Self {
            settings,
            journeys: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    pub fn strategy(&self) -> RetentionStrategy {
        self.settings.strategy
    }

    fn journey(&self, journey_id: &str) -> SharedState {
        let mut journeys = lock(&self.journeys);
        journeys
            .entry(journey_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(JourneyRetentionState::new(journey_id))))
            .clone()
    }

    /// Decide what to do with one execution.
    ///
    /// Under order-sensitive strategies a record that started before the last
    /// record evaluated for its journey is rejected and leaves state untouched.
    pub fn evaluate(&self, record: &ExecutionRecord) -> Result<RetentionDecision, RetentionError> {
        let shared = self.journey(&record.journey_id);
        let mut state = lock(&shared);

        if self.settings.strategy.requires_ordering() {
            if let Some(last) = state.last_evaluated_at() {
                if record.started_at < last {
                    self.counters.out_of_order.fetch_add(1, Ordering::Relaxed);
                    log::warn!(
                        "Rejecting out-of-order execution {} for journey '{}'",
                        record.execution_id,
                        record.journey_id
                    );
                    return Err(RetentionError::OutOfOrderRecord {
                        journey_id: record.journey_id.clone(),
                        execution_id: record.execution_id,
                        started_at: record.started_at,
                        last_started_at: last,
                    });
                }
            }
        }

        let decision = state.decide(record, &self.settings.context());
        drop(state);

        self.counters.evaluated.fetch_add(1, Ordering::Relaxed);
        let counter = match decision {
            RetentionDecision::KeepAsLatestSuccess | RetentionDecision::KeepAsNewFailureCluster => {
                &self.counters.kept
            }
            RetentionDecision::Supersede(_) => &self.counters.superseded,
            RetentionDecision::Discard => &self.counters.discarded,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        log::debug!(
            "Journey '{}' execution {} ({}): {}",
            record.journey_id,
            record.execution_id,
            record.outcome,
            decision
        );
        Ok(decision)
    }

    /// Reconstruct a journey's state from its persisted records.
    ///
    /// Records are replayed in `(started_at, execution_id)` order through the
    /// same decision logic. No decisions are emitted and no counters move.
    pub fn rebuild(
        &self,
        journey_id: &str,
        persisted: &[ExecutionRecord],
    ) -> Result<JourneySnapshot, RetentionError> {
        if let Some(foreign) = persisted.iter().find(|r| r.journey_id != journey_id) {
            return Err(RetentionError::JourneyMismatch {
                expected: journey_id.to_string(),
                found: foreign.journey_id.clone(),
            });
        }

        let mut ordered: Vec<&ExecutionRecord> = persisted.iter().collect();
        ordered.sort_by_key(|r| r.order_key());

        let ctx = self.settings.context();
        let mut state = JourneyRetentionState::new(journey_id);
        for record in ordered {
            state.decide(record, &ctx);
        }
        let snapshot = state.snapshot();

        lock(&self.journeys).insert(journey_id.to_string(), Arc::new(Mutex::new(state)));
        log::debug!(
            "Rebuilt journey '{}' from {} persisted records",
            journey_id,
            persisted.len()
        );
        Ok(snapshot)
    }

    /// Snapshot of one journey, if the engine has seen it
    pub fn snapshot(&self, journey_id: &str) -> Option<JourneySnapshot> {
        let shared = lock(&self.journeys).get(journey_id).cloned()?;
        let state = lock(&shared);
        Some(state.snapshot())
    }

    /// Snapshots of every known journey, sorted by journey id
    pub fn snapshots(&self) -> Vec<JourneySnapshot> {
        let states: Vec<SharedState> = lock(&self.journeys).values().cloned().collect();
        let mut snapshots: Vec<JourneySnapshot> =
            states.iter().map(|s| lock(s).snapshot()).collect();
        snapshots.sort_by(|a, b| a.journey_id.cmp(&b.journey_id));
        snapshots
    }

    /// Run `f` against a journey's state while holding its lock
    #[cfg(test)]
    pub fn inspect<R>(&self, journey_id: &str, f: impl FnOnce(&JourneyRetentionState) -> R) -> Option<R> {
        let shared = lock(&self.journeys).get(journey_id).cloned()?;
        let state = lock(&shared);
        Some(f(&state))
    }

    pub fn stats(&self) -> RetentionStats {
        RetentionStats {
            evaluated: self.counters.evaluated.load(Ordering::Relaxed),
            kept: self.counters.kept.load(Ordering::Relaxed),
            superseded: self.counters.superseded.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            out_of_order: self.counters.out_of_order.load(Ordering::Relaxed),
            journeys: lock(&self.journeys).len(),
        }
    }
}
