//! Bounded-concurrency bulk retention
//!
//! Each journey's batch is sorted and then evaluated on a blocking worker, so
//! one journey's decisions are applied in order while up to `max_concurrent`
//! journeys run side by side.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;
use serde::Serialize;

use crate::error::{Error, Result, RetentionError};
use crate::retention::{ExecutionRecord, RetentionDecision, RetentionEngine};
use crate::storage::RecordStore;

type BatchFuture = Pin<Box<dyn Future<Output = (String, Result<JourneyReport>)> + Send>>;

/// Outcome tallies for one journey's batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyReport {
    pub journey_id: String,
    pub evaluated: usize,
    pub kept: usize,
    pub superseded: usize,
    pub discarded: usize,
    /// Records refused by the engine for arriving out of order
    pub rejected: usize,
}

impl JourneyReport {
    fn new(journey_id: &str) -> Self {
        Self {
            journey_id: journey_id.to_string(),
            ..Self::default()
        }
    }
}

/// Evaluate every journey batch and apply the decisions to `store`.
///
/// Out-of-order records are counted and skipped. Storage failures abort the
/// run; decisions already applied stay applied.
pub async fn process_journeys<S>(
    engine: Arc<RetentionEngine>,
    store: Arc<S>,
    batches: BTreeMap<String, Vec<ExecutionRecord>>,
    max_concurrent: usize,
) -> Result<Vec<JourneyReport>>
where
    S: RecordStore + 'static,
{
    if batches.is_empty() {
        return Ok(Vec::new());
    }

    let max_concurrent = max_concurrent.max(1);
    debug!(
        "Processing {} journeys with max {} concurrent",
        batches.len(),
        max_concurrent
    );

    let make_future = |journey_id: String, records: Vec<ExecutionRecord>| -> BatchFuture {
        let engine = Arc::clone(&engine);
        let store = Arc::clone(&store);
        Box::pin(async move {
            let id = journey_id.clone();
            let joined = tokio::task::spawn_blocking(move || {
                apply_batch(&engine, store.as_ref(), &journey_id, records)
            })
            .await;
            let result = match joined {
                Ok(result) => result,
                Err(e) => Err(Error::Other(format!("worker for journey '{}' failed: {}", id, e))),
            };
            (id, result)
        })
    };

    let mut futures: FuturesUnordered<BatchFuture> = FuturesUnordered::new();
    let mut pending = batches.into_iter();

    for (journey_id, records) in pending.by_ref().take(max_concurrent) {
        debug!("Starting batch for journey '{}'", journey_id);
        futures.push(make_future(journey_id, records));
    }

    let mut reports = Vec::new();
    while let Some((journey_id, result)) = futures.next().await {
        let report = result?;
        debug!(
            "Finished journey '{}': {} evaluated, {} kept, {} superseded, {} discarded",
            journey_id, report.evaluated, report.kept, report.superseded, report.discarded
        );
        reports.push(report);

        if let Some((next_id, records)) = pending.next() {
            debug!("Starting batch for journey '{}'", next_id);
            futures.push(make_future(next_id, records));
        }
    }

    reports.sort_by(|a, b| a.journey_id.cmp(&b.journey_id));
    Ok(reports)
}

/// Evaluate one journey's records in order and carry out each decision
pub fn apply_batch<S: RecordStore + ?Sized>(
    engine: &RetentionEngine,
    store: &S,
    journey_id: &str,
    mut records: Vec<ExecutionRecord>,
) -> Result<JourneyReport> {
    records.sort_by_key(|r| r.order_key());
    let mut report = JourneyReport::new(journey_id);

    for record in &records {
        if record.journey_id != journey_id {
            return Err(RetentionError::JourneyMismatch {
                expected: journey_id.to_string(),
                found: record.journey_id.clone(),
            }
            .into());
        }

        let decision = match engine.evaluate(record) {
            Ok(decision) => decision,
            Err(RetentionError::OutOfOrderRecord { .. }) => {
                report.rejected += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        report.evaluated += 1;

        match decision {
            RetentionDecision::KeepAsLatestSuccess | RetentionDecision::KeepAsNewFailureCluster => {
                store.persist(record)?;
                report.kept += 1;
            }
            RetentionDecision::Supersede(old_id) => {
                store.persist(record)?;
                store.delete(&store.locate(journey_id, old_id))?;
                report.superseded += 1;
            }
            RetentionDecision::Discard => report.discarded += 1,
        }
    }

    Ok(report)
}

/// Group records by journey, preserving each journey's input order
pub fn group_by_journey(
    records: impl IntoIterator<Item = ExecutionRecord>,
) -> BTreeMap<String, Vec<ExecutionRecord>> {
    let mut batches: BTreeMap<String, Vec<ExecutionRecord>> = BTreeMap::new();
    for record in records {
        batches
            .entry(record.journey_id.clone())
            .or_default()
            .push(record);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::record::Outcome;
    use crate::retention::signature::{FailureSignature, VolatileTextNormalizer};
    use crate::retention::{RetentionSettings, RetentionStrategy};
    use crate::storage::FileStore;
    use chrono::FixedOffset;
    use tempfile::TempDir;

    fn record(journey: &str, id: u64, outcome: Outcome, ts: &str) -> ExecutionRecord {
        ExecutionRecord {
            journey_id: journey.to_string(),
            execution_id: id,
            outcome,
            started_at: ts.parse().unwrap(),
            duration_ms: 100,
            failure_signature: None,
            raw_payload_ref: format!("executions/{}", id),
        }
    }

    fn engine(strategy: RetentionStrategy) -> Arc<RetentionEngine> {
        Arc::new(RetentionEngine::new(
            RetentionSettings::new(strategy).with_utc_offset(FixedOffset::east_opt(0).unwrap()),
        ))
    }

    fn persisted_ids(store: &FileStore, journey: &str) -> Vec<u64> {
        store
            .scan_journey(journey)
            .unwrap()
            .iter()
            .map(|r| r.execution_id)
            .collect()
    }

    #[tokio::test]
    async fn test_process_journeys_empty() {
        let dir = TempDir::new().unwrap();
        let reports = process_journeys(
            engine(RetentionStrategy::Smart),
            Arc::new(FileStore::new(dir.path())),
            BTreeMap::new(),
            4,
        )
        .await
        .unwrap();
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn test_smart_keeps_only_latest_success_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));

        // Deliberately unsorted input
        let batches = group_by_journey(vec![
            record("j", 3, Outcome::Pass, "2025-08-13T03:00:00Z"),
            record("j", 1, Outcome::Pass, "2025-08-13T01:00:00Z"),
            record("j", 2, Outcome::Pass, "2025-08-13T02:00:00Z"),
        ]);

        let reports = process_journeys(engine(RetentionStrategy::Smart), store.clone(), batches, 2)
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kept, 1);
        assert_eq!(reports[0].superseded, 2);
        assert_eq!(persisted_ids(&store, "j"), vec![3]);
    }

    #[tokio::test]
    async fn test_many_journeys_bounded_concurrency() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));
        let engine = engine(RetentionStrategy::LatestN(2));

        let mut records = Vec::new();
        for j in 0..10 {
            for i in 0..5u64 {
                records.push(record(
                    &format!("journey-{}", j),
                    j * 10 + i,
                    Outcome::Pass,
                    &format!("2025-08-13T0{}:00:00Z", i),
                ));
            }
        }

        let reports = process_journeys(engine.clone(), store.clone(), group_by_journey(records), 3)
            .await
            .unwrap();

        assert_eq!(reports.len(), 10);
        for report in &reports {
            assert_eq!(report.evaluated, 5);
            assert_eq!(report.kept, 2);
            assert_eq!(report.superseded, 3);
        }
        assert_eq!(persisted_ids(&store, "journey-4"), vec![43, 44]);
        assert_eq!(engine.stats().journeys, 10);
    }

    #[test]
    fn test_apply_batch_counts_out_of_order_and_continues() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let engine = engine(RetentionStrategy::Changes);

        apply_batch(
            &engine,
            &store,
            "j",
            vec![record("j", 5, Outcome::Pass, "2025-08-13T05:00:00Z")],
        )
        .unwrap();

        // A later batch carrying an older record plus a newer one
        let report = apply_batch(
            &engine,
            &store,
            "j",
            vec![
                record("j", 1, Outcome::Fail, "2025-08-13T01:00:00Z"),
                record("j", 6, Outcome::Fail, "2025-08-13T06:00:00Z"),
            ],
        )
        .unwrap();

        assert_eq!(report.rejected, 1);
        assert_eq!(report.kept, 1);
        assert_eq!(persisted_ids(&store, "j"), vec![5, 6]);
    }

    #[test]
    fn test_apply_batch_rejects_foreign_journey() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let engine = engine(RetentionStrategy::All);

        let err = apply_batch(
            &engine,
            &store,
            "j",
            vec![record("other", 1, Outcome::Pass, "2025-08-13T01:00:00Z")],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Retention(RetentionError::JourneyMismatch { .. })
        ));
    }

    #[test]
    fn test_rerun_after_rebuild_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let batch = vec![
            record("j", 1, Outcome::Pass, "2025-08-13T01:00:00Z"),
            record("j", 2, Outcome::Pass, "2025-08-13T02:00:00Z"),
            record("j", 3, Outcome::Pass, "2025-08-13T03:00:00Z"),
        ];

        let first = engine(RetentionStrategy::LatestN(2));
        apply_batch(&first, &store, "j", batch.clone()).unwrap();
        assert_eq!(persisted_ids(&store, "j"), vec![2, 3]);

        // Simulated restart
        let second = engine(RetentionStrategy::LatestN(2));
        second.rebuild("j", &store.scan_journey("j").unwrap()).unwrap();
        apply_batch(&second, &store, "j", batch).unwrap();

        assert_eq!(persisted_ids(&store, "j"), vec![2, 3]);
    }

    #[test]
    fn test_rerun_after_rebuild_keeps_failure_counts() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let mut first_failure = record("j", 2, Outcome::Fail, "2025-08-13T14:00:00Z");
        let mut second_failure = record("j", 3, Outcome::Fail, "2025-08-14T00:01:00Z");
        let signature =
            FailureSignature::derive("step-4", "Element #48812 not found", &VolatileTextNormalizer);
        first_failure.failure_signature = Some(signature.clone());
        second_failure.failure_signature = Some(signature);
        let batch = vec![
            record("j", 1, Outcome::Pass, "2025-08-13T01:00:00Z"),
            first_failure,
            second_failure,
            record("j", 4, Outcome::Pass, "2025-08-14T09:00:00Z"),
        ];

        let first = engine(RetentionStrategy::Smart);
        apply_batch(&first, &store, "j", batch.clone()).unwrap();
        assert_eq!(first.snapshot("j").unwrap().failure_occurrences, 2);

        let second = engine(RetentionStrategy::Smart);
        second.rebuild("j", &store.scan_journey("j").unwrap()).unwrap();
        apply_batch(&second, &store, "j", batch).unwrap();

        let snapshot = second.snapshot("j").unwrap();
        assert_eq!(snapshot.failure_clusters, 1);
        assert_eq!(snapshot.failure_occurrences, 2);
        assert_eq!(persisted_ids(&store, "j"), vec![2, 4]);
    }

    #[test]
    fn test_group_by_journey() {
        let batches = group_by_journey(vec![
            record("b", 1, Outcome::Pass, "2025-08-13T01:00:00Z"),
            record("a", 2, Outcome::Pass, "2025-08-13T01:00:00Z"),
            record("b", 3, Outcome::Pass, "2025-08-13T01:00:00Z"),
        ]);
        assert_eq!(batches.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(batches["b"].len(), 2);
    }
}
