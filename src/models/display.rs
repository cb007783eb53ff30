//! Display model implementations for table and JSON output

use chrono::FixedOffset;
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use crate::cache::{CacheStats, ResourceClass};
use crate::output::formatters::{format_bytes, format_optional_id, format_timestamp};
use crate::retention::{JourneyReport, JourneySnapshot, RetentionStats};

/// Per-journey result of a `retain` run
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct JourneyReportDisplay {
    #[tabled(rename = "JOURNEY")]
    pub journey: String,

    #[tabled(rename = "EVALUATED")]
    pub evaluated: usize,

    #[tabled(rename = "KEPT")]
    pub kept: usize,

    #[tabled(rename = "SUPERSEDED")]
    pub superseded: usize,

    #[tabled(rename = "DISCARDED")]
    pub discarded: usize,

    /// Out-of-order records refused by the engine
    #[tabled(rename = "REJECTED")]
    pub rejected: usize,
}

impl From<&JourneyReport> for JourneyReportDisplay {
    fn from(report: &JourneyReport) -> Self {
        Self {
            journey: report.journey_id.clone(),
            evaluated: report.evaluated,
            kept: report.kept,
            superseded: report.superseded,
            discarded: report.discarded,
            rejected: report.rejected,
        }
    }
}

/// Rebuilt state of one journey
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct SnapshotDisplay {
    #[tabled(rename = "JOURNEY")]
    pub journey: String,

    #[tabled(rename = "LATEST SUCCESS")]
    pub latest_success: String,

    #[tabled(rename = "CLUSTERS")]
    pub clusters: usize,

    #[tabled(rename = "WINDOW")]
    pub window: usize,

    #[tabled(rename = "LAST OUTCOME")]
    pub last_outcome: String,

    #[tabled(rename = "LAST RUN")]
    pub last_run: String,
}

impl SnapshotDisplay {
    pub fn new(snapshot: &JourneySnapshot, offset: FixedOffset) -> Self {
        Self {
            journey: snapshot.journey_id.clone(),
            latest_success: format_optional_id(snapshot.latest_success_id),
            clusters: snapshot.failure_clusters,
            window: snapshot.window_size,
            last_outcome: snapshot
                .last_persisted_outcome
                .map(|o| o.to_string())
                .unwrap_or_else(|| "-".to_string()),
            last_run: format_timestamp(snapshot.last_evaluated_at, offset),
        }
    }
}

/// One named counter
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct StatDisplay {
    #[tabled(rename = "STAT")]
    pub stat: String,

    #[tabled(rename = "VALUE")]
    pub value: String,
}

impl StatDisplay {
    fn new(stat: &str, value: impl ToString) -> Self {
        Self {
            stat: stat.to_string(),
            value: value.to_string(),
        }
    }

    pub fn from_retention(stats: &RetentionStats) -> Vec<Self> {
        vec![
            Self::new("journeys", stats.journeys),
            Self::new("evaluated", stats.evaluated),
            Self::new("kept", stats.kept),
            Self::new("superseded", stats.superseded),
            Self::new("discarded", stats.discarded),
            Self::new("out of order", stats.out_of_order),
        ]
    }

    pub fn from_cache(stats: &CacheStats) -> Vec<Self> {
        vec![
            Self::new("hits", stats.hits),
            Self::new("misses", stats.misses),
            Self::new("hit rate", format!("{:.0}%", stats.hit_rate() * 100.0)),
            Self::new("evictions", stats.evictions),
            Self::new("expirations", stats.expirations),
            Self::new("over budget inserts", stats.over_budget_inserts),
            Self::new("entries", stats.entry_count),
            Self::new("memory", format_bytes(stats.memory_estimate)),
        ]
    }
}

/// A fetched upstream resource
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct ResourceDisplay {
    #[tabled(rename = "CLASS")]
    pub class: String,

    #[tabled(rename = "ID")]
    pub id: String,

    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(skip)]
    pub value: Value,
}

impl ResourceDisplay {
    pub fn new(class: ResourceClass, id: &str, value: Value) -> Self {
        let name = ["name", "title", "label"]
            .iter()
            .find_map(|field| value.get(field).and_then(Value::as_str))
            .unwrap_or("-")
            .to_string();

        Self {
            class: class.to_string(),
            id: id.to_string(),
            name,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::record::Outcome;
    use serde_json::json;

    #[test]
    fn test_report_display() {
        let report = JourneyReport {
            journey_id: "Demo Test".to_string(),
            evaluated: 3,
            kept: 2,
            superseded: 0,
            discarded: 1,
            rejected: 0,
        };
        let display = JourneyReportDisplay::from(&report);
        assert_eq!(display.journey, "Demo Test");
        assert_eq!(display.kept, 2);
    }

    #[test]
    fn test_snapshot_display_handles_empty_journey() {
        let snapshot = JourneySnapshot {
            journey_id: "j".to_string(),
            latest_success_id: None,
            failure_clusters: 0,
            failure_occurrences: 0,
            evicted_clusters: 0,
            window_size: 0,
            last_evaluated_at: None,
            last_persisted_outcome: None,
        };
        let display = SnapshotDisplay::new(&snapshot, FixedOffset::east_opt(0).unwrap());
        assert_eq!(display.latest_success, "-");
        assert_eq!(display.last_outcome, "-");
        assert_eq!(display.last_run, "N/A");
    }

    #[test]
    fn test_snapshot_display_populated() {
        let snapshot = JourneySnapshot {
            journey_id: "j".to_string(),
            latest_success_id: Some(88715),
            failure_clusters: 2,
            failure_occurrences: 5,
            evicted_clusters: 0,
            window_size: 3,
            last_evaluated_at: Some("2025-08-13T14:00:00Z".parse().unwrap()),
            last_persisted_outcome: Some(Outcome::Fail),
        };
        let display = SnapshotDisplay::new(&snapshot, FixedOffset::east_opt(0).unwrap());
        assert_eq!(display.latest_success, "88715");
        assert_eq!(display.last_outcome, "FAIL");
        assert_eq!(display.last_run, "2025-08-13 14:00 +00:00");
    }

    #[test]
    fn test_cache_stat_rows() {
        let stats = CacheStats {
            hits: 1,
            misses: 1,
            ..Default::default()
        };
        let rows = StatDisplay::from_cache(&stats);
        let rate = rows.iter().find(|r| r.stat == "hit rate").unwrap();
        assert_eq!(rate.value, "50%");
    }

    #[test]
    fn test_resource_display_picks_name() {
        let display = ResourceDisplay::new(
            ResourceClass::Project,
            "4889",
            json!({"id": 4889, "name": "Demo Project"}),
        );
        assert_eq!(display.name, "Demo Project");
        assert_eq!(display.class, "project");

        let unnamed = ResourceDisplay::new(ResourceClass::TestCatalog, "4889", json!([1, 2]));
        assert_eq!(unnamed.name, "-");
    }
}
