//! File-backed record store
//!
//! Layout: `<root>/<journey-slug>/execution_<id>.json`, plus a `journey.json`
//! marker per directory holding the original journey id.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{RecordStore, StorageRef};
use crate::error::StorageError;
use crate::retention::ExecutionRecord;

const MARKER_FILE: &str = "journey.json";
const RECORD_PREFIX: &str = "execution_";
const RECORD_SUFFIX: &str = ".json";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JourneyMarker {
    journey_id: String,
}

/// Stores one pretty-printed JSON file per retained execution
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn journey_dir(&self, journey_id: &str) -> PathBuf {
        self.root.join(journey_slug(journey_id))
    }

    fn ensure_journey_dir(&self, journey_id: &str) -> Result<PathBuf, StorageError> {
        let dir = self.journey_dir(journey_id);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let marker = dir.join(MARKER_FILE);
        if !marker.exists() {
            let body = serde_json::to_string_pretty(&JourneyMarker {
                journey_id: journey_id.to_string(),
            })
            .map_err(|e| StorageError::Corrupt {
                path: marker.clone(),
                message: e.to_string(),
            })?;
            write_atomic(&marker, body.as_bytes())?;
        }
        Ok(dir)
    }

    fn read_record(path: &Path) -> Result<ExecutionRecord, StorageError> {
        let contents = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        serde_json::from_str(&contents).map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl RecordStore for FileStore {
    fn persist(&self, record: &ExecutionRecord) -> Result<StorageRef, StorageError> {
        self.ensure_journey_dir(&record.journey_id)?;
        let target = self.locate(&record.journey_id, record.execution_id);

        let body = serde_json::to_vec_pretty(record).map_err(|e| StorageError::Corrupt {
            path: target.path().to_path_buf(),
            message: e.to_string(),
        })?;
        write_atomic(target.path(), &body)?;

        log::debug!("Persisted execution {} to {}", record.execution_id, target);
        Ok(target)
    }

    fn delete(&self, storage_ref: &StorageRef) -> Result<(), StorageError> {
        match fs::remove_file(storage_ref.path()) {
            Ok(()) => {
                log::debug!("Deleted {}", storage_ref);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(storage_ref.path(), e)),
        }
    }

    fn locate(&self, journey_id: &str, execution_id: u64) -> StorageRef {
        StorageRef::new(
            self.journey_dir(journey_id)
                .join(format!("{RECORD_PREFIX}{execution_id}{RECORD_SUFFIX}")),
        )
    }

    fn scan_journey(&self, journey_id: &str) -> Result<Vec<ExecutionRecord>, StorageError> {
        let dir = self.journey_dir(journey_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&dir, e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StorageError::io(&dir, e))?.path();
            if !is_record_file(&path) {
                continue;
            }
            let record = Self::read_record(&path)?;
            if record.journey_id != journey_id {
                return Err(StorageError::Corrupt {
                    path,
                    message: format!(
                        "belongs to journey '{}', not '{}'",
                        record.journey_id, journey_id
                    ),
                });
            }
            records.push(record);
        }

        records.sort_by_key(|r| r.order_key());
        Ok(records)
    }

    fn journeys(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.root, e)),
        };

        let mut journeys = Vec::new();
        for entry in entries {
            let marker = entry.map_err(|e| StorageError::io(&self.root, e))?.path().join(MARKER_FILE);
            if !marker.is_file() {
                continue;
            }
            let contents = fs::read_to_string(&marker).map_err(|e| StorageError::io(&marker, e))?;
            let parsed: JourneyMarker =
                serde_json::from_str(&contents).map_err(|e| StorageError::Corrupt {
                    path: marker.clone(),
                    message: e.to_string(),
                })?;
            journeys.push(parsed.journey_id);
        }

        journeys.sort();
        Ok(journeys)
    }
}

/// Directory name for a journey: readable prefix plus a short hash so that
/// ids differing only in punctuation or case never share a directory.
pub fn journey_slug(journey_id: &str) -> String {
    let mut slug = String::with_capacity(journey_id.len());
    for c in journey_id.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "journey" } else { slug };
    let truncated: String = slug.chars().take(48).collect();

    let digest = Sha256::digest(journey_id.as_bytes());
    let short: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("{}-{}", truncated.trim_end_matches('-'), short)
}

fn is_record_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(RECORD_PREFIX) && n.ends_with(RECORD_SUFFIX))
        .unwrap_or(false)
}

fn write_atomic(path: &Path, body: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(|e| StorageError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::record::Outcome;
    use tempfile::TempDir;

    fn record(journey: &str, id: u64, ts: &str) -> ExecutionRecord {
        ExecutionRecord {
            journey_id: journey.to_string(),
            execution_id: id,
            outcome: Outcome::Pass,
            started_at: ts.parse().unwrap(),
            duration_ms: 100,
            failure_signature: None,
            raw_payload_ref: format!("executions/{}", id),
        }
    }

    #[test]
    fn test_persist_and_scan_sorted() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        store.persist(&record("Demo Test", 3, "2025-08-13T03:00:00Z")).unwrap();
        store.persist(&record("Demo Test", 1, "2025-08-13T01:00:00Z")).unwrap();
        store.persist(&record("Demo Test", 2, "2025-08-13T01:00:00Z")).unwrap();

        let ids: Vec<u64> = store
            .scan_journey("Demo Test")
            .unwrap()
            .iter()
            .map(|r| r.execution_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_persist_writes_expected_layout() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        let stored = store.persist(&record("Demo Test", 88715, "2025-08-13T01:00:00Z")).unwrap();

        assert!(stored.path().is_file());
        assert_eq!(
            stored.path().file_name().unwrap().to_str().unwrap(),
            "execution_88715.json"
        );
        assert!(stored.path().parent().unwrap().join(MARKER_FILE).is_file());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let stored = store.persist(&record("j", 1, "2025-08-13T01:00:00Z")).unwrap();

        store.delete(&stored).unwrap();
        store.delete(&stored).unwrap();
        assert!(!stored.path().exists());
        assert!(store.scan_journey("j").unwrap().is_empty());
    }

    #[test]
    fn test_locate_matches_persist() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let stored = store.persist(&record("j", 7, "2025-08-13T01:00:00Z")).unwrap();
        assert_eq!(store.locate("j", 7), stored);
    }

    #[test]
    fn test_journeys_lists_original_ids() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.persist(&record("Login Flow", 1, "2025-08-13T01:00:00Z")).unwrap();
        store.persist(&record("Demo Test", 2, "2025-08-13T01:00:00Z")).unwrap();

        assert_eq!(store.journeys().unwrap(), vec!["Demo Test", "Login Flow"]);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("absent"));
        assert!(store.journeys().unwrap().is_empty());
        assert!(store.scan_journey("j").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_record_reported() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let stored = store.persist(&record("j", 1, "2025-08-13T01:00:00Z")).unwrap();
        fs::write(stored.path(), "{ not json").unwrap();

        let err = store.scan_journey("j").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn test_slug_is_readable_and_distinct() {
        let a = journey_slug("Demo Test");
        let b = journey_slug("demo-test");
        assert!(a.starts_with("demo-test-"));
        assert!(b.starts_with("demo-test-"));
        assert_ne!(a, b);
        assert!(journey_slug("???").starts_with("journey-"));
    }
}
