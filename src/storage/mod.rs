//! Persistence collaborator for retained executions
//!
//! The retention engine only decides; a `RecordStore` carries out the
//! resulting writes and deletes, and re-reads persisted records for rebuild.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::StorageError;
use crate::retention::ExecutionRecord;

pub mod file;

pub use file::FileStore;

/// Location of one persisted execution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StorageRef(PathBuf);

impl StorageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for StorageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Blocking persistence operations. Callers run these off the async runtime.
pub trait RecordStore: Send + Sync {
    /// Write a record, replacing any earlier copy of the same execution
    fn persist(&self, record: &ExecutionRecord) -> Result<StorageRef, StorageError>;

    /// Remove a persisted record. Removing something already gone succeeds.
    fn delete(&self, storage_ref: &StorageRef) -> Result<(), StorageError>;

    /// Where an execution of a journey is (or would be) persisted
    fn locate(&self, journey_id: &str, execution_id: u64) -> StorageRef;

    /// Persisted records for a journey, ascending by start time then id
    fn scan_journey(&self, journey_id: &str) -> Result<Vec<ExecutionRecord>, StorageError>;

    /// Ids of every journey with a persisted record, sorted
    fn journeys(&self) -> Result<Vec<String>, StorageError>;
}
