//! Display models for CLI output
//!
//! Converts engine and cache types into table rows with CLI column names.

pub mod display;

pub use display::{JourneyReportDisplay, ResourceDisplay, SnapshotDisplay, StatDisplay};
