//! Reusable formatting utilities for CLI output
//!
//! Timestamps, byte counts and optional ids as they appear in tables.

use chrono::{DateTime, FixedOffset, Utc};

/// Format a UTC timestamp in the given offset.
///
/// Returns "N/A" when there is no timestamp.
///
/// # Example output
/// `2025-08-13 14:00 +02:00`
pub fn format_timestamp(at: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    match at {
        Some(at) => at.with_timezone(&offset).format("%Y-%m-%d %H:%M %:z").to_string(),
        None => "N/A".to_string(),
    }
}

/// Format a byte count with a binary unit.
///
/// # Example output
/// - `512 B`
/// - `1.5 KiB`
/// - `32.0 MiB`
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Format an optional execution id, "-" when absent
pub fn format_optional_id(id: Option<u64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}
