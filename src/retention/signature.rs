//! Failure fingerprints
//!
//! Two failures land in the same cluster when they fail at the same step with
//! the same message once volatile fragments (timestamps, ids, paths, numbers)
//! are masked. This is best-effort clustering, not exact deduplication.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Text normalization used before fingerprinting
pub trait Normalizer: Send + Sync {
    fn normalize(&self, text: &str) -> String;
}

static VOLATILE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // ISO-8601 timestamps and dates
        (
            r"\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?",
            "<ts>",
        ),
        // Clock times
        (r"\b\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?\b", "<ts>"),
        // UUIDs
        (
            r"(?i)\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b",
            "<id>",
        ),
        // Unix and Windows paths with at least two segments
        (r"(?:[A-Za-z]:)?(?:[/\\][\w.\-]+){2,}", "<path>"),
        // Hex ids
        (r"(?i)\b0x[0-9a-f]+\b|\b[0-9a-f]{12,}\b", "<id>"),
        // Remaining numbers
        (r"\d+", "<n>"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("static pattern compiles"),
            replacement,
        )
    })
    .collect()
});

/// Masks timestamps, ids, paths and numbers, then lowercases and collapses
/// whitespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct VolatileTextNormalizer;

impl Normalizer for VolatileTextNormalizer {
    fn normalize(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (pattern, replacement) in VOLATILE_PATTERNS.iter() {
            out = pattern.replace_all(&out, *replacement).into_owned();
        }
        out.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

/// Fingerprint of a failure: failing step plus normalized message
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureSignature(String);

impl FailureSignature {
    pub fn derive(step_id: &str, message: &str, normalizer: &dyn Normalizer) -> Self {
        let normalized = normalizer.normalize(message);
        let mut hasher = Sha256::new();
        hasher.update(step_id.trim().as_bytes());
        hasher.update([0x1f]);
        hasher.update(normalized.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        Self(digest[..32].to_string())
    }

    /// Bucket for non-passing records that carry no failure detail
    pub fn unclassified() -> Self {
        Self("unclassified".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FailureSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(text: &str) -> String {
        VolatileTextNormalizer.normalize(text)
    }

    #[test]
    fn test_masks_timestamps() {
        assert_eq!(
            normalize("Timed out at 2025-08-13T14:00:12.345Z waiting"),
            "timed out at <ts> waiting"
        );
        assert_eq!(normalize("failed at 14:02:11"), "failed at <ts>");
    }

    #[test]
    fn test_masks_numeric_ids() {
        assert_eq!(
            normalize("Element #48812 not found"),
            "element #<n> not found"
        );
    }

    #[test]
    fn test_masks_paths() {
        assert_eq!(
            normalize("Cannot read /tmp/run-1/screenshot.png"),
            "cannot read <path>"
        );
        assert_eq!(
            normalize(r"Missing C:\builds\agent\log.txt"),
            "missing <path>"
        );
    }

    #[test]
    fn test_masks_uuids() {
        assert_eq!(
            normalize("session 9e141010-eca5-43f5-afb9-20dc6c49833f expired"),
            "session <id> expired"
        );
    }

    #[test]
    fn test_collapses_whitespace_and_case() {
        assert_eq!(normalize("  Button   NOT\tvisible "), "button not visible");
    }

    #[test]
    fn test_same_step_same_normalized_text_same_signature() {
        let a = FailureSignature::derive(
            "step-12",
            "Timeout after 3000ms at 2025-08-13T01:00:00Z",
            &VolatileTextNormalizer,
        );
        let b = FailureSignature::derive(
            "step-12",
            "Timeout after 5000ms at 2025-08-14T09:30:00Z",
            &VolatileTextNormalizer,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_step_different_signature() {
        let a = FailureSignature::derive("step-12", "Timeout", &VolatileTextNormalizer);
        let b = FailureSignature::derive("step-13", "Timeout", &VolatileTextNormalizer);
        assert_ne!(a, b);
    }

    #[test]
    fn test_custom_normalizer_is_pluggable() {
        struct Identity;
        impl Normalizer for Identity {
            fn normalize(&self, text: &str) -> String {
                text.to_string()
            }
        }

        let a = FailureSignature::derive("s", "id 1", &Identity);
        let b = FailureSignature::derive("s", "id 2", &Identity);
        assert_ne!(a, b);
    }
}
