//! Response cache statistics

use serde::Serialize;

/// Snapshot of cache counters.
///
/// Counters are monotonic since the cache was created; `entry_count` and
/// `memory_estimate` describe the current contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Entries dropped on access because their TTL had passed
    pub expirations: u64,
    /// Inserts whose own size exceeded the memory budget
    pub over_budget_inserts: u64,
    pub entry_count: usize,
    pub memory_estimate: usize,
}

impl CacheStats {
    /// Hit ratio in `[0, 1]`, or 0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
