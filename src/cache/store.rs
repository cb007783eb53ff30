//! In-memory, tenant-scoped response cache with TTL and LRU eviction
//!
//! Expiry is lazy: an entry past its TTL is removed the first time it is
//! looked up. Idle entries that are never read again only leave through
//! budget eviction.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::key::CacheKey;
use crate::cache::policy::{NamespacePolicy, ResourceClass};
use crate::cache::stats::CacheStats;
use crate::clock::Clock;
use crate::error::CacheError;

/// Entry and memory budgets. Both are soft: an entry larger than
/// `max_memory_bytes` on its own is still admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    pub max_entries: usize,
    pub max_memory_bytes: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_entries: 512,
            max_memory_bytes: 32 * 1024 * 1024,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    key: CacheKey,
    value: Arc<Value>,
    created_at: DateTime<Utc>,
    size_estimate: usize,
    /// Last-access marker. Starts at the insert's sequence number and only
    /// grows on later reads, so it never orders before creation; eviction
    /// compares these rather than wall-clock access times.
    access_seq: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    /// access_seq -> key, oldest first
    recency: BTreeMap<u64, CacheKey>,
    next_seq: u64,
    memory: usize,
    stats: CacheStats,
}

impl CacheState {
    fn touch(&mut self, key: &CacheKey) -> Option<Arc<Value>> {
        let seq = self.next_seq;
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.access_seq);
        entry.access_seq = seq;
        self.recency.insert(seq, entry.key.clone());
        self.next_seq += 1;
        Some(Arc::clone(&entry.value))
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.access_seq);
        self.memory -= entry.size_estimate;
        Some(entry)
    }

    fn evict_lru(&mut self) -> Option<CacheEntry> {
        let (_, key) = self.recency.pop_first()?;
        let entry = self.entries.remove(&key)?;
        self.memory -= entry.size_estimate;
        self.stats.evictions += 1;
        Some(entry)
    }
}

/// Shared response cache.
///
/// A single mutex guards entries, the recency index and counters. Nothing
/// performs I/O while it is held.
pub struct ResponseCache {
    policy: NamespacePolicy,
    limits: CacheLimits,
    clock: Arc<dyn Clock>,
    force_fresh: bool,
    state: Mutex<CacheState>,
}

impl ResponseCache {
    pub fn new(policy: NamespacePolicy, limits: CacheLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            limits,
            clock,
            force_fresh: false,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Treat every lookup as a miss while still accepting writes.
    ///
    /// Existing entries are left in place, so a failed refetch does not lose
    /// the previous value for a later normal-mode lookup.
    pub fn with_force_fresh(mut self, force_fresh: bool) -> Self {
        self.force_fresh = force_fresh;
        self
    }

    #[cfg(test)]
    pub fn is_force_fresh(&self) -> bool {
        self.force_fresh
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a resource. Never fails: malformed keys, excluded classes,
    /// expired entries and force-fresh mode all read as a miss.
    pub fn get(
        &self,
        tenant_id: &str,
        class: ResourceClass,
        resource_id: &str,
    ) -> Option<Arc<Value>> {
        let rule = self.policy.rule(class);
        let key = CacheKey::new(tenant_id, class, resource_id).ok();
        let now = self.clock.now();
        let mut state = self.lock();

        let (Some(rule), Some(key)) = (rule, key) else {
            state.stats.misses += 1;
            return None;
        };

        if self.force_fresh {
            state.stats.misses += 1;
            return None;
        }

        let expired = match state.entries.get(&key) {
            None => {
                state.stats.misses += 1;
                return None;
            }
            Some(entry) => (now - entry.created_at)
                .to_std()
                .is_ok_and(|age| age > rule.ttl),
        };

        if expired {
            log::debug!("Cache expired: {}", key);
            state.remove(&key);
            state.stats.expirations += 1;
            state.stats.misses += 1;
            return None;
        }

        state.stats.hits += 1;
        state.touch(&key)
    }

    /// Insert or overwrite a resource, sizing it structurally.
    pub fn put(
        &self,
        tenant_id: &str,
        class: ResourceClass,
        resource_id: &str,
        value: Value,
    ) -> Result<(), CacheError> {
        let size = estimate_size(&value);
        self.put_sized(tenant_id, class, resource_id, value, size)
    }

    /// Insert or overwrite a resource with a caller-supplied size estimate.
    ///
    /// Fails only on an empty tenant or resource id. Excluded classes are
    /// ignored.
    pub fn put_sized(
        &self,
        tenant_id: &str,
        class: ResourceClass,
        resource_id: &str,
        value: Value,
        size_estimate: usize,
    ) -> Result<(), CacheError> {
        let key = CacheKey::new(tenant_id, class, resource_id)?;
        if self.policy.rule(class).is_none() {
            log::debug!("Not caching per-extraction resource {}", key);
            return Ok(());
        }

        let now = self.clock.now();
        let mut state = self.lock();
        state.remove(&key);

        while !state.entries.is_empty()
            && (state.entries.len() + 1 > self.limits.max_entries
                || state.memory + size_estimate > self.limits.max_memory_bytes)
        {
            match state.evict_lru() {
                Some(evicted) => log::debug!("Cache evicted: {}", evicted.key),
                None => break,
            }
        }

        if size_estimate > self.limits.max_memory_bytes {
            state.stats.over_budget_inserts += 1;
            log::warn!(
                "Cache entry {} ({} bytes) exceeds memory budget of {} bytes",
                key,
                size_estimate,
                self.limits.max_memory_bytes
            );
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.recency.insert(seq, key.clone());
        state.memory += size_estimate;
        state.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value: Arc::new(value),
                created_at: now,
                size_estimate,
                access_seq: seq,
            },
        );
        Ok(())
    }

    /// Remove one entry. Returns whether anything was removed.
    pub fn invalidate(&self, tenant_id: &str, class: ResourceClass, resource_id: &str) -> bool {
        let Ok(key) = CacheKey::new(tenant_id, class, resource_id) else {
            return false;
        };
        self.lock().remove(&key).is_some()
    }

    /// Drop every entry of a volatile class for one tenant.
    pub fn purge_volatile(&self, tenant_id: &str) -> usize {
        let mut state = self.lock();
        let doomed: Vec<CacheKey> = state
            .entries
            .keys()
            .filter(|k| k.tenant_id() == tenant_id && self.policy.is_volatile(k.class()))
            .cloned()
            .collect();
        for key in &doomed {
            state.remove(key);
        }
        doomed.len()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entry_count: state.entries.len(),
            memory_estimate: state.memory,
            ..state.stats
        }
    }
}

/// Rough in-memory footprint of a JSON value
pub fn estimate_size(value: &Value) -> usize {
    const NODE: usize = 16;
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => NODE,
        Value::String(s) => NODE + s.len(),
        Value::Array(items) => NODE + items.iter().map(estimate_size).sum::<usize>(),
        Value::Object(map) => {
            NODE + map
                .iter()
                .map(|(k, v)| NODE + k.len() + estimate_size(v))
                .sum::<usize>()
        }
    }
}
