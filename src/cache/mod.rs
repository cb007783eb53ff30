//! Tenant-scoped response cache
//!
//! Holds upstream lookups (projects, environments, test catalogs) in memory,
//! keyed by tenant, class and id. Each class has its own TTL; entry and
//! memory budgets are enforced with least-recently-used eviction.

pub mod client;
pub mod key;
pub mod policy;
pub mod stats;
pub mod store;

// Re-export main types
pub use client::CachedPlatformClient;
pub use policy::{CacheTtl, NamespacePolicy, ResourceClass};
pub use stats::CacheStats;
pub use store::{CacheLimits, ResponseCache};
