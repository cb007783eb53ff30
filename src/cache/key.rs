//! Tenant-scoped cache keys
//!
//! A key can only be built with a tenant id, so every lookup is isolated per
//! tenant. Components are compared field by field, never concatenated, so
//! `("ab", "c")` and `("a", "bc")` stay apart.

use std::fmt;

use crate::cache::policy::ResourceClass;
use crate::error::CacheError;

/// Composite key for a cached upstream resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    tenant_id: String,
    class: ResourceClass,
    resource_id: String,
}

impl CacheKey {
    /// Build a key, rejecting empty tenant or resource ids.
    pub fn new(
        tenant_id: &str,
        class: ResourceClass,
        resource_id: &str,
    ) -> Result<Self, CacheError> {
        if tenant_id.trim().is_empty() {
            return Err(CacheError::InvalidKey("empty tenant id".to_string()));
        }
        if resource_id.trim().is_empty() {
            return Err(CacheError::InvalidKey(format!(
                "empty resource id for class '{}'",
                class
            )));
        }
        Ok(Self {
            tenant_id: tenant_id.to_string(),
            class,
            resource_id: resource_id.to_string(),
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn class(&self) -> ResourceClass {
        self.class
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tenant_id, self.class, self.resource_id)
    }
}
