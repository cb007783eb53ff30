//! Resource classes and per-class caching policy

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Kinds of upstream resources the platform exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceClass {
    Project,
    Environment,
    TestCatalog,
    /// Per-extraction, never cached
    Journey,
    /// Per-extraction, never cached
    Execution,
}

impl ResourceClass {
    pub const ALL: [ResourceClass; 5] = [
        ResourceClass::Project,
        ResourceClass::Environment,
        ResourceClass::TestCatalog,
        ResourceClass::Journey,
        ResourceClass::Execution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::Project => "project",
            ResourceClass::Environment => "environment",
            ResourceClass::TestCatalog => "test-catalog",
            ResourceClass::Journey => "journey",
            ResourceClass::Execution => "execution",
        }
    }

    /// Journey and execution ids change on every extraction, so a cached
    /// copy could never be hit again.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, ResourceClass::Journey | ResourceClass::Execution)
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceClass {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ResourceClass::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown resource class '{}'", s)))
    }
}

/// Default TTLs per cacheable class
pub struct CacheTtl;

impl CacheTtl {
    // Project and environment definitions rarely change mid-run
    pub const PROJECT: Duration = Duration::from_secs(60 * 60); // 1 hr
    pub const ENVIRONMENT: Duration = Duration::from_secs(60 * 60); // 1 hr

    // Catalogs change whenever someone edits a journey
    pub const TEST_CATALOG: Duration = Duration::from_secs(10 * 60); // 10 min
}

/// TTL and volatility for one cacheable class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceRule {
    pub ttl: Duration,
    /// Dropped by `ResponseCache::purge_volatile`
    pub volatile: bool,
}

/// Mapping from cacheable class to its rule.
///
/// Per-extraction classes can never be admitted; `rule()` returns `None` for
/// them and for any class the policy leaves out.
#[derive(Debug, Clone)]
pub struct NamespacePolicy {
    rules: HashMap<ResourceClass, NamespaceRule>,
}

impl NamespacePolicy {
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Add or replace the rule for a class.
    pub fn with_rule(
        mut self,
        class: ResourceClass,
        ttl: Duration,
        volatile: bool,
    ) -> Result<Self, ConfigError> {
        if !class.is_cacheable() {
            return Err(ConfigError::Invalid(format!(
                "resource class '{}' is per-extraction and cannot be cached",
                class
            )));
        }
        self.rules.insert(class, NamespaceRule { ttl, volatile });
        Ok(self)
    }

    pub fn rule(&self, class: ResourceClass) -> Option<NamespaceRule> {
        self.rules.get(&class).copied()
    }

    pub fn is_volatile(&self, class: ResourceClass) -> bool {
        self.rule(class).is_some_and(|r| r.volatile)
    }
}

impl Default for NamespacePolicy {
    fn default() -> Self {
        let mut rules = HashMap::new();
        rules.insert(
            ResourceClass::Project,
            NamespaceRule {
                ttl: CacheTtl::PROJECT,
                volatile: false,
            },
        );
        rules.insert(
            ResourceClass::Environment,
            NamespaceRule {
                ttl: CacheTtl::ENVIRONMENT,
                volatile: false,
            },
        );
        rules.insert(
            ResourceClass::TestCatalog,
            NamespaceRule {
                ttl: CacheTtl::TEST_CATALOG,
                volatile: true,
            },
        );
        Self { rules }
    }
}
