//! Configuration management for JourneyVault

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Local, Offset};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheLimits, CacheTtl, NamespacePolicy, ResourceClass};
use crate::error::{ConfigError, Result};
use crate::retention::{RetentionSettings, RetentionStrategy};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Platform API token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Platform API host override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,

    /// Default tenant (organization) id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheSection,

    /// Retention settings
    #[serde(default)]
    pub retention: RetentionSection,

    /// Output directory settings
    #[serde(default)]
    pub storage: StorageSection,
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    /// TTL in seconds per resource class
    #[serde(default = "default_ttls")]
    pub ttls: BTreeMap<String, u64>,

    /// Classes dropped by a volatile purge
    #[serde(default = "default_volatile")]
    pub volatile: Vec<String>,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_max_memory_bytes")]
    pub max_memory_bytes: usize,
}

fn default_ttls() -> BTreeMap<String, u64> {
    BTreeMap::from([
        (
            ResourceClass::Project.to_string(),
            CacheTtl::PROJECT.as_secs(),
        ),
        (
            ResourceClass::Environment.to_string(),
            CacheTtl::ENVIRONMENT.as_secs(),
        ),
        (
            ResourceClass::TestCatalog.to_string(),
            CacheTtl::TEST_CATALOG.as_secs(),
        ),
    ])
}

fn default_volatile() -> Vec<String> {
    vec![ResourceClass::TestCatalog.to_string()]
}

fn default_max_entries() -> usize {
    CacheLimits::default().max_entries
}

fn default_max_memory_bytes() -> usize {
    CacheLimits::default().max_memory_bytes
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttls: default_ttls(),
            volatile: default_volatile(),
            max_entries: default_max_entries(),
            max_memory_bytes: default_max_memory_bytes(),
        }
    }
}

/// Retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionSection {
    /// smart, all, failures, latest-n, daily or changes
    #[serde(default = "default_strategy")]
    pub strategy: String,

    #[serde(default = "default_latest_n")]
    pub latest_n: usize,

    #[serde(default = "default_daily_window_days")]
    pub daily_window_days: u32,

    /// Fixed offset such as "+02:00"; the local offset at startup when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<String>,

    /// Distinct failure kinds remembered per journey (0 = unbounded)
    #[serde(default = "default_max_failure_clusters")]
    pub max_failure_clusters: usize,

    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_strategy() -> String {
    "smart".to_string()
}

fn default_latest_n() -> usize {
    5
}

fn default_daily_window_days() -> u32 {
    1
}

fn default_max_failure_clusters() -> usize {
    256
}

fn default_history_window() -> usize {
    20
}

impl Default for RetentionSection {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            latest_n: default_latest_n(),
            daily_window_days: default_daily_window_days(),
            utc_offset: None,
            max_failure_clusters: default_max_failure_clusters(),
            history_window: default_history_window(),
        }
    }
}

/// Output directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Journeys processed concurrently by `retain`
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./journeyvault-output")
}

fn default_max_concurrent() -> usize {
    8
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".journeyvault").join("config.yaml"))
    }

    /// Load from an explicit path, or from the default path if it exists.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(PathBuf::from(p)),
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::load_from(default)
                } else {
                    log::debug!("No config at {}, using defaults", default.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path).into());
        }

        let contents = std::fs::read_to_string(&path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        std::fs::write(&path, contents)?;

        // Config holds the API token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Validate every section, failing before any work starts
    pub fn validate(&self) -> Result<()> {
        self.policy()?;
        self.limits()?;
        self.retention_settings()?;
        if self.storage.max_concurrent == 0 {
            return Err(invalid("storage.max_concurrent must be at least 1"));
        }
        Ok(())
    }

    /// Validate that an API token is present
    pub fn validate_auth(&self) -> Result<()> {
        match self.api_token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(()),
            _ => Err(ConfigError::MissingApiToken.into()),
        }
    }

    /// Per-class cache rules
    pub fn policy(&self) -> Result<NamespacePolicy> {
        let volatile = self
            .cache
            .volatile
            .iter()
            .map(|name| name.parse::<ResourceClass>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for class in &volatile {
            if !class.is_cacheable() {
                return Err(invalid(&format!(
                    "cache.volatile: '{}' is never cached",
                    class
                )));
            }
        }

        let mut policy = NamespacePolicy::new();
        for (name, secs) in &self.cache.ttls {
            let class: ResourceClass = name.parse()?;
            policy = policy.with_rule(
                class,
                Duration::from_secs(*secs),
                volatile.contains(&class),
            )?;
        }
        Ok(policy)
    }

    /// Cache budgets
    pub fn limits(&self) -> Result<CacheLimits> {
        if self.cache.max_entries == 0 {
            return Err(invalid("cache.max_entries must be at least 1"));
        }
        Ok(CacheLimits {
            max_entries: self.cache.max_entries,
            max_memory_bytes: self.cache.max_memory_bytes,
        })
    }

    /// Resolved retention settings; unknown strategies are rejected here
    pub fn retention_settings(&self) -> Result<RetentionSettings> {
        let section = &self.retention;
        if section.latest_n == 0 {
            return Err(invalid("retention.latest_n must be at least 1"));
        }
        if section.daily_window_days == 0 {
            return Err(invalid("retention.daily_window_days must be at least 1"));
        }

        let strategy = RetentionStrategy::from_name(
            &section.strategy,
            section.latest_n,
            section.daily_window_days,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let utc_offset = match section.utc_offset.as_deref() {
            Some(raw) => parse_utc_offset(raw)?,
            None => Local::now().offset().fix(),
        };

        Ok(RetentionSettings::new(strategy)
            .with_utc_offset(utc_offset)
            .with_max_failure_clusters(section.max_failure_clusters)
            .with_history_window(section.history_window))
    }
}

fn invalid(message: &str) -> crate::error::Error {
    ConfigError::Invalid(message.to_string()).into()
}

/// Parse "+HH:MM", "-HH:MM", "+HHMM" or "Z"
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| invalid("retention.utc_offset"));
    }

    let bad = || invalid(&format!("retention.utc_offset '{}' is not +HH:MM", raw));
    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(bad()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| bad())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| bad())?;
    if hours > 23 || minutes > 59 {
        return Err(bad());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(bad)
}
