//! Command execution context
//!
//! Loads and validates configuration once, applies CLI overrides, and builds
//! the engine, store and cached client the handlers need.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{CachedPlatformClient, ResponseCache};
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::PlatformClient;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::retention::{RetentionEngine, RetentionSettings};
use crate::storage::FileStore;

/// Context for command execution containing config and runtime options.
pub struct CommandContext {
    /// Loaded and validated configuration, with overrides applied
    pub config: Config,
    /// Output format preference
    pub format: OutputFormat,
    /// Whether cache reads are bypassed
    pub no_cache: bool,
}

impl CommandContext {
    /// Load config from path (or default location), apply overrides and
    /// validate every section.
    ///
    /// # Errors
    /// Returns error if the config cannot be loaded or any setting is invalid,
    /// including an unknown retention strategy.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let mut config = Config::load_at(opts.config_ref())?;

        if let Some(tenant) = opts.tenant_ref() {
            config.tenant_id = Some(tenant.to_string());
        }
        if let Some(host) = opts.api_host_ref() {
            config.api_host = Some(host.to_string());
        }

        config.validate()?;

        Ok(Self {
            config,
            format: opts.format,
            no_cache: opts.no_cache,
        })
    }

    /// Override the configured retention strategy, then re-validate
    pub fn with_strategy(mut self, strategy: Option<&str>) -> Result<Self> {
        if let Some(name) = strategy {
            self.config.retention.strategy = name.to_string();
            self.config.retention_settings()?;
        }
        Ok(self)
    }

    /// Override the configured output directory
    pub fn with_output_dir(mut self, output_dir: Option<&str>) -> Self {
        if let Some(dir) = output_dir {
            self.config.storage.output_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn retention_settings(&self) -> Result<RetentionSettings> {
        self.config.retention_settings()
    }

    pub fn engine(&self) -> Result<Arc<RetentionEngine>> {
        Ok(Arc::new(RetentionEngine::new(self.retention_settings()?)))
    }

    pub fn store(&self) -> Arc<FileStore> {
        Arc::new(FileStore::new(self.config.storage.output_dir.clone()))
    }

    /// Tenant for upstream calls, returning an error if not set
    pub fn require_tenant(&self) -> Result<&str> {
        self.config
            .tenant_id
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingTenant.into())
    }

    /// Authenticated platform client behind a fresh response cache
    pub fn cached_client(&self) -> Result<CachedPlatformClient<PlatformClient>> {
        self.config.validate_auth()?;
        let token = self.config.api_token.clone().unwrap_or_default();
        let inner = PlatformClient::new(token, self.config.api_host.as_deref())?;

        let cache = ResponseCache::new(
            self.config.policy()?,
            self.config.limits()?,
            Arc::new(SystemClock),
        )
        .with_force_fresh(self.no_cache);

        Ok(CachedPlatformClient::new(inner, Arc::new(cache)))
    }
}
