//! Global CLI options shared across all commands
//!
//! Collects the global flags into one struct so handlers take a single
//! parameter instead of threading each flag through.

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// CLI flag > environment variable > config file > default. This struct
/// captures the CLI/env layer; config file values are merged in
/// `CommandContext`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output format (table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.journeyvault/config.yaml)
    pub config: Option<String>,

    /// Tenant override (bypasses config file)
    pub tenant: Option<String>,

    /// Custom API host for development/testing
    pub api_host: Option<String>,

    /// Bypass cache and fetch fresh data from API
    pub no_cache: bool,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            tenant: cli.tenant.clone(),
            api_host: cli.api_host.clone(),
            no_cache: cli.no_cache,
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Get tenant override as `Option<&str>`.
    pub fn tenant_ref(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// Get API host override as `Option<&str>`.
    pub fn api_host_ref(&self) -> Option<&str> {
        self.api_host.as_deref()
    }
}
