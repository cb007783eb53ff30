//! CLI command definitions and handlers

use clap::{Args, Parser, Subcommand};

use crate::cache::ResourceClass;

pub mod args;
pub mod context;
pub mod fetch;
pub mod init;
pub mod rebuild;
pub mod retain;
pub mod status;

pub use args::OutputFormat;
pub use context::CommandContext;

/// JourneyVault - keeps a bounded, deduplicated history of test-journey executions
#[derive(Parser, Debug)]
#[command(name = "journeyvault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "JOURNEYVAULT_FORMAT",
        default_value = "table",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "JOURNEYVAULT_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override the configured tenant
    #[arg(long, global = true, env = "JOURNEYVAULT_TENANT", hide_env = true)]
    pub tenant: Option<String>,

    /// Custom API host for development/testing
    #[arg(long, global = true, env = "JOURNEYVAULT_API_HOST", hide_env = true)]
    pub api_host: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "JOURNEYVAULT_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Bypass the response cache, always fetching fresh data
    #[arg(long, global = true, env = "JOURNEYVAULT_NO_CACHE", hide_env = true)]
    pub no_cache: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Show the resolved configuration
    Status,

    /// Display version information
    Version,

    /// Apply the retention strategy to exported executions
    Retain(RetainArgs),

    /// Rebuild retention state from the output directory and report it
    Rebuild(RebuildArgs),

    /// Fetch upstream resources through the response cache
    Fetch(FetchArgs),
}

/// Arguments for `retain`
#[derive(Debug, Clone, Args)]
pub struct RetainArgs {
    /// JSON files, each holding an array of executions
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Override the configured retention strategy
    #[arg(long)]
    pub strategy: Option<String>,

    /// Override the configured output directory
    #[arg(long)]
    pub output_dir: Option<String>,
}

/// Arguments for `rebuild`
#[derive(Debug, Clone, Args)]
pub struct RebuildArgs {
    /// Only rebuild this journey
    #[arg(long)]
    pub journey: Option<String>,

    /// Override the configured output directory
    #[arg(long)]
    pub output_dir: Option<String>,
}

/// Arguments for `fetch`
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// Resource class (project, environment, test-catalog, journey, execution)
    #[arg(value_parser = parse_resource_class)]
    pub class: ResourceClass,

    /// Resource ids; repeated ids are served from the cache
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Extraction passes over the ids; each pass refetches volatile classes
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub passes: u32,
}

fn parse_resource_class(raw: &str) -> std::result::Result<ResourceClass, String> {
    raw.parse().map_err(|e: crate::error::ConfigError| e.to_string())
}
