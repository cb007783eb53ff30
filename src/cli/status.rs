//! Status command implementation

use colored::Colorize;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::config::Config;
use crate::error::Result;
use crate::output::formatters::format_bytes;
use crate::storage::RecordStore;

/// Run the status command to display the resolved configuration
pub fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}\n", "JourneyVault Configuration Status".bold());

    let config_path = match opts.config_ref() {
        Some(path) => std::path::PathBuf::from(path),
        None => Config::default_path()?,
    };
    if config_path.exists() {
        println!("Config file: {}", config_path.display().to_string().cyan());
    } else {
        println!(
            "Config file: {} {}",
            config_path.display().to_string().cyan(),
            "(not found, using defaults)".dimmed()
        );
    }
    println!();

    let ctx = CommandContext::new(opts)?;
    let config = &ctx.config;
    let settings = ctx.retention_settings()?;

    if config.api_token.is_some() {
        println!("{} API token configured", "✓".green());
    } else {
        println!("{} API token not configured", "✗".red());
        println!("  → Set api_token in the config to use 'journeyvault fetch'");
    }

    match config.tenant_id.as_deref() {
        Some(tenant) => println!("{} Tenant: {}", "✓".green(), tenant),
        None => println!("{} No tenant set", "○".dimmed()),
    }

    if let Some(ref host) = config.api_host {
        println!("{} Custom API host: {}", "○".dimmed(), host.cyan());
    }

    println!();
    println!("{}", "Retention".bold());
    println!("  Strategy:         {}", settings.strategy.to_string().cyan());
    println!("  Day offset:       {}", settings.utc_offset);
    println!("  Cluster cap:      {}", settings.max_failure_clusters);
    println!("  History window:   {}", settings.history_window);

    println!();
    println!("{}", "Cache".bold());
    for (class, secs) in &config.cache.ttls {
        let volatile = if config.cache.volatile.contains(class) {
            " (volatile)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("  {:<17} {}s{}", format!("{}:", class), secs, volatile);
    }
    println!("  Max entries:      {}", config.cache.max_entries);
    println!(
        "  Memory budget:    {}",
        format_bytes(config.cache.max_memory_bytes)
    );
    if ctx.no_cache {
        println!("  {}", "Cache reads bypassed (--no-cache)".yellow());
    }

    println!();
    println!("{}", "Storage".bold());
    let store = ctx.store();
    println!("  Output dir:       {}", store.root().display());
    println!("  Journeys on disk: {}", store.journeys()?.len());
    println!("  Max concurrent:   {}", config.storage.max_concurrent);
    println!();

    Ok(())
}
