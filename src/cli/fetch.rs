//! Fetch command implementation

use log::debug;
use serde::Serialize;

use crate::cache::CacheStats;
use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, FetchArgs, OutputFormat};
use crate::client::PlatformApi;
use crate::error::Result;
use crate::models::{ResourceDisplay, StatDisplay};
use crate::output::{Formattable, json};

#[derive(Serialize)]
struct FetchSummary<'a> {
    resources: &'a [ResourceDisplay],
    cache: CacheStats,
}

/// Run the fetch command: read-through lookups via the response cache
pub async fn run(opts: &GlobalOptions, args: &FetchArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let tenant = ctx.require_tenant()?.to_string();
    let client = ctx.cached_client()?;

    debug!(
        "Fetching {} {} resources for tenant {} over {} passes",
        args.ids.len(),
        args.class,
        tenant,
        args.passes
    );

    let mut resources = Vec::with_capacity(args.ids.len());
    for _ in 0..args.passes {
        client.begin_pass(&tenant);
        resources.clear();
        for id in &args.ids {
            let value = client.fetch_resource(&tenant, args.class, id).await?;
            resources.push(ResourceDisplay::new(args.class, id, value));
        }
    }

    let stats = client.cache().stats();
    match ctx.format {
        OutputFormat::Table => {
            resources.print(ctx.format)?;
            println!();
            StatDisplay::from_cache(&stats).print(ctx.format)?;
        }
        OutputFormat::Json => {
            let summary = FetchSummary {
                resources: &resources,
                cache: stats,
            };
            println!("{}", json::format_json(&summary)?);
        }
    }

    Ok(())
}
