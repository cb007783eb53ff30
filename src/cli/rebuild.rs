//! Rebuild command implementation

use log::debug;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat, RebuildArgs};
use crate::error::Result;
use crate::models::SnapshotDisplay;
use crate::output::{Formattable, json};
use crate::storage::RecordStore;

/// Run the rebuild command: replay persisted records and report the state
pub fn run(opts: &GlobalOptions, args: &RebuildArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?.with_output_dir(args.output_dir.as_deref());
    let settings = ctx.retention_settings()?;
    let engine = ctx.engine()?;
    let store = ctx.store();

    let journeys = match &args.journey {
        Some(journey) => vec![journey.clone()],
        None => store.journeys()?,
    };
    debug!(
        "Rebuilding {} journeys from {}",
        journeys.len(),
        store.root().display()
    );

    for journey_id in &journeys {
        let persisted = store.scan_journey(journey_id)?;
        engine.rebuild(journey_id, &persisted)?;
    }

    let snapshots = match &args.journey {
        Some(journey_id) => engine.snapshot(journey_id).into_iter().collect(),
        None => engine.snapshots(),
    };

    match ctx.format {
        OutputFormat::Table => {
            let rows: Vec<SnapshotDisplay> = snapshots
                .iter()
                .map(|s| SnapshotDisplay::new(s, settings.utc_offset))
                .collect();
            rows.print(ctx.format)?;
        }
        OutputFormat::Json => println!("{}", json::format_json(&snapshots)?),
    }

    Ok(())
}
