//! Retain command implementation

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use serde::Serialize;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat, RetainArgs};
use crate::error::{Error, Result};
use crate::models::{JourneyReportDisplay, StatDisplay};
use crate::output::{Formattable, json};
use crate::retention::{
    ExecutionRecord, JourneyReport, RawExecution, RetentionStats, VolatileTextNormalizer,
    group_by_journey, process_journeys,
};
use crate::storage::RecordStore;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetainSummary<'a> {
    strategy: &'a str,
    journeys: &'a [JourneyReport],
    stats: RetentionStats,
}

/// Run the retain command
pub async fn run(opts: &GlobalOptions, args: &RetainArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?
        .with_strategy(args.strategy.as_deref())?
        .with_output_dir(args.output_dir.as_deref());

    let mut records = Vec::new();
    for file in &args.files {
        records.extend(load_records(Path::new(file))?);
    }
    debug!("Loaded {} executions from {} files", records.len(), args.files.len());

    let batches = group_by_journey(records);
    let engine = ctx.engine()?;
    let store = ctx.store();

    for journey_id in batches.keys() {
        let persisted = store.scan_journey(journey_id)?;
        engine.rebuild(journey_id, &persisted)?;
    }

    let spinner = progress_spinner(ctx.format, batches.len());
    let reports = process_journeys(
        engine.clone(),
        store,
        batches,
        ctx.config.storage.max_concurrent,
    )
    .await;
    spinner.finish_and_clear();
    let reports = reports?;

    let stats = engine.stats();
    match ctx.format {
        OutputFormat::Table => {
            let rows: Vec<JourneyReportDisplay> = reports.iter().map(Into::into).collect();
            rows.print(ctx.format)?;
            println!();
            println!("Strategy: {}", engine.strategy());
            StatDisplay::from_retention(&stats).print(ctx.format)?;
        }
        OutputFormat::Json => {
            let summary = RetainSummary {
                strategy: engine.strategy().name(),
                journeys: &reports,
                stats,
            };
            println!("{}", json::format_json(&summary)?);
        }
    }

    Ok(())
}

/// Read one export file: a JSON array of executions
pub fn load_records(path: &Path) -> Result<Vec<ExecutionRecord>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Other(format!("Cannot read {}: {}", path.display(), e)))?;
    let raw: Vec<RawExecution> = serde_json::from_str(&contents)
        .map_err(|e| Error::Other(format!("Invalid executions in {}: {}", path.display(), e)))?;

    let normalizer = VolatileTextNormalizer;
    Ok(raw
        .into_iter()
        .map(|r| r.into_record(&normalizer))
        .collect())
}

fn progress_spinner(format: OutputFormat, journeys: usize) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Applying retention to {} journeys", journeys));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::record::Outcome;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_records() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"journeyId": "Demo Test", "executionId": 1, "outcome": "PASS", "startedAt": "2025-08-13T01:00:00Z"}},
                {{"journeyId": "Demo Test", "executionId": 2, "outcome": "FAIL", "startedAt": "2025-08-13T14:00:00Z",
                  "failure": {{"stepId": "step-4", "message": "Timeout after 3000ms"}}}}
            ]"#
        )
        .unwrap();

        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].outcome, Outcome::Fail);
        assert!(records[1].failure_signature.is_some());
    }

    #[test]
    fn test_load_records_reports_path_on_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"not\": \"an array\"}}").unwrap();

        let err = load_records(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid executions"));
    }

    #[test]
    fn test_load_records_missing_file() {
        assert!(load_records(Path::new("/nonexistent/executions.json")).is_err());
    }
}
