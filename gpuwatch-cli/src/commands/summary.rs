//! One collection cycle, reduced to fleet statistics.

use chrono::{DateTime, Utc};
use gpuwatch_core::monitoring::{FleetMeans, HostFailure, IdleReport, summarize};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::format::{Style, format_summary};
use crate::util::{Context, ensure_reachable, run_cycle};

/// JSON shape of the summary command
#[derive(Debug, Serialize)]
struct SummaryReport<'a> {
    collected_at: DateTime<Utc>,
    hosts: usize,
    accelerators: usize,
    idle_threshold_percent: f64,
    means: Option<&'a FleetMeans>,
    idle: &'a [IdleReport],
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    failures: &'a BTreeMap<String, HostFailure>,
}

/// Summary command handler
pub fn cmd_summary(
    ctx: &Context,
    threshold: Option<f64>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let mut settings = ctx.load_settings()?;
    if let Some(threshold) = threshold {
        settings.idle_threshold_percent = threshold;
        settings.validate()?;
    }
    let threshold = settings.idle_threshold_percent;

    let snapshot = run_cycle(&settings, &settings.instances)?;
    let summary = summarize(&snapshot, threshold);

    match format {
        OutputFormat::Json => {
            let report = SummaryReport {
                collected_at: snapshot.collected_at,
                hosts: snapshot.len(),
                accelerators: snapshot.metrics().count(),
                idle_threshold_percent: threshold,
                means: summary.means.as_ref(),
                idle: &summary.idle,
                failures: &snapshot.failures,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => println!(
            "{}",
            format_summary(&snapshot, &summary, threshold, Style::new(ctx.color))
        ),
    }

    ensure_reachable(&snapshot)
}
