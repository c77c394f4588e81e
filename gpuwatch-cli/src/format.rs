//! Table rendering for snapshots and summaries.

use std::fmt::Write as _;

use gpuwatch_core::monitoring::{FleetSnapshot, FleetSummary, host_stats};

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// ANSI styling that can be switched off
#[derive(Debug, Clone, Copy)]
pub struct Style {
    color: bool,
}

impl Style {
    /// Styling with or without colors
    #[must_use]
    pub const fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Formats every host's accelerators, failed hosts last
#[must_use]
pub fn format_snapshot(snapshot: &FleetSnapshot, style: Style) -> String {
    if snapshot.is_empty() {
        return "No hosts polled.".to_string();
    }

    let mut output = String::new();
    let host_width = snapshot.hosts.keys().map(String::len).max().unwrap_or(4).max(4);
    let model_width = snapshot
        .metrics()
        .map(|g| g.model.len())
        .max()
        .unwrap_or(5)
        .max(5);

    let _ = writeln!(
        output,
        "{}",
        style.paint(
            BOLD,
            &format!(
                "{:<host_width$}  {:>3}  {:<model_width$}  {:>17}  {:>6}  {:>4}",
                "HOST", "GPU", "MODEL", "MEMORY (MiB)", "MEM%", "UTIL"
            )
        )
    );

    for (host, gpus) in &snapshot.hosts {
        if snapshot.failure(host).is_some() {
            continue;
        }
        if gpus.is_empty() {
            let _ = writeln!(output, "{host:<host_width$}  {:>3}  no accelerators", "-");
            continue;
        }
        for gpu in gpus {
            let memory = format!("{}/{}", gpu.memory_used, gpu.memory_total);
            let percent = gpu
                .memory_percent()
                .map_or_else(|| "n/a".to_string(), |p| format!("{p:.1}%"));
            let _ = writeln!(
                output,
                "{host:<host_width$}  {:>3}  {:<model_width$}  {memory:>17}  {percent:>6}  {:>3}%",
                gpu.index, gpu.model, gpu.utilization
            );
        }
        if let Some(stats) = host_stats(gpus).filter(|s| s.gpu_count > 1) {
            let _ = writeln!(
                output,
                "{:<host_width$}  {:>3}  {:<model_width$}  {:>17}  {:>6}  {:>3.0}%",
                "",
                "all",
                "",
                format!("{}/{}", stats.memory_used, stats.memory_total),
                "",
                stats.mean_utilization
            );
        }
    }

    if !snapshot.failures.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "{}", style.paint(BOLD, "Failed hosts:"));
        for (host, failure) in &snapshot.failures {
            let _ = writeln!(
                output,
                "  {} {}",
                style.paint(RED, &format!("✗ {host}")),
                style.paint(YELLOW, &format!("[{}] {}", failure.kind, failure.message))
            );
        }
    }

    output.trim_end().to_string()
}

/// Formats one host, or the no-data message if it reported nothing
#[must_use]
pub fn format_host(snapshot: &FleetSnapshot, alias: &str, style: Style) -> String {
    match snapshot.get(alias) {
        Some(gpus) if !gpus.is_empty() => format_snapshot(snapshot, style),
        _ => {
            let mut message = format!("No data available for {alias}");
            if let Some(failure) = snapshot.failure(alias) {
                let _ = write!(message, " ({}: {})", failure.kind, failure.message);
            }
            message
        }
    }
}

/// Formats fleet means and idle reports
#[must_use]
pub fn format_summary(
    snapshot: &FleetSnapshot,
    summary: &FleetSummary,
    threshold: f64,
    style: Style,
) -> String {
    let Some(ref means) = summary.means else {
        return "No data available from any instance".to_string();
    };

    let mut output = String::new();
    let reporting = snapshot.hosts.len() - snapshot.failures.len();
    let _ = writeln!(
        output,
        "{}",
        style.paint(
            BOLD,
            &format!(
                "Fleet-wide GPU usage ({} accelerators on {reporting} of {} hosts)",
                snapshot.metrics().count(),
                snapshot.len()
            )
        )
    );
    let _ = writeln!(output, "  Mean memory used:  {:.1} MiB", means.mean_memory_used);
    let _ = writeln!(output, "  Mean memory total: {:.1} MiB", means.mean_memory_total);
    let _ = writeln!(output, "  Mean utilization:  {:.1}%", means.mean_utilization);
    let _ = writeln!(output);

    let _ = writeln!(
        output,
        "{}",
        style.paint(BOLD, &format!("Idle accelerators (memory < {threshold}%):"))
    );
    if summary.idle.is_empty() {
        let _ = writeln!(output, "  none");
    }
    for report in &summary.idle {
        let _ = writeln!(output, "  {report}");
    }

    if !snapshot.failures.is_empty() {
        let hosts: Vec<&str> = snapshot.failures.keys().map(String::as_str).collect();
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "{}",
            style.paint(RED, &format!("Unreachable: {}", hosts.join(", ")))
        );
    }

    output.trim_end().to_string()
}
