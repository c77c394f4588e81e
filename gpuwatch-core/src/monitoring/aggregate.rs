//! Fleet-wide statistics from a [`FleetSnapshot`]
//!
//! Pure functions: the same snapshot always yields the same summary.

use super::metrics::{FleetMeans, FleetSnapshot, FleetSummary, GpuMetric, HostStats, IdleReport};

/// Memory-usage percentage below which an accelerator counts as idle
pub const DEFAULT_IDLE_THRESHOLD_PERCENT: f64 = 5.0;

/// Summarizes a snapshot with [`DEFAULT_IDLE_THRESHOLD_PERCENT`]
#[must_use]
pub fn summarize_default(snapshot: &FleetSnapshot) -> FleetSummary {
    summarize(snapshot, DEFAULT_IDLE_THRESHOLD_PERCENT)
}

/// Summarizes a snapshot.
///
/// Means are taken over every accelerator in the fleet and are `None` when
/// there are none. Idle reports list, in alias order, each host with at
/// least one device whose memory usage is below `idle_threshold_percent`.
#[must_use]
pub fn summarize(snapshot: &FleetSnapshot, idle_threshold_percent: f64) -> FleetSummary {
    let idle = snapshot
        .hosts
        .iter()
        .filter_map(|(host, gpus)| idle_report(host, gpus, idle_threshold_percent))
        .collect();

    FleetSummary {
        means: fleet_means(snapshot.metrics()),
        idle,
    }
}

fn fleet_means<'a>(metrics: impl Iterator<Item = &'a GpuMetric>) -> Option<FleetMeans> {
    let mut count: u64 = 0;
    let mut used: u128 = 0;
    let mut total: u128 = 0;
    let mut utilization: u128 = 0;

    for gpu in metrics {
        count += 1;
        used += u128::from(gpu.memory_used);
        total += u128::from(gpu.memory_total);
        utilization += u128::from(gpu.utilization);
    }

    if count == 0 {
        return None;
    }

    let n = count as f64;
    Some(FleetMeans {
        mean_memory_used: used as f64 / n,
        mean_memory_total: total as f64 / n,
        mean_utilization: utilization as f64 / n,
    })
}

/// Idle report for one host, or `None` if nothing on it is idle.
///
/// Devices reporting `memory_total == 0` are left out of both counts.
#[must_use]
pub fn idle_report(host: &str, gpus: &[GpuMetric], idle_threshold_percent: f64) -> Option<IdleReport> {
    let mut total_count = 0;
    let mut idle_count = 0;
    let mut model: Option<&str> = None;

    for gpu in gpus {
        let Some(percent) = gpu.memory_percent() else {
            continue;
        };
        total_count += 1;
        if percent < idle_threshold_percent {
            idle_count += 1;
            model.get_or_insert(gpu.model.as_str());
        }
    }

    if idle_count == 0 {
        return None;
    }

    Some(IdleReport {
        host: host.to_string(),
        idle_count,
        total_count,
        model: model.unwrap_or_default().to_string(),
    })
}

/// Per-node summary, `None` for a host without accelerators
#[must_use]
pub fn host_stats(gpus: &[GpuMetric]) -> Option<HostStats> {
    if gpus.is_empty() {
        return None;
    }

    let utilization: u64 = gpus.iter().map(|g| u64::from(g.utilization)).sum();
    Some(HostStats {
        gpu_count: gpus.len(),
        mean_utilization: utilization as f64 / gpus.len() as f64,
        memory_used: gpus.iter().map(|g| g.memory_used).fold(0, u64::saturating_add),
        memory_total: gpus.iter().map(|g| g.memory_total).fold(0, u64::saturating_add),
    })
}
