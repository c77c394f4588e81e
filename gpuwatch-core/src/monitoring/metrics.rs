//! Data models for fleet GPU telemetry
//!
//! All types are plain data and serializable so a presentation layer can
//! receive them across a thread or process boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, HostError};

/// One accelerator's snapshot, as reported by the diagnostic command
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GpuMetric {
    /// Ordinal on its host
    pub index: u32,
    /// Memory in use (MiB)
    pub memory_used: u64,
    /// Total memory (MiB); 0 only for a degenerate device reading
    pub memory_total: u64,
    /// GPU utilization (0–100)
    pub utilization: u8,
    /// Device name
    pub model: String,
}

impl GpuMetric {
    /// Returns memory usage as a percentage, or `None` if `memory_total` is 0
    #[must_use]
    pub fn memory_percent(&self) -> Option<f64> {
        if self.memory_total == 0 {
            return None;
        }
        Some(self.memory_used as f64 / self.memory_total as f64 * 100.0)
    }

    /// Free memory (MiB)
    #[must_use]
    pub const fn memory_free(&self) -> u64 {
        self.memory_total.saturating_sub(self.memory_used)
    }
}

/// Ordered accelerators of one host; empty means unreachable or none present
pub type HostSnapshot = Vec<GpuMetric>;

/// Why a host has an empty snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFailure {
    /// Coarse failure category
    pub kind: FailureKind,
    /// Human-readable cause
    pub message: String,
}

impl From<&HostError> for HostFailure {
    fn from(err: &HostError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of one collection cycle.
///
/// Every host alias passed to the collector appears in `hosts`, failed ones
/// with an empty snapshot and a matching entry in `failures`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    /// When the cycle finished
    pub collected_at: DateTime<Utc>,
    /// Per-host accelerators
    pub hosts: BTreeMap<String, HostSnapshot>,
    /// Failure side channel, keyed by alias
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<String, HostFailure>,
}

impl FleetSnapshot {
    /// Creates an empty snapshot stamped with the current time
    #[must_use]
    pub fn new() -> Self {
        Self {
            collected_at: Utc::now(),
            hosts: BTreeMap::new(),
            failures: BTreeMap::new(),
        }
    }

    /// Records a successfully collected host
    pub fn insert_success(&mut self, alias: impl Into<String>, gpus: HostSnapshot) {
        let alias = alias.into();
        self.failures.remove(&alias);
        self.hosts.insert(alias, gpus);
    }

    /// Records a failed host as an empty snapshot plus its failure
    pub fn insert_failure(&mut self, alias: impl Into<String>, err: &HostError) {
        let alias = alias.into();
        self.hosts.insert(alias.clone(), Vec::new());
        self.failures.insert(alias, HostFailure::from(err));
    }

    /// Accelerators of one host
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&HostSnapshot> {
        self.hosts.get(alias)
    }

    /// Failure recorded for one host
    #[must_use]
    pub fn failure(&self, alias: &str) -> Option<&HostFailure> {
        self.failures.get(alias)
    }

    /// Number of hosts in the snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns true if no host was collected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Returns true if there is at least one host and every host failed
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.hosts.is_empty() && self.failures.len() == self.hosts.len()
    }

    /// Every accelerator across the fleet
    pub fn metrics(&self) -> impl Iterator<Item = &GpuMetric> {
        self.hosts.values().flatten()
    }
}

impl Default for FleetSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-node summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostStats {
    /// Number of accelerators
    pub gpu_count: usize,
    /// Mean utilization (0–100)
    pub mean_utilization: f64,
    /// Sum of memory in use (MiB)
    pub memory_used: u64,
    /// Sum of total memory (MiB)
    pub memory_total: u64,
}

/// Fleet-wide means over every accelerator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetMeans {
    /// Mean memory in use (MiB)
    pub mean_memory_used: f64,
    /// Mean total memory (MiB)
    pub mean_memory_total: f64,
    /// Mean utilization (0–100)
    pub mean_utilization: f64,
}

/// A host with at least one idle accelerator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleReport {
    /// Host alias
    pub host: String,
    /// Idle accelerators
    pub idle_count: usize,
    /// Accelerators considered (devices with `memory_total == 0` excluded)
    pub total_count: usize,
    /// Representative device model (first idle device)
    pub model: String,
}

impl IdleReport {
    /// Renders `idle/total`, e.g. `1/2`
    #[must_use]
    pub fn ratio(&self) -> String {
        format!("{}/{}", self.idle_count, self.total_count)
    }
}

impl std::fmt::Display for IdleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} idle ({})", self.host, self.ratio(), self.model)
    }
}

/// Fleet-level statistics derived from a [`FleetSnapshot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    /// `None` when the fleet reported no accelerators at all
    pub means: Option<FleetMeans>,
    /// Hosts with idle accelerators, ordered by alias
    pub idle: Vec<IdleReport>,
}
