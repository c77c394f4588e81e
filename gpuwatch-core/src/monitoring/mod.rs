//! Fleet GPU telemetry: query, parse, collect, aggregate
//!
//! Agentless: each host is asked for `nvidia-smi` CSV output over ssh. The
//! collector fans out across the fleet and returns a [`FleetSnapshot`];
//! the aggregate functions derive fleet means and idle reports from it.
//!
//! This module is presentation-free. Table and JSON rendering live in the
//! CLI crate.

mod aggregate;
pub mod collector;
mod metrics;
mod parser;
mod settings;

pub use aggregate::{
    DEFAULT_IDLE_THRESHOLD_PERCENT, host_stats, idle_report, summarize, summarize_default,
};
pub use collector::FleetCollector;
pub use metrics::{
    FleetMeans, FleetSnapshot, FleetSummary, GpuMetric, HostFailure, HostSnapshot, HostStats,
    IdleReport,
};
pub use parser::{GPU_QUERY_COMMAND, MetricsParser};
pub use settings::{
    CollectorSettings, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_SECS, MAX_CONCURRENCY,
    MAX_TIMEOUT_SECS,
};
pub use tokio_util::sync::CancellationToken;
