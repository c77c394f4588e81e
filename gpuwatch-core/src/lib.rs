//! `GpuWatch` Core Library
//!
//! Agentless GPU telemetry for a fleet of ssh-reachable hosts.
//!
//! # Crate Structure
//!
//! - [`ssh_config`] - Resolves host aliases through the user's ssh client config
//! - [`session`] - Runs one remote command per short-lived ssh session
//! - [`monitoring`] - Parses `nvidia-smi` output, collects the fleet, aggregates
//! - [`config`] - Fleet settings file (host list and collector tuning)
//! - [`error`] - Error types per pipeline stage
//! - [`tracing`] - Structured logging setup

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod monitoring;
pub mod session;
pub mod ssh_config;
pub mod tracing;

pub use config::{DEFAULT_FLEET_FILE, FleetSettings};
pub use error::{
    CollectError, CollectResult, ConfigError, ConfigResult, FailureKind, HostError, ParseError,
    ParseResult, SessionError, SessionResult, SettingsError, SettingsResult,
};
pub use monitoring::{
    CancellationToken, CollectorSettings, FleetCollector, FleetMeans, FleetSnapshot, FleetSummary,
    GPU_QUERY_COMMAND, GpuMetric, HostFailure, HostSnapshot, IdleReport, MetricsParser, summarize,
    summarize_default,
};
pub use session::{RemoteExecutor, SshExecutor};
pub use ssh_config::{ConfigResolver, ConnectionParams, SshConfigFile};
pub use crate::tracing::{TracingConfig, TracingError, TracingLevel, TracingOutput, init_tracing};
