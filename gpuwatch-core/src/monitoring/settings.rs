//! Collector tuning: per-host timeout and fan-out bound

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-host session timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of hosts polled at once
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Upper bound on concurrent sessions, to stay under sshd `MaxStartups`
pub const MAX_CONCURRENCY: usize = 64;

/// Upper bound on the per-host timeout (seconds)
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Settings for one [`super::FleetCollector`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorSettings {
    /// Per-host session timeout in seconds (1–300, default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Hosts polled concurrently (1–64, default: 8)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl CollectorSettings {
    /// Returns the timeout clamped to the valid range
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(1, MAX_TIMEOUT_SECS))
    }

    /// Returns the concurrency clamped to the valid range
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}
