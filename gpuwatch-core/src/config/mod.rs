//! Fleet settings file
//!
//! The fleet is described by a YAML (or TOML, by extension) file listing
//! the ssh aliases to poll plus collector tuning:
//!
//! ```yaml
//! instances:
//!   - gpu-01
//!   - gpu-02
//! timeout_secs: 10
//! concurrency: 8
//! idle_threshold_percent: 5.0
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{SettingsError, SettingsResult};
use crate::monitoring::{
    CollectorSettings, DEFAULT_CONCURRENCY, DEFAULT_IDLE_THRESHOLD_PERCENT, DEFAULT_TIMEOUT_SECS,
    FleetCollector,
};
use crate::session::{DEFAULT_SSH_PROGRAM, SshExecutor};
use crate::ssh_config::{ConfigResolver, default_config_path};
use crate::tracing::span_names;

/// Default fleet file name, looked up in the working directory
pub const DEFAULT_FLEET_FILE: &str = "fleet.yaml";

/// Contents of the fleet settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSettings {
    /// Host aliases to poll
    pub instances: Vec<String>,
    /// ssh client config; `~` is expanded, defaults to `~/.ssh/config`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_config: Option<String>,
    /// Per-host session timeout in seconds (1–300)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Hosts polled concurrently (1–64)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Memory-usage percentage below which a device counts as idle
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_percent: f64,
    /// ssh client binary
    #[serde(default = "default_ssh_program")]
    pub ssh_program: String,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

const fn default_idle_threshold() -> f64 {
    DEFAULT_IDLE_THRESHOLD_PERCENT
}

fn default_ssh_program() -> String {
    DEFAULT_SSH_PROGRAM.to_string()
}

impl FleetSettings {
    /// Settings for the given hosts with every other field defaulted
    #[must_use]
    pub fn with_instances(instances: Vec<String>) -> Self {
        Self {
            instances,
            ssh_config: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            idle_threshold_percent: DEFAULT_IDLE_THRESHOLD_PERCENT,
            ssh_program: default_ssh_program(),
        }
    }

    /// Loads and validates the settings file.
    ///
    /// Files ending in `.toml` are read as TOML, everything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable, does not
    /// deserialize, or fails [`Self::validate`].
    pub fn load(path: &Path) -> SettingsResult<Self> {
        let _span = tracing::debug_span!(span_names::SETTINGS_LOAD, path = %path.display()).entered();

        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let settings = if is_toml {
            Self::from_toml(&content).map_err(|source| SettingsError::Toml {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Self::from_yaml(&content).map_err(|source| SettingsError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        };

        settings.validate()?;
        tracing::debug!(instances = settings.instances.len(), "Fleet settings loaded");
        Ok(settings)
    }

    /// Parses YAML without validating
    ///
    /// # Errors
    ///
    /// Returns the deserializer error.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Parses TOML without validating
    ///
    /// # Errors
    ///
    /// Returns the deserializer error.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Checks the settings are usable
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for an empty or blank instance
    /// list entry, or a negative or non-finite idle threshold.
    pub fn validate(&self) -> SettingsResult<()> {
        if self.instances.is_empty() {
            return Err(SettingsError::Invalid("instance list is empty".into()));
        }
        if let Some(pos) = self.instances.iter().position(|h| h.trim().is_empty()) {
            return Err(SettingsError::Invalid(format!(
                "instance #{} is blank",
                pos + 1
            )));
        }
        if !self.idle_threshold_percent.is_finite() || self.idle_threshold_percent < 0.0 {
            return Err(SettingsError::Invalid(format!(
                "idle_threshold_percent must be a non-negative number, got {}",
                self.idle_threshold_percent
            )));
        }
        if self.ssh_program.trim().is_empty() {
            return Err(SettingsError::Invalid("ssh_program is empty".into()));
        }
        Ok(())
    }

    /// Timeout and concurrency for the collector
    #[must_use]
    pub const fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            timeout_secs: self.timeout_secs,
            concurrency: self.concurrency,
        }
    }

    /// ssh client config path with `~` and `$VAR` expanded.
    ///
    /// Falls back to `~/.ssh/config`; `None` only when no home directory
    /// is known.
    #[must_use]
    pub fn ssh_config_path(&self) -> Option<PathBuf> {
        match &self.ssh_config {
            Some(raw) => Some(PathBuf::from(
                shellexpand::full(raw)
                    .map_or_else(|_| shellexpand::tilde(raw), |expanded| expanded)
                    .into_owned(),
            )),
            None => default_config_path(),
        }
    }

    /// Resolver reading [`Self::ssh_config_path`]
    #[must_use]
    pub fn resolver(&self) -> ConfigResolver {
        self.ssh_config_path()
            .map_or_else(ConfigResolver::disabled, ConfigResolver::new)
    }

    /// Collector using the configured ssh binary
    #[must_use]
    pub fn build_collector(&self) -> FleetCollector {
        FleetCollector::with_settings(
            self.resolver(),
            Arc::new(SshExecutor::with_program(&self.ssh_program)),
            &self.collector_settings(),
        )
    }
}
