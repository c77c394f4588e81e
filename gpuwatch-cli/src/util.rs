//! Shared utility functions used across command modules.

use std::path::{Path, PathBuf};

use gpuwatch_core::config::FleetSettings;
use gpuwatch_core::monitoring::{CancellationToken, FleetSnapshot};
use gpuwatch_core::ssh_config::ConfigResolver;

use crate::error::CliError;

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    /// Fleet settings file
    pub fleet: PathBuf,
    /// `--ssh-config` override
    pub ssh_config: Option<PathBuf>,
    /// Whether table output may use ANSI colors
    pub color: bool,
}

impl Context {
    /// Loads the fleet file and applies the `--ssh-config` override
    pub fn load_settings(&self) -> Result<FleetSettings, CliError> {
        let mut settings = FleetSettings::load(&self.fleet)?;
        if let Some(ref path) = self.ssh_config {
            settings.ssh_config = Some(path.to_string_lossy().into_owned());
        }
        Ok(settings)
    }

    /// Resolver for commands that work without a fleet file.
    ///
    /// Precedence: `--ssh-config`, then the fleet file's `ssh_config` if the
    /// file exists, then `~/.ssh/config`.
    pub fn resolver(&self) -> Result<(ConfigResolver, Option<FleetSettings>), CliError> {
        if let Some(ref path) = self.ssh_config {
            let settings = self.optional_settings()?;
            return Ok((ConfigResolver::new(path), settings));
        }
        match self.optional_settings()? {
            Some(settings) => Ok((settings.resolver(), Some(settings))),
            None => Ok((ConfigResolver::from_default_location(), None)),
        }
    }

    fn optional_settings(&self) -> Result<Option<FleetSettings>, CliError> {
        if self.fleet.exists() {
            Ok(Some(FleetSettings::load(&self.fleet)?))
        } else {
            Ok(None)
        }
    }
}

/// Runs one collection cycle on a fresh runtime, cancelled by Ctrl-C
pub fn run_cycle(settings: &FleetSettings, hosts: &[String]) -> Result<FleetSnapshot, CliError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Runtime(format!("Failed to create async runtime: {e}")))?;
    let collector = settings.build_collector();
    let cancel = CancellationToken::new();

    let result = runtime.block_on(async {
        let trigger = cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling collection");
                trigger.cancel();
            }
        });

        let result = collector.collect_with_cancel(hosts, &cancel).await;
        interrupt.abort();
        result
    });

    Ok(result?)
}

/// Fails with exit code 2 when every host in the snapshot failed
pub fn ensure_reachable(snapshot: &FleetSnapshot) -> Result<(), CliError> {
    if snapshot.all_failed() {
        return Err(CliError::AllHostsFailed(snapshot.len()));
    }
    Ok(())
}
