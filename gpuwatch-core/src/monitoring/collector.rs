//! Fleet collector: one poll cycle across every host
//!
//! Each host is resolved, queried with [`GPU_QUERY_COMMAND`] and parsed on
//! its own. A failure at any stage is confined to that host's entry; the
//! cycle itself only fails when the caller cancels it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::metrics::{FleetSnapshot, HostSnapshot};
use super::parser::{GPU_QUERY_COMMAND, MetricsParser};
use super::settings::{CollectorSettings, MAX_CONCURRENCY};
use crate::error::{CollectError, CollectResult, ConfigResult, HostError, SessionError};
use crate::session::{RemoteExecutor, SshExecutor};
use crate::ssh_config::{ConfigResolver, SshConfigFile};
use crate::tracing::span_names;
use crate::trace_operation;

/// Slack given to an executor to report its own timeout before the
/// collector drops the session
const TIMEOUT_GRACE: Duration = Duration::from_millis(500);

/// Polls a fleet of hosts with bounded concurrency
pub struct FleetCollector {
    resolver: ConfigResolver,
    executor: Arc<dyn RemoteExecutor>,
    timeout: Duration,
    concurrency: usize,
}

impl FleetCollector {
    /// Creates a collector with default settings
    #[must_use]
    pub fn new(resolver: ConfigResolver, executor: Arc<dyn RemoteExecutor>) -> Self {
        Self::with_settings(resolver, executor, &CollectorSettings::default())
    }

    /// Creates a collector from explicit settings
    #[must_use]
    pub fn with_settings(
        resolver: ConfigResolver,
        executor: Arc<dyn RemoteExecutor>,
        settings: &CollectorSettings,
    ) -> Self {
        Self {
            resolver,
            executor,
            timeout: settings.timeout(),
            concurrency: settings.effective_concurrency(),
        }
    }

    /// Creates a collector that talks to hosts through the `ssh` binary
    #[must_use]
    pub fn over_ssh(resolver: ConfigResolver, settings: &CollectorSettings) -> Self {
        Self::with_settings(resolver, Arc::new(SshExecutor::new()), settings)
    }

    /// Sets the per-host timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum number of concurrent sessions (clamped to 1–64)
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Gets the per-host timeout
    #[must_use]
    pub const fn get_timeout(&self) -> Duration {
        self.timeout
    }

    /// Gets the concurrency bound
    #[must_use]
    pub const fn get_concurrency(&self) -> usize {
        self.concurrency
    }

    /// Gets the resolver
    #[must_use]
    pub const fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    /// Runs one collection cycle.
    ///
    /// The ssh config is read once for this cycle. The returned snapshot has
    /// exactly one entry per distinct alias in `hosts`.
    pub async fn collect(&self, hosts: &[String]) -> FleetSnapshot {
        let aliases = dedup_aliases(hosts);
        let span = trace_operation!(span_names::FLEET_COLLECT, host_count = aliases.len());

        async move {
            let ssh_config = self.resolver.load();
            if let Err(ref err) = ssh_config {
                tracing::warn!(error = %err, "ssh config unusable, every host will fail");
            }

            let outcomes: Vec<(String, Result<HostSnapshot, HostError>)> = stream::iter(aliases)
                .map(|alias| {
                    let ssh_config = &ssh_config;
                    async move {
                        let span = tracing::info_span!(span_names::HOST_COLLECT, host = %alias);
                        let outcome = self.collect_host(&alias, ssh_config).instrument(span).await;
                        (alias, outcome)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            let mut snapshot = FleetSnapshot::new();
            for (alias, outcome) in outcomes {
                match outcome {
                    Ok(gpus) => {
                        tracing::debug!(host = %alias, gpu_count = gpus.len(), "Host collected");
                        snapshot.insert_success(alias, gpus);
                    }
                    Err(err) => {
                        tracing::warn!(
                            host = %alias,
                            kind = %err.kind(),
                            error = %err,
                            "Host collection failed"
                        );
                        snapshot.insert_failure(alias, &err);
                    }
                }
            }

            tracing::info!(
                hosts = snapshot.len(),
                failed = snapshot.failures.len(),
                "Fleet collection complete"
            );
            snapshot
        }
        .instrument(span)
        .await
    }

    /// Runs one collection cycle that stops when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Cancelled`] if the token is cancelled before
    /// the cycle completes. By then every in-flight session has been
    /// dropped and its process group killed.
    pub async fn collect_with_cancel(
        &self,
        hosts: &[String],
        cancel: &CancellationToken,
    ) -> CollectResult<FleetSnapshot> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::info!("Fleet collection cancelled");
                Err(CollectError::Cancelled)
            }
            snapshot = self.collect(hosts) => Ok(snapshot),
        }
    }

    /// Resolve, execute, parse: the three stages for one host
    async fn collect_host(
        &self,
        alias: &str,
        ssh_config: &ConfigResult<SshConfigFile>,
    ) -> Result<HostSnapshot, HostError> {
        let params = ssh_config.as_ref().map_err(Clone::clone)?.resolve(alias);

        let execution = self
            .executor
            .execute(&params, GPU_QUERY_COMMAND, self.timeout);
        let raw = match tokio::time::timeout(self.timeout + TIMEOUT_GRACE, execution).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SessionError::Timeout {
                    host: params.hostname.clone(),
                    timeout: self.timeout,
                }
                .into());
            }
        };

        Ok(MetricsParser::parse(&raw)?)
    }
}

impl std::fmt::Debug for FleetCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetCollector")
            .field("resolver", &self.resolver)
            .field("timeout", &self.timeout)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

/// Keeps the first occurrence of each alias, in input order
fn dedup_aliases(hosts: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(hosts.len());
    hosts
        .iter()
        .filter(|alias| {
            let fresh = seen.insert(alias.as_str());
            if !fresh {
                tracing::warn!(host = %alias, "Duplicate host alias ignored");
            }
            fresh
        })
        .cloned()
        .collect()
}

impl Default for FleetCollector {
    fn default() -> Self {
        Self::new(ConfigResolver::default(), Arc::new(SshExecutor::new()))
    }
}
