//! Remote command execution over ssh
//!
//! Runs one command per session by spawning the system `ssh` client. Each
//! call creates and tears down its own process, so concurrent calls share
//! no state.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::Instrument;

use super::guard::SessionGuard;
use crate::error::{SessionError, SessionResult};
use crate::ssh_config::ConnectionParams;
use crate::trace_operation_debug;
use crate::tracing::span_names;

/// Default ssh client binary
pub const DEFAULT_SSH_PROGRAM: &str = "ssh";

/// Exit status `ssh` uses for its own failures (as opposed to the remote command's)
const SSH_ERROR_STATUS: i32 = 255;

/// Runs a single command on a remote host.
///
/// Implementations must release every resource they acquire before the
/// returned future completes or is dropped.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Executes `command` on the host described by `params` and returns its
    /// standard output.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] on connection failure, remote command
    /// failure, timeout, or undecodable output.
    async fn execute(
        &self,
        params: &ConnectionParams,
        command: &str,
        timeout: Duration,
    ) -> SessionResult<String>;
}

/// [`RemoteExecutor`] backed by the OpenSSH client binary
#[derive(Debug, Clone)]
pub struct SshExecutor {
    program: PathBuf,
}

impl SshExecutor {
    /// Executor using `ssh` from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(DEFAULT_SSH_PROGRAM)
    }

    /// Executor using a specific ssh client binary
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The ssh client binary this executor spawns
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds the argument list for one session.
    ///
    /// `-F none` keeps ssh from re-reading its config: the parameters were
    /// already resolved and are authoritative. ssh expands `%` tokens in
    /// `-i` and `ProxyCommand` again, so those values are re-escaped.
    #[must_use]
    pub fn build_args(params: &ConnectionParams, command: &str, timeout: Duration) -> Vec<String> {
        let connect_timeout = timeout.as_secs().max(1);
        let mut args: Vec<String> = vec![
            "-F".into(),
            "none".into(),
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            "StrictHostKeyChecking=accept-new".into(),
            "-o".into(),
            format!("ConnectTimeout={connect_timeout}"),
            "-p".into(),
            params.port.to_string(),
        ];

        if let Some(ref user) = params.username {
            args.push("-l".into());
            args.push(user.clone());
        }
        if let Some(ref key) = params.identity_file {
            args.push("-i".into());
            args.push(escape_percent(&key.to_string_lossy()));
        }
        if let Some(ref proxy) = params.proxy_command {
            args.push("-o".into());
            args.push(format!("ProxyCommand={}", escape_percent(proxy)));
        }

        args.push("--".into());
        args.push(params.hostname.clone());
        args.push(command.to_string());
        args
    }
}

/// Doubles every `%` so ssh's own token expansion yields the text unchanged
fn escape_percent(value: &str) -> String {
    value.replace('%', "%%")
}

impl Default for SshExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(
        &self,
        params: &ConnectionParams,
        command: &str,
        timeout: Duration,
    ) -> SessionResult<String> {
        let host = params.hostname.clone();

        let mut cmd = Command::new(&self.program);
        cmd.args(Self::build_args(params, command, timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| SessionError::Connection {
            host: host.clone(),
            reason: format!("failed to spawn {}: {e}", self.program.display()),
        })?;
        let mut session = SessionGuard::new(child, host.clone());

        tracing::debug!(
            host = %host,
            port = params.port,
            proxied = params.proxy_command.is_some(),
            "Session started"
        );

        let span = trace_operation_debug!(span_names::SESSION_EXECUTE, hostname = %host);
        let output = match tokio::time::timeout(timeout, session.finish().instrument(span)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(SessionError::Connection {
                    host,
                    reason: format!("session I/O failed: {e}"),
                });
            }
            Err(_) => return Err(SessionError::Timeout { host, timeout }),
        };
        drop(session);

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match output.status.code() {
            Some(0) => String::from_utf8(output.stdout).map_err(|e| SessionError::InvalidOutput {
                host,
                reason: e.to_string(),
            }),
            Some(SSH_ERROR_STATUS) => Err(SessionError::Connection {
                host,
                reason: if stderr.is_empty() {
                    "ssh exited with status 255".to_string()
                } else {
                    stderr
                },
            }),
            Some(status) => Err(SessionError::CommandFailed {
                host,
                status,
                stderr,
            }),
            None => Err(SessionError::Connection {
                host,
                reason: "ssh terminated by signal".to_string(),
            }),
        }
    }
}
