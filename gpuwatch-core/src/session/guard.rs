//! Scoped ownership of a spawned session process

use std::process::ExitStatus;

use tokio::io::AsyncReadExt;
use tokio::process::Child;

/// Everything a finished session produced
#[derive(Debug)]
pub struct SessionOutput {
    /// Exit status of the local `ssh` process
    pub status: ExitStatus,
    /// Captured standard output
    pub stdout: Vec<u8>,
    /// Captured standard error
    pub stderr: Vec<u8>,
}

/// Owns a session child process and its process group.
///
/// The child is spawned as the leader of a new process group so the proxy
/// command it starts shares that group. Dropping the guard before
/// [`Self::finish`] completes kills the whole group, which covers failure,
/// timeout and cancellation alike.
pub struct SessionGuard {
    child: Child,
    pgid: Option<u32>,
    host: String,
    finished: bool,
}

impl SessionGuard {
    /// Takes ownership of a freshly spawned child
    #[must_use]
    pub fn new(child: Child, host: impl Into<String>) -> Self {
        let pgid = child.id();
        Self {
            child,
            pgid,
            host: host.into(),
            finished: false,
        }
    }

    /// Reads stdout and stderr to the end and waits for the process to exit.
    ///
    /// Once this returns `Ok` the leader has been reaped and every group
    /// member has closed the inherited pipes, so drop no longer signals the
    /// group.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading a pipe or waiting fails.
    pub async fn finish(&mut self) -> std::io::Result<SessionOutput> {
        let mut stdout_pipe = self.child.stdout.take();
        let mut stderr_pipe = self.child.stderr.take();

        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(pipe) = stdout_pipe.as_mut() {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        };
        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        };

        let (status, stdout, stderr) =
            tokio::try_join!(self.child.wait(), read_stdout, read_stderr)?;
        self.finished = true;

        Ok(SessionOutput {
            status,
            stdout,
            stderr,
        })
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // A reaped leader's pgid may be reused by an unrelated process.
        if self.finished {
            tracing::debug!(host = %self.host, "Session closed");
            return;
        }

        // The group may already be gone; errors are expected here.
        let _ = self.child.start_kill();

        #[cfg(unix)]
        if let Some(pgid) = self.pgid.and_then(|id| i32::try_from(id).ok()) {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
        }

        tracing::debug!(host = %self.host, "Session released");
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("host", &self.host)
            .field("pgid", &self.pgid)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
