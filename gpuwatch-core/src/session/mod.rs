//! Remote sessions: one short-lived ssh process per command
//!
//! [`RemoteExecutor`] is the seam the fleet collector depends on;
//! [`SshExecutor`] is the production implementation. Sessions are never
//! reused between calls.

mod executor;
mod guard;

pub use executor::{DEFAULT_SSH_PROGRAM, RemoteExecutor, SshExecutor};
pub use guard::{SessionGuard, SessionOutput};
