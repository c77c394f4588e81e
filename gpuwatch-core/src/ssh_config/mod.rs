//! Connection parameter resolution from the user's ssh client config
//!
//! Reads `~/.ssh/config` (or a caller-supplied file), matches `Host` blocks
//! against an alias and produces [`ConnectionParams`] with OpenSSH's
//! first-value-wins semantics. A missing file is not an error.

mod parser;
mod resolver;

pub use parser::{BlockCriteria, Directive, HostBlock, HostEntry, HostPattern, SshConfigFile};
pub use resolver::{ConfigResolver, ConnectionParams, DEFAULT_SSH_PORT, default_config_path};
