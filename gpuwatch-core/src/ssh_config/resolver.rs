//! Effective connection parameters for a host alias

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::parser::{HostEntry, SshConfigFile};
use crate::error::ConfigResult;
use crate::tracing::span_names;

/// Default ssh port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Connection parameters resolved for one host alias.
///
/// Built fresh on every collection cycle; never cached across cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// The alias the caller asked for
    pub alias: String,
    /// Real hostname or IP
    pub hostname: String,
    /// Remote user; `None` leaves the choice to the transport
    pub username: Option<String>,
    /// Remote port
    pub port: u16,
    /// Private key file, first `IdentityFile` obtained
    pub identity_file: Option<PathBuf>,
    /// Proxy command the transport tunnels through
    pub proxy_command: Option<String>,
}

impl ConnectionParams {
    /// Parameters for an alias with no config at all
    #[must_use]
    pub fn for_alias(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            hostname: alias.clone(),
            alias,
            username: None,
            port: DEFAULT_SSH_PORT,
            identity_file: None,
            proxy_command: None,
        }
    }

    /// Applies defaults and `%` token expansion to a raw lookup result
    #[must_use]
    pub fn from_entry(alias: &str, entry: HostEntry) -> Self {
        let hostname = entry
            .hostname
            .map(|h| h.replace("%h", alias))
            .unwrap_or_else(|| alias.to_string());
        let port = entry.port.unwrap_or(DEFAULT_SSH_PORT);
        let tokens = Tokens {
            alias,
            hostname: &hostname,
            port,
            user: entry.user.as_deref(),
        };

        let identity_file = entry
            .identity_files
            .first()
            .map(|f| PathBuf::from(shellexpand::tilde(&tokens.expand(f)).into_owned()));
        let proxy_command = entry
            .proxy_command
            .filter(|c| !c.eq_ignore_ascii_case("none"))
            .map(|c| tokens.expand(&c));

        Self {
            alias: alias.to_string(),
            hostname,
            username: entry.user,
            port,
            identity_file,
            proxy_command,
        }
    }

    /// `user@host` or just `host`
    #[must_use]
    pub fn destination(&self) -> String {
        match &self.username {
            Some(user) => format!("{user}@{}", self.hostname),
            None => self.hostname.clone(),
        }
    }
}

struct Tokens<'a> {
    alias: &'a str,
    hostname: &'a str,
    port: u16,
    user: Option<&'a str>,
}

impl Tokens<'_> {
    /// Expands `%h %p %r %n %%`; unknown tokens are left untouched
    fn expand(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut chars = input.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => out.push('%'),
                Some('h') => out.push_str(self.hostname),
                Some('n') => out.push_str(self.alias),
                Some('p') => out.push_str(&self.port.to_string()),
                Some('r') => match self.user.map(str::to_string).or_else(local_user) {
                    Some(user) => out.push_str(&user),
                    None => out.push_str("%r"),
                },
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }

        out
    }
}

fn local_user() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .ok()
}

impl SshConfigFile {
    /// Resolves the effective connection parameters for `alias`
    #[must_use]
    pub fn resolve(&self, alias: &str) -> ConnectionParams {
        ConnectionParams::from_entry(alias, self.lookup(alias))
    }
}

/// Locates and reads the user's ssh config.
///
/// Holds only the path: every [`ConfigResolver::load`] reads the file again
/// so live edits are picked up on the next cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigResolver {
    path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver reading the given file
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Resolver reading `~/.ssh/config`
    #[must_use]
    pub fn from_default_location() -> Self {
        Self { path: default_config_path() }
    }

    /// Resolver that never reads a file (all defaults)
    #[must_use]
    pub const fn disabled() -> Self {
        Self { path: None }
    }

    /// The file this resolver reads, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads and parses the config file now.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ConfigError`] if the file exists but is
    /// unreadable or unparsable.
    pub fn load(&self) -> ConfigResult<SshConfigFile> {
        match &self.path {
            Some(path) => {
                let _span =
                    tracing::debug_span!(span_names::CONFIG_LOAD, path = %path.display()).entered();
                SshConfigFile::load(path)
            }
            None => Ok(SshConfigFile::empty()),
        }
    }

    /// Reads the config file and resolves `alias` against it.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigResolver::load`].
    pub fn resolve(&self, alias: &str) -> ConfigResult<ConnectionParams> {
        Ok(self.load()?.resolve(alias))
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::from_default_location()
    }
}

/// `~/.ssh/config` for the current user
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("config"))
}
