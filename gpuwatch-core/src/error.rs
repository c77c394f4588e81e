//! Error types for `GpuWatch`
//!
//! Each pipeline stage has its own error type. [`HostError`] unifies the
//! stages for one host so the fleet collector can isolate a failure with a
//! single match instead of a blanket catch.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading the user's ssh client configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("Failed to read ssh config {path}: {reason}")]
    Read {
        /// Path of the config file
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },

    /// The file is structurally unparsable
    #[error("Invalid ssh config at line {line}: {reason}")]
    Syntax {
        /// 1-based line number
        line: usize,
        /// What is wrong with the line
        reason: String,
    },
}

/// Result type for ssh config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised by a remote session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The transport could not be established (spawn, network, auth, proxy)
    #[error("Connection to {host} failed: {reason}")]
    Connection {
        /// Resolved hostname
        host: String,
        /// Failure cause as reported by the transport
        reason: String,
    },

    /// The session came up but the remote command exited non-zero
    #[error("Remote command on {host} exited with status {status}: {stderr}")]
    CommandFailed {
        /// Resolved hostname
        host: String,
        /// Exit status of the remote command
        status: i32,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// The session exceeded its allotted time and was torn down
    #[error("Session to {host} timed out after {timeout:?}")]
    Timeout {
        /// Resolved hostname
        host: String,
        /// The deadline that was exceeded
        timeout: Duration,
    },

    /// The remote command produced output that is not valid UTF-8
    #[error("Invalid output from {host}: {reason}")]
    InvalidOutput {
        /// Resolved hostname
        host: String,
        /// Decoding error
        reason: String,
    },
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// The diagnostic output violates the expected schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed GPU record at line {line_number} ({line:?}): {reason}")]
pub struct ParseError {
    /// 1-based line number within the command output
    pub line_number: usize,
    /// The offending line, untrimmed
    pub line: String,
    /// What is wrong with it
    pub reason: String,
}

/// Result type for diagnostic output parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// Any failure while collecting a single host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// Connection parameters could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The remote session failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The diagnostic output could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl HostError {
    /// Returns the coarse failure category used in logs and snapshots
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Config(_) => FailureKind::Config,
            Self::Session(SessionError::Connection { .. }) => FailureKind::Connection,
            Self::Session(SessionError::CommandFailed { .. }) => FailureKind::Command,
            Self::Session(SessionError::Timeout { .. }) => FailureKind::Timeout,
            Self::Session(SessionError::InvalidOutput { .. }) | Self::Parse(_) => {
                FailureKind::Parse
            }
        }
    }
}

/// Coarse category of a per-host failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unparsable ssh config
    Config,
    /// Auth, network or proxy failure
    Connection,
    /// The diagnostic command itself failed on the remote host
    Command,
    /// Session deadline exceeded
    Timeout,
    /// Output violated the expected schema
    Parse,
}

impl FailureKind {
    /// Returns the lowercase name used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Connection => "connection",
            Self::Command => "command",
            Self::Timeout => "timeout",
            Self::Parse => "parse",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a whole collection cycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectError {
    /// The caller cancelled the cycle; every session has been released
    #[error("Fleet collection cancelled")]
    Cancelled,
}

/// Result type for collection cycles
pub type CollectResult<T> = Result<T, CollectError>;

/// Errors raised while loading the fleet settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read
    #[error("Failed to read fleet settings {path}: {source}")]
    Io {
        /// Path of the settings file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// YAML deserialization failed
    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        /// Path of the settings file
        path: PathBuf,
        /// Deserializer error
        #[source]
        source: serde_yaml::Error,
    },

    /// TOML deserialization failed
    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        /// Path of the settings file
        path: PathBuf,
        /// Deserializer error
        #[source]
        source: toml::de::Error,
    },

    /// The settings parsed but are not usable
    #[error("Invalid fleet settings: {0}")]
    Invalid(String),
}

/// Result type for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;
