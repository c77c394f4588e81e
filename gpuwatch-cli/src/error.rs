//! CLI error types and exit codes.

use gpuwatch_core::error::{CollectError, ConfigError, SettingsError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error: settings, ssh config, output or runtime failures
    pub const GENERAL_ERROR: i32 = 1;
    /// Every polled host failed
    pub const CONNECTION_FAILURE: i32 = 2;
    /// The cycle was interrupted with Ctrl-C
    pub const INTERRUPTED: i32 = 130;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Fleet settings could not be loaded
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// ssh client config could not be used
    #[error("ssh config error: {0}")]
    SshConfig(#[from] ConfigError),

    /// Alias passed to `--host` is not in the fleet
    #[error("Host not in fleet: {0}")]
    HostNotFound(String),

    /// Every host in the cycle failed
    #[error("All {0} hosts failed")]
    AllHostsFailed(usize),

    /// Ctrl-C cancelled the cycle
    #[error("Collection interrupted")]
    Interrupted,

    /// The async runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Output could not be rendered
    #[error("Output error: {0}")]
    Output(String),
}

impl From<CollectError> for CliError {
    fn from(err: CollectError) -> Self {
        match err {
            CollectError::Cancelled => Self::Interrupted,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err.to_string())
    }
}

impl CliError {
    /// Returns the exit code for this error.
    ///
    /// - 1: general error
    /// - 2: every host failed or the requested host is unknown
    /// - 130: interrupted
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::AllHostsFailed(_) | Self::HostNotFound(_) => exit_codes::CONNECTION_FAILURE,
            Self::Interrupted => exit_codes::INTERRUPTED,
            Self::Settings(_) | Self::SshConfig(_) | Self::Runtime(_) | Self::Output(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}
