//! Structured logging for collection cycles
//!
//! Wires the `tracing` subscriber for the library and the CLI, and defines
//! the span and field names every module logs with, so one cycle can be
//! followed host by host in the output.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

static TRACING_CONFIG: OnceLock<TracingConfig> = OnceLock::new();

/// Crates whose events pass the level filter
const LOG_TARGETS: &[&str] = &["gpuwatch_core", "gpuwatch"];

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// The subscriber could not be installed or the filter is invalid
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// Tracing already initialized
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// Failed to create log file
    #[error("Failed to create log file {path}: {reason}")]
    FileCreationFailed {
        /// Requested log file
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },
}

/// Result type for tracing operations
pub type TracingResult<T> = Result<T, TracingError>;

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TracingLevel {
    /// Only errors
    Error,
    /// Errors and per-host failures
    Warn,
    /// Cycle summaries (default)
    #[default]
    Info,
    /// Per-host progress and ssh arguments
    Debug,
    /// Everything
    Trace,
}

impl TracingLevel {
    /// Converts to the `tracing` crate's level
    #[must_use]
    pub const fn to_tracing_level(self) -> Level {
        match self {
            Self::Error => Level::ERROR,
            Self::Warn => Level::WARN,
            Self::Info => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Level for a `-v`/`-q` count pair, starting from `Warn`
    #[must_use]
    pub const fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Error;
        }
        match verbose {
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(TracingError::InitializationFailed(format!(
                "unknown log level: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Standard output
    Stdout,
    /// Standard error; keeps stdout clean for table and JSON output
    #[default]
    Stderr,
    /// A log file, truncated on start
    File {
        /// Path to the log file
        path: PathBuf,
    },
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level
    pub level: TracingLevel,
    /// Output destination
    pub output: TracingOutput,
    /// Include thread ids and targets in each line
    pub verbose_fields: bool,
    /// Custom `EnvFilter` directive (overrides `level` if set)
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: TracingLevel::Info,
            output: TracingOutput::Stderr,
            verbose_fields: cfg!(debug_assertions),
            filter: None,
        }
    }
}

impl TracingConfig {
    /// Creates a new tracing configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output destination
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Enables or disables thread ids and targets
    #[must_use]
    pub const fn with_verbose_fields(mut self, enabled: bool) -> Self {
        self.verbose_fields = enabled;
        self
    }

    /// Sets a custom filter directive
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Debug level on stdout
    #[must_use]
    pub const fn development() -> Self {
        Self {
            level: TracingLevel::Debug,
            output: TracingOutput::Stdout,
            verbose_fields: true,
            filter: None,
        }
    }

    /// Warn level on stderr
    #[must_use]
    pub const fn production() -> Self {
        Self {
            level: TracingLevel::Warn,
            output: TracingOutput::Stderr,
            verbose_fields: false,
            filter: None,
        }
    }

    /// Filter directive this configuration installs
    #[must_use]
    pub fn filter_directive(&self) -> String {
        self.filter.clone().unwrap_or_else(|| {
            LOG_TARGETS
                .iter()
                .map(|target| format!("{target}={}", self.level))
                .collect::<Vec<_>>()
                .join(",")
        })
    }

    fn make_writer(&self) -> TracingResult<BoxMakeWriter> {
        Ok(match &self.output {
            TracingOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            TracingOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            TracingOutput::File { path } => {
                let file =
                    std::fs::File::create(path).map_err(|e| TracingError::FileCreationFailed {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                BoxMakeWriter::new(Mutex::new(file))
            }
        })
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if:
/// - Tracing has already been initialized
/// - The filter directive is invalid
/// - File output is configured but the file cannot be created
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let _ = TRACING_CONFIG.set(config.clone());

    let filter = EnvFilter::try_new(config.filter_directive())
        .map_err(|e| TracingError::InitializationFailed(e.to_string()))?;
    let writer = config.make_writer()?;
    let ansi = matches!(config.output, TracingOutput::Stderr | TracingOutput::Stdout);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(config.verbose_fields)
                .with_thread_ids(config.verbose_fields)
                .with_level(true)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| TracingError::InitializationFailed(e.to_string()))?;

    tracing::debug!(level = %config.level, "Tracing initialized");
    Ok(())
}

/// Checks if tracing has been initialized
#[must_use]
pub fn is_tracing_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::SeqCst)
}

/// Gets the installed configuration (if initialized)
#[must_use]
pub fn get_tracing_config() -> Option<&'static TracingConfig> {
    TRACING_CONFIG.get()
}

/// Creates an info-level span with the given name and fields
///
/// ```ignore
/// use gpuwatch_core::trace_operation;
/// use gpuwatch_core::tracing::span_names;
///
/// let span = trace_operation!(span_names::FLEET_COLLECT, host_count = hosts.len());
/// ```
#[macro_export]
macro_rules! trace_operation {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Debug-level counterpart of [`trace_operation!`]
#[macro_export]
macro_rules! trace_operation_debug {
    ($name:expr) => {
        tracing::debug_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::debug_span!($name, $($field)*)
    };
}

/// Standard span names
pub mod span_names {
    /// One full collection cycle
    pub const FLEET_COLLECT: &str = "fleet.collect";
    /// One host within a cycle
    pub const HOST_COLLECT: &str = "host.collect";
    /// Reading and parsing the ssh client config
    pub const CONFIG_LOAD: &str = "config.load";
    /// Reading the fleet settings file
    pub const SETTINGS_LOAD: &str = "settings.load";
    /// One remote command over ssh
    pub const SESSION_EXECUTE: &str = "session.execute";
}

/// Standard field names
pub mod field_names {
    /// Host alias
    pub const HOST: &str = "host";
    /// Resolved hostname
    pub const HOSTNAME: &str = "hostname";
    /// Port field
    pub const PORT: &str = "port";
    /// Failure category
    pub const KIND: &str = "kind";
    /// Error message field
    pub const ERROR: &str = "error";
    /// Number of hosts in a cycle
    pub const HOST_COUNT: &str = "host_count";
    /// Number of accelerators on a host
    pub const GPU_COUNT: &str = "gpu_count";
}
