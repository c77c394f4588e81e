//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gpuwatch_core::config::DEFAULT_FLEET_FILE;

/// `GpuWatch` command-line interface for polling a GPU fleet over ssh
#[derive(Parser)]
#[command(name = "gpuwatch")]
#[command(author, version, about = "Agentless GPU telemetry for a fleet of ssh hosts")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Fleet settings file (YAML, or TOML by extension)
    #[arg(short, long, global = true, env = "GPUWATCH_FLEET", default_value = DEFAULT_FLEET_FILE)]
    pub fleet: PathBuf,

    /// ssh client config to resolve aliases with (overrides the fleet file)
    #[arg(long, global = true, value_name = "FILE")]
    pub ssh_config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Poll every host once and print its accelerators
    #[command(about = "Run one collection cycle and print per-host devices")]
    Collect {
        /// Output format
        #[arg(short = 'o', long, default_value = "table", value_enum)]
        format: OutputFormat,

        /// Poll only this alias from the fleet
        #[arg(long, value_name = "ALIAS")]
        host: Option<String>,
    },

    /// Poll every host once and print fleet means and idle accelerators
    #[command(about = "Run one collection cycle and print fleet statistics")]
    Summary {
        /// Memory-usage percentage below which a device counts as idle
        #[arg(short, long, value_name = "PCT")]
        threshold: Option<f64>,

        /// Output format
        #[arg(short = 'o', long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Show how an alias resolves through the ssh config
    #[command(about = "Print resolved connection parameters and the ssh invocation")]
    Resolve {
        /// Host alias
        alias: String,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// Pretty-printed JSON
    Json,
}
