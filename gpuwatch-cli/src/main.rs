//! `GpuWatch` CLI - agentless GPU telemetry for a fleet of ssh hosts
//!
//! Polls each host listed in the fleet file over ssh, then prints per-host
//! devices, fleet means and idle accelerators.

mod cli;
mod commands;
mod error;
mod format;
mod util;

use clap::Parser;
use cli::Cli;
use gpuwatch_core::tracing::{TracingConfig, TracingLevel, init_tracing};

fn main() {
    let cli = Cli::parse();

    let mut tracing_config =
        TracingConfig::production().with_level(TracingLevel::from_verbosity(cli.verbose, cli.quiet));
    if let Some(filter) = std::env::var("RUST_LOG").ok().filter(|f| !f.is_empty()) {
        tracing_config = tracing_config.with_filter(filter);
    }
    if let Err(e) = init_tracing(&tracing_config) {
        eprintln!("Warning: {e}");
    }

    let ctx = util::Context {
        fleet: cli.fleet,
        ssh_config: cli.ssh_config,
        color: !cli.no_color && std::io::IsTerminal::is_terminal(&std::io::stdout()),
    };

    if let Err(e) = commands::dispatch(&ctx, cli.command) {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
