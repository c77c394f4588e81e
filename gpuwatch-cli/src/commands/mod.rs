//! Command handler modules for the CLI.

mod collect;
mod resolve;
mod summary;

use crate::cli::Commands;
use crate::error::CliError;
use crate::util::Context;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(ctx: &Context, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Collect { format, host } => collect::cmd_collect(ctx, format, host.as_deref()),
        Commands::Summary { threshold, format } => summary::cmd_summary(ctx, threshold, format),
        Commands::Resolve { alias } => resolve::cmd_resolve(ctx, &alias),
    }
}
