//! One collection cycle, printed per host.

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::format::{Style, format_host, format_snapshot};
use crate::util::{Context, ensure_reachable, run_cycle};

/// Collect command handler
pub fn cmd_collect(ctx: &Context, format: OutputFormat, host: Option<&str>) -> Result<(), CliError> {
    let settings = ctx.load_settings()?;

    let hosts = match host {
        Some(alias) => {
            if !settings.instances.iter().any(|h| h == alias) {
                return Err(CliError::HostNotFound(alias.to_string()));
            }
            vec![alias.to_string()]
        }
        None => settings.instances.clone(),
    };

    let snapshot = run_cycle(&settings, &hosts)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Table => {
            let style = Style::new(ctx.color);
            match host {
                Some(alias) => println!("{}", format_host(&snapshot, alias, style)),
                None => println!("{}", format_snapshot(&snapshot, style)),
            }
        }
    }

    ensure_reachable(&snapshot)
}
