//! Shows how an alias resolves, without connecting.

use gpuwatch_core::monitoring::{CollectorSettings, GPU_QUERY_COMMAND};
use gpuwatch_core::session::{DEFAULT_SSH_PROGRAM, SshExecutor};

use crate::error::CliError;
use crate::util::Context;

/// Resolve command handler
pub fn cmd_resolve(ctx: &Context, alias: &str) -> Result<(), CliError> {
    let (resolver, settings) = ctx.resolver()?;
    let params = resolver.resolve(alias)?;

    let (program, timeout) = settings.as_ref().map_or_else(
        || (DEFAULT_SSH_PROGRAM.to_string(), CollectorSettings::default().timeout()),
        |s| (s.ssh_program.clone(), s.collector_settings().timeout()),
    );

    match resolver.path() {
        Some(path) => println!("ssh config:    {}", path.display()),
        None => println!("ssh config:    (none)"),
    }
    println!("Alias:         {}", params.alias);
    println!("HostName:      {}", params.hostname);
    println!("User:          {}", params.username.as_deref().unwrap_or("(transport default)"));
    println!("Port:          {}", params.port);
    match params.identity_file {
        Some(ref key) => println!("IdentityFile:  {}", key.display()),
        None => println!("IdentityFile:  (none)"),
    }
    println!("ProxyCommand:  {}", params.proxy_command.as_deref().unwrap_or("(none)"));
    println!();

    let args = SshExecutor::build_args(&params, GPU_QUERY_COMMAND, timeout);
    println!("{program} {}", shell_join(&args));
    Ok(())
}

/// Quotes arguments that a POSIX shell would split
fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if !arg.is_empty()
                && arg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_=./:@%,+".contains(c))
            {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
