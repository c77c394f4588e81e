//! Alias resolution against ssh config files on disk

use std::path::PathBuf;

use gpuwatch_core::error::ConfigError;
use gpuwatch_core::session::SshExecutor;
use gpuwatch_core::ssh_config::{ConfigResolver, DEFAULT_SSH_PORT};
use tempfile::TempDir;

const FLEET_CONFIG: &str = r#"
# Shared defaults come first so they win for every host
Host gpu-*
    User ml
    IdentityFile ~/.ssh/fleet_%n

Host gpu-01
    HostName 10.0.0.11
    User root
    Port 2201

Host gpu-02 gpu-03
    HostName %h.cluster.internal
    ProxyCommand ssh -W %h:%p bastion

Host gpu-03
    ProxyCommand none

Host !gpu-04 gpu-0?
    Port 2200

Match host gpu-04
    Port 9999

Host *
    Port 2222
    User fallback
"#;

fn write_config(content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn first_obtained_value_wins() {
    let (_dir, path) = write_config(FLEET_CONFIG);
    let params = ConfigResolver::new(&path).resolve("gpu-01").unwrap();

    assert_eq!(params.alias, "gpu-01");
    assert_eq!(params.hostname, "10.0.0.11");
    assert_eq!(params.username.as_deref(), Some("ml"));
    assert_eq!(params.port, 2201);
}

#[test]
fn identity_file_is_expanded() {
    let (_dir, path) = write_config(FLEET_CONFIG);
    let params = ConfigResolver::new(&path).resolve("gpu-01").unwrap();

    let identity = params.identity_file.unwrap();
    assert!(identity.ends_with(".ssh/fleet_gpu-01"));
    assert!(!identity.starts_with("~"));
}

#[test]
fn hostname_and_proxy_tokens() {
    let (_dir, path) = write_config(FLEET_CONFIG);
    let params = ConfigResolver::new(&path).resolve("gpu-02").unwrap();

    assert_eq!(params.hostname, "gpu-02.cluster.internal");
    assert_eq!(params.port, 2200);
    assert_eq!(
        params.proxy_command.as_deref(),
        Some("ssh -W gpu-02.cluster.internal:2200 bastion")
    );
}

#[test]
fn proxy_command_none_is_first_value() {
    // gpu-03 already obtained a ProxyCommand from the shared block
    let (_dir, path) = write_config(FLEET_CONFIG);
    let params = ConfigResolver::new(&path).resolve("gpu-03").unwrap();
    assert!(params.proxy_command.is_some());

    let (_dir, path) = write_config("Host gpu-03\n  ProxyCommand none\nHost *\n  ProxyCommand nc %h %p\n");
    let params = ConfigResolver::new(&path).resolve("gpu-03").unwrap();
    assert_eq!(params.proxy_command, None);
}

#[test]
fn negated_pattern_and_match_block() {
    let (_dir, path) = write_config(FLEET_CONFIG);
    let params = ConfigResolver::new(&path).resolve("gpu-04").unwrap();

    // Negation skips the `gpu-0?` block and `Match` is never applied
    assert_eq!(params.port, 2222);
    assert_eq!(params.hostname, "gpu-04");
}

#[test]
fn unknown_alias_uses_wildcard_and_defaults() {
    let (_dir, path) = write_config(FLEET_CONFIG);
    let params = ConfigResolver::new(&path).resolve("workstation").unwrap();

    assert_eq!(params.hostname, "workstation");
    assert_eq!(params.username.as_deref(), Some("fallback"));
    assert_eq!(params.port, 2222);
    assert_eq!(params.identity_file, None);

    let (_dir, path) = write_config("");
    let params = ConfigResolver::new(&path).resolve("workstation").unwrap();
    assert_eq!(params.port, DEFAULT_SSH_PORT);
    assert_eq!(params.username, None);
}

#[test]
fn missing_file_means_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let params = ConfigResolver::new(dir.path().join("nope"))
        .resolve("gpu-01")
        .unwrap();
    assert_eq!(params.hostname, "gpu-01");
    assert_eq!(params.port, DEFAULT_SSH_PORT);
}

#[test]
fn live_edits_are_picked_up() {
    let (_dir, path) = write_config("Host a\n  Port 1000\n");
    let resolver = ConfigResolver::new(&path);
    assert_eq!(resolver.resolve("a").unwrap().port, 1000);

    std::fs::write(&path, "Host a\n  Port 2000\n").unwrap();
    assert_eq!(resolver.resolve("a").unwrap().port, 2000);
}

#[test]
fn syntax_errors_report_line() {
    let (_dir, path) = write_config("Host a\n  HostName\n");
    let err = ConfigResolver::new(&path).resolve("a").unwrap_err();
    assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
}

#[cfg(unix)]
#[test]
fn unreadable_path_is_read_error() {
    // A directory exists but cannot be read as a file
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigResolver::new(dir.path()).resolve("a").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn resolved_params_drive_ssh_arguments() {
    let (_dir, path) = write_config(FLEET_CONFIG);
    let params = ConfigResolver::new(&path).resolve("gpu-01").unwrap();
    let args = SshExecutor::build_args(&params, "uptime", std::time::Duration::from_secs(7));

    assert!(args.windows(2).any(|w| w == ["-p", "2201"]));
    assert!(args.windows(2).any(|w| w == ["-l", "ml"]));
    assert!(args.contains(&"ConnectTimeout=7".to_string()));
    assert_eq!(args[args.len() - 2..], ["10.0.0.11", "uptime"]);
}
