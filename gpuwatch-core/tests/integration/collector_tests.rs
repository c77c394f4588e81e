//! Collection cycles against scripted executors

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gpuwatch_core::error::{CollectError, FailureKind, SessionError, SessionResult};
use gpuwatch_core::monitoring::{CancellationToken, FleetCollector, summarize_default};
use gpuwatch_core::session::RemoteExecutor;
use gpuwatch_core::ssh_config::{ConfigResolver, ConnectionParams};

/// What a scripted host does when asked for metrics
#[derive(Clone)]
enum Script {
    Reply(&'static str),
    Fail(SessionError),
    Hang,
}

/// Executor that plays back a fixed script per hostname and tracks how many
/// sessions are open at once
#[derive(Default)]
struct ScriptedExecutor {
    scripts: HashMap<String, Script>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl ScriptedExecutor {
    fn with(mut self, host: &str, script: Script) -> Self {
        self.scripts.insert(host.to_string(), script);
        self
    }

    fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Marks a session as released when dropped, completed or not
struct Release<'a> {
    in_flight: &'a AtomicUsize,
    released: &'a AtomicUsize,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        params: &ConnectionParams,
        _command: &str,
        _timeout: Duration,
    ) -> SessionResult<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _release = Release {
            in_flight: &self.in_flight,
            released: &self.released,
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.scripts.get(&params.hostname) {
            Some(Script::Reply(out)) => Ok((*out).to_string()),
            Some(Script::Fail(err)) => Err(err.clone()),
            Some(Script::Hang) => {
                std::future::pending::<()>().await;
                Ok(String::new())
            }
            None => Ok("0, 512, 16384, 20, Tesla V100\n".into()),
        }
    }
}

fn hosts(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test]
async fn one_failing_host_does_not_affect_others() {
    let executor = ScriptedExecutor::default()
        .with(
            "gpu-01",
            Script::Reply("0, 10, 8192, 0, Tesla T4\n1, 4096, 8192, 90, Tesla T4\n"),
        )
        .with(
            "gpu-02",
            Script::Fail(SessionError::Connection {
                host: "gpu-02".into(),
                reason: "No route to host".into(),
            }),
        );
    let collector = FleetCollector::new(ConfigResolver::disabled(), Arc::new(executor));

    let snapshot = collector
        .collect(&hosts(&["gpu-01", "gpu-02", "gpu-03"]))
        .await;

    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.get("gpu-01").unwrap().len(), 2);
    assert!(snapshot.get("gpu-02").unwrap().is_empty());
    assert_eq!(snapshot.get("gpu-03").unwrap().len(), 1);
    assert_eq!(snapshot.failures.len(), 1);
    assert_eq!(snapshot.failure("gpu-02").unwrap().kind, FailureKind::Connection);
    assert!(!snapshot.all_failed());

    let summary = summarize_default(&snapshot);
    assert!(summary.means.is_some());
    assert_eq!(summary.idle.len(), 2);
    assert_eq!(summary.idle[0].to_string(), "gpu-01: 1/2 idle (Tesla T4)");
    assert_eq!(summary.idle[1].to_string(), "gpu-03: 1/1 idle (Tesla V100)");
}

#[tokio::test]
async fn every_failure_kind_is_recorded() {
    let executor = ScriptedExecutor::default()
        .with(
            "cmd",
            Script::Fail(SessionError::CommandFailed {
                host: "cmd".into(),
                status: 127,
                stderr: "nvidia-smi: command not found".into(),
            }),
        )
        .with("parse", Script::Reply("GPU 0: Tesla T4\n"))
        .with("empty", Script::Reply(""));
    let collector = FleetCollector::new(ConfigResolver::disabled(), Arc::new(executor));

    let snapshot = collector.collect(&hosts(&["cmd", "parse", "empty"])).await;

    assert_eq!(snapshot.failure("cmd").unwrap().kind, FailureKind::Command);
    assert!(snapshot.failure("cmd").unwrap().message.contains("127"));
    assert_eq!(snapshot.failure("parse").unwrap().kind, FailureKind::Parse);
    // Reachable host without accelerators is not a failure
    assert!(snapshot.failure("empty").is_none());
    assert!(snapshot.get("empty").unwrap().is_empty());
}

#[tokio::test]
async fn all_failed_fleet_has_no_means() {
    let fail = |host: &str| {
        Script::Fail(SessionError::Connection {
            host: host.into(),
            reason: "Connection refused".into(),
        })
    };
    let executor = ScriptedExecutor::default()
        .with("a", fail("a"))
        .with("b", fail("b"));
    let collector = FleetCollector::new(ConfigResolver::disabled(), Arc::new(executor));

    let snapshot = collector.collect(&hosts(&["a", "b"])).await;

    assert!(snapshot.all_failed());
    let summary = summarize_default(&snapshot);
    assert!(summary.means.is_none());
    assert!(summary.idle.is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrency_is_bounded() {
    let executor = Arc::new(ScriptedExecutor::default().delay(Duration::from_millis(100)));
    let collector =
        FleetCollector::new(ConfigResolver::disabled(), executor.clone()).concurrency(3);

    let names: Vec<String> = (0..10).map(|i| format!("gpu-{i:02}")).collect();
    let snapshot = collector.collect(&names).await;

    assert_eq!(snapshot.len(), 10);
    assert!(snapshot.failures.is_empty());
    assert_eq!(executor.peak.load(Ordering::SeqCst), 3);
    assert_eq!(executor.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_releases_in_flight_sessions() {
    let released = Arc::new(AtomicUsize::new(0));
    let executor = ScriptedExecutor {
        released: released.clone(),
        ..ScriptedExecutor::default()
    };
    let executor = ["a", "b", "c", "d", "e"]
        .iter()
        .fold(executor, |ex, host| ex.with(host, Script::Hang));
    let collector = FleetCollector::new(ConfigResolver::disabled(), Arc::new(executor))
        .timeout(Duration::from_secs(300))
        .concurrency(2);

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = collector
        .collect_with_cancel(&hosts(&["a", "b", "c", "d", "e"]), &token)
        .await;

    assert_eq!(result, Err(CollectError::Cancelled));
    // Only the two admitted sessions ever started, and both were dropped
    assert_eq!(released.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cancel_after_completion_keeps_result() {
    let collector = FleetCollector::new(
        ConfigResolver::disabled(),
        Arc::new(ScriptedExecutor::default()),
    );
    let token = CancellationToken::new();

    let snapshot = collector
        .collect_with_cancel(&hosts(&["gpu-01"]), &token)
        .await
        .unwrap();
    token.cancel();

    assert_eq!(snapshot.get("gpu-01").unwrap().len(), 1);
}

#[tokio::test]
async fn hostname_comes_from_ssh_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config");
    std::fs::write(&path, "Host gpu-01\n    HostName 10.0.0.5\n").unwrap();

    let executor = ScriptedExecutor::default().with(
        "10.0.0.5",
        Script::Reply("0, 100, 8192, 5, Tesla T4\n"),
    );
    let collector = FleetCollector::new(ConfigResolver::new(&path), Arc::new(executor));

    let snapshot = collector.collect(&hosts(&["gpu-01"])).await;
    let gpus = snapshot.get("gpu-01").unwrap();
    assert_eq!(gpus[0].memory_used, 100);
}

#[tokio::test]
async fn broken_ssh_config_fails_every_host() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config");
    std::fs::write(&path, "Host *\n    Port twenty-two\n").unwrap();

    let collector = FleetCollector::new(
        ConfigResolver::new(&path),
        Arc::new(ScriptedExecutor::default()),
    );
    let snapshot = collector.collect(&hosts(&["a", "b"])).await;

    assert!(snapshot.all_failed());
    assert_eq!(snapshot.failure("a").unwrap().kind, FailureKind::Config);
    assert_eq!(snapshot.failure("b").unwrap().kind, FailureKind::Config);
}

#[cfg(unix)]
#[tokio::test]
async fn ssh_executor_end_to_end_with_fake_client() {
    use gpuwatch_core::config::FleetSettings;
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("fake-ssh");
    std::fs::write(
        &program,
        "#!/bin/sh\nfor arg; do last=\"$arg\"; done\n\
         case \"$last\" in nvidia-smi*) echo '0, 64, 8192, 1, Tesla T4';; *) exit 2;; esac\n",
    )
    .unwrap();
    std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut settings = FleetSettings::with_instances(hosts(&["gpu-01"]));
    settings.ssh_program = program.display().to_string();
    settings.ssh_config = Some(dir.path().join("absent").display().to_string());

    let snapshot = settings.build_collector().collect(&settings.instances).await;
    let gpus = snapshot.get("gpu-01").unwrap();
    assert_eq!(gpus.len(), 1);
    assert_eq!(gpus[0].model, "Tesla T4");
}
