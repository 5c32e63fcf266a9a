//! Worker process adapter
//!
//! Runs the test binary once, restricted to a single shard through the
//! googletest sharding environment variables, and captures its combined
//! stdout/stderr stream.
//!
//! Each child leads its own process group. On interrupt the whole group gets
//! SIGINT, then SIGKILL once the grace period runs out, so nothing the test
//! binary forked outlives the run.

use chrono::Utc;
use std::io::{self, PipeReader, PipeWriter, Read};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{shutdown_requested, ShardRunner};
use crate::config::{RunConfig, SHARD_INDEX_VAR, TOTAL_SHARDS_VAR};
use crate::models::{ShardIdentity, ShardStatus, WorkerOutcome};

#[cfg(unix)]
use nix::{
    errno::Errno,
    sys::signal::{killpg, Signal},
    unistd::Pid,
};

/// How long an interrupted worker may take to exit before it is killed
pub const KILL_GRACE: Duration = Duration::from_secs(2);

/// Launches one child process per shard
#[derive(Clone, Debug)]
pub struct ProcessWorker {
    binary: PathBuf,
    args: Vec<String>,
    kill_grace: Duration,
}

impl ProcessWorker {
    pub fn new(config: &RunConfig) -> Self {
        Self::with_args(config.binary.clone(), config.worker_args())
    }

    pub fn with_args(binary: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
            kill_grace: KILL_GRACE,
        }
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Run one shard to completion
    pub async fn run_shard(
        &self,
        shard: ShardIdentity,
        mut shutdown: watch::Receiver<bool>,
    ) -> WorkerOutcome {
        let started_at = Utc::now();

        let (reader, writer) = match io::pipe() {
            Ok(pipe) => pipe,
            Err(e) => {
                warn!("Could not create output pipe for {}: {}", shard, e);
                return WorkerOutcome::launch_failed(shard, format!("output pipe: {e}"));
            }
        };

        let mut child = match self.spawn(shard, writer) {
            Ok(child) => child,
            Err(e) => {
                warn!("Could not start {} for {}: {}", self.binary.display(), shard, e);
                return WorkerOutcome::launch_failed(shard, e.to_string());
            }
        };
        // The child leads its group, so its pid is the group id
        let pgid = child.id();
        debug!("Started {} (pid {:?})", shard, pgid);

        let capture = tokio::task::spawn_blocking(move || read_to_string(reader));

        let (status, interrupted) = tokio::select! {
            status = child.wait() => (status, false),
            _ = shutdown_requested(&mut shutdown) => {
                (self.terminate(&mut child, pgid, shard).await, true)
            }
        };

        let output = match capture.await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => format!("<failed to read output: {e}>"),
            Err(e) => format!("<output capture task failed: {e}>"),
        };

        let status = match status {
            _ if interrupted => ShardStatus::Interrupted,
            Ok(exit) => classify_exit(exit),
            Err(e) => ShardStatus::LaunchFailed {
                reason: format!("lost track of child process: {e}"),
            },
        };
        debug!("Finished {}: {}", shard, status.describe());

        WorkerOutcome::new(shard, status, output, started_at)
    }

    /// Spawn the child with stdout and stderr sharing one pipe.
    ///
    /// The command, and with it the parent's copies of the write end, is
    /// dropped on return so the reader sees EOF once the child exits.
    fn spawn(&self, shard: ShardIdentity, writer: PipeWriter) -> io::Result<Child> {
        let stderr = writer.try_clone()?;

        let mut command = Command::new(&self.binary);
        command
            .args(&self.args)
            .env(SHARD_INDEX_VAR, shard.index_env())
            .env(TOTAL_SHARDS_VAR, shard.total_env())
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr)
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        command.spawn()
    }

    /// Interrupt the child's process group, escalate to SIGKILL after the
    /// grace period, and reap the child
    async fn terminate(
        &self,
        child: &mut Child,
        pgid: Option<u32>,
        shard: ShardIdentity,
    ) -> io::Result<ExitStatus> {
        debug!("Interrupting {}", shard);
        interrupt_group(child, pgid);

        let status = match tokio::time::timeout(self.kill_grace, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(
                    "{} still running {}ms after interrupt, killing it",
                    shard,
                    self.kill_grace.as_millis()
                );
                kill_group(child, pgid);
                child.wait().await
            }
        };

        // Background processes of the child may survive it and hold the pipe
        kill_group(child, pgid);
        status
    }
}

impl ShardRunner for ProcessWorker {
    async fn run(&self, shard: ShardIdentity, shutdown: watch::Receiver<bool>) -> WorkerOutcome {
        self.run_shard(shard, shutdown).await
    }
}

#[cfg(unix)]
fn signal_group(pgid: Option<u32>, signal: Signal) {
    let Some(pgid) = pgid else {
        return;
    };
    match killpg(Pid::from_raw(pgid as i32), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to send {:?} to process group {}: {}", signal, pgid, e),
    }
}

#[cfg(unix)]
fn interrupt_group(_child: &mut Child, pgid: Option<u32>) {
    signal_group(pgid, Signal::SIGINT);
}

#[cfg(unix)]
fn kill_group(_child: &mut Child, pgid: Option<u32>) {
    signal_group(pgid, Signal::SIGKILL);
}

#[cfg(not(unix))]
fn interrupt_group(child: &mut Child, _pgid: Option<u32>) {
    kill_group(child, None);
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child, _pgid: Option<u32>) {
    if let Err(e) = child.start_kill() {
        debug!("Failed to kill child: {}", e);
    }
}

fn read_to_string(mut reader: PipeReader) -> io::Result<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Map a process exit status onto a shard status
pub(crate) fn classify_exit(status: ExitStatus) -> ShardStatus {
    if status.success() {
        return ShardStatus::Passed;
    }
    if let Some(code) = status.code() {
        return ShardStatus::Failed { code };
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ShardStatus::Crashed { signal };
        }
    }

    ShardStatus::Failed { code: -1 }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::time::{Duration, Instant};

    fn shard(index: usize, total: usize) -> ShardIdentity {
        ShardIdentity::new(index, total).unwrap()
    }

    fn sh(script: &str) -> ProcessWorker {
        ProcessWorker::with_args("/bin/sh", vec!["-c".to_string(), script.to_string()])
    }

    // A dropped sender never signals shutdown
    fn idle() -> watch::Receiver<bool> {
        let (_tx, rx) = watch::channel(false);
        rx
    }

    #[test]
    fn test_classify_exit() {
        assert_eq!(classify_exit(ExitStatus::from_raw(0)), ShardStatus::Passed);
        assert_eq!(
            classify_exit(ExitStatus::from_raw(3 << 8)),
            ShardStatus::Failed { code: 3 }
        );
        assert_eq!(
            classify_exit(ExitStatus::from_raw(11)),
            ShardStatus::Crashed { signal: 11 }
        );
    }

    #[tokio::test]
    async fn test_shard_env_is_passed_to_child() {
        let worker = sh("echo \"index=$GTEST_SHARD_INDEX total=$GTEST_TOTAL_SHARDS\"");
        let outcome = worker.run_shard(shard(2, 5), idle()).await;

        assert_eq!(outcome.status, ShardStatus::Passed);
        assert_eq!(outcome.output, "index=2 total=5\n");
        assert_eq!(outcome.shard, shard(2, 5));
        assert!(outcome.finished_at >= outcome.started_at);
    }

    #[tokio::test]
    async fn test_stdout_and_stderr_are_combined_in_order() {
        let worker = sh("echo one; echo two >&2; echo three; echo four >&2");
        let outcome = worker.run_shard(shard(0, 1), idle()).await;

        assert_eq!(outcome.output, "one\ntwo\nthree\nfour\n");
    }

    #[tokio::test]
    async fn test_pass_through_args_are_forwarded() {
        let worker = ProcessWorker::with_args(
            "/bin/sh",
            vec![
                "-c".into(),
                "echo \"$0 $1\"".into(),
                "--gtest_filter=Foo.*".into(),
                "--gtest_repeat=2".into(),
            ],
        );
        let outcome = worker.run_shard(shard(0, 1), idle()).await;
        assert_eq!(outcome.output, "--gtest_filter=Foo.* --gtest_repeat=2\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let outcome = sh("echo '[  FAILED  ] Suite.Case'; exit 1")
            .run_shard(shard(0, 2), idle())
            .await;

        assert_eq!(outcome.status, ShardStatus::Failed { code: 1 });
        assert!(outcome.output.contains("[  FAILED  ] Suite.Case"));
    }

    #[tokio::test]
    async fn test_signal_is_crash() {
        let outcome = sh("echo before; kill -SEGV $$").run_shard(shard(1, 2), idle()).await;

        assert_eq!(outcome.status, ShardStatus::Crashed { signal: 11 });
        assert_eq!(outcome.output, "before\n");
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_failure() {
        let worker = ProcessWorker::with_args("/nonexistent/shardrun-test-binary", Vec::new());
        let outcome = worker.run_shard(shard(0, 1), idle()).await;

        assert!(matches!(outcome.status, ShardStatus::LaunchFailed { .. }));
        assert!(outcome.status.describe().starts_with("could not start"));
    }

    /// Run `worker` and raise shutdown after 200ms
    async fn interrupted(worker: ProcessWorker) -> (WorkerOutcome, Duration) {
        let (tx, rx) = watch::channel(false);

        let start = Instant::now();
        let handle = tokio::spawn(async move { worker.run_shard(shard(0, 1), rx).await });
        tokio::time::sleep(Duration::from_millis(200)).await;
        tx.send(true).unwrap();

        let outcome = handle.await.unwrap();
        (outcome, start.elapsed())
    }

    #[cfg(target_os = "linux")]
    fn is_running(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            // Zombies count as gone
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .is_some_and(|rest| !rest.trim_start().starts_with('Z')),
            Err(_) => false,
        }
    }

    #[tokio::test]
    async fn test_interrupt_stops_child() {
        let (outcome, elapsed) = interrupted(sh("echo started; sleep 30; echo done")).await;

        assert_eq!(outcome.status, ShardStatus::Interrupted);
        assert_eq!(outcome.output, "started\n");
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_interrupt_reaches_grandchildren() {
        let worker = sh("echo started; sleep 30 & echo $!; wait")
            .with_kill_grace(Duration::from_millis(500));
        let (outcome, elapsed) = interrupted(worker).await;

        assert_eq!(outcome.status, ShardStatus::Interrupted);
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");

        let mut lines = outcome.output.lines();
        assert_eq!(lines.next(), Some("started"));
        let grandchild: i32 = lines.next().unwrap().trim().parse().unwrap();

        #[cfg(target_os = "linux")]
        {
            let deadline = Instant::now() + Duration::from_secs(1);
            while is_running(grandchild) && Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            assert!(!is_running(grandchild), "pid {grandchild} survived");
        }
        #[cfg(not(target_os = "linux"))]
        let _ = grandchild;
    }

    #[tokio::test]
    async fn test_ignored_interrupt_escalates_to_kill() {
        let worker = sh("trap '' INT; echo started; sleep 30")
            .with_kill_grace(Duration::from_millis(300));
        let (outcome, elapsed) = interrupted(worker).await;

        assert_eq!(outcome.status, ShardStatus::Interrupted);
        assert_eq!(outcome.output, "started\n");
        assert!(elapsed >= Duration::from_millis(450), "took {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_uses_config_args() {
        let config = RunConfig::new("/bin/echo", 1)
            .with_test_args(vec!["hello".into()])
            .with_color(true);
        let outcome = ProcessWorker::new(&config).run_shard(shard(0, 1), idle()).await;
        assert_eq!(outcome.output, "--gtest_color=yes hello\n");
    }
}
