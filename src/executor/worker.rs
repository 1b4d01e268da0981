//! Persistent shell worker: one long-lived bash process that sources each
//! handed-off command, so working directory and environment carry over.

use crate::error::DirectiveError;
use crate::policy::SudoPolicy;
use async_trait::async_trait;
use nix::fcntl::OFlag;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::CommandExt;
use std::process::{Child, Stdio};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use super::ipc::{DoneMarker, RuntimePaths};
use super::process::{ensure_success, format_duration, run_process, shell_quote};
use super::transport::ShellTransport;
use super::types::{ExecOutcome, ExecOutput, PendingCommand};

/// Process that hosts the worker loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WorkerHost {
    /// Detached tmux session; the user can attach and watch.
    Tmux { session: String },
    /// Detached child in its own process group.
    Background,
}

pub(crate) struct PersistentWorker {
    paths: RuntimePaths,
    host: WorkerHost,
    shell: String,
    poll: Duration,
    sudo: SudoPolicy,
    pid: Option<i32>,
    child: Option<Child>,
    next_seq: u64,
}

impl PersistentWorker {
    pub(crate) fn new(paths: RuntimePaths, host: WorkerHost, shell: &str, poll: Duration) -> Self {
        Self {
            paths,
            host,
            shell: shell.to_string(),
            poll,
            sudo: SudoPolicy::new(),
            pid: None,
            child: None,
            next_seq: 0,
        }
    }

    pub(crate) fn pid(&self) -> Option<i32> {
        self.pid
    }

    /// Reuse a worker left running in the same runtime directory.
    pub(crate) fn adopt_existing(&mut self) -> bool {
        let Some(pid) = self.paths.read_pid() else {
            return false;
        };
        if !self.paths.is_worker_process(pid) {
            return false;
        }
        info!(pid, dir = %self.paths.dir.display(), "adopting live worker");
        self.pid = Some(pid);
        true
    }

    /// Start the worker and wait for its identity record.
    pub(crate) async fn launch(&mut self, ready_within: Duration) -> Result<(), DirectiveError> {
        self.paths.prepare().map_err(|e| {
            DirectiveError::ProcessLaunchFailure(format!(
                "failed to prepare {}: {e}",
                self.paths.dir.display()
            ))
        })?;

        let script = self.paths.script.to_string_lossy().into_owned();
        let dir = self.paths.dir.to_string_lossy().into_owned();
        let cwd = std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "/".to_string());

        match &self.host {
            WorkerHost::Tmux { session } => {
                // A stale session with our name would make new-session fail.
                let _ = run_process("tmux", &["kill-session".into(), "-t".into(), session.clone()])
                    .await;
                let launch = format!(
                    "{} {} {}",
                    shell_quote(&self.shell),
                    shell_quote(&script),
                    shell_quote(&dir)
                );
                let out = run_process(
                    "tmux",
                    &[
                        "new-session".into(),
                        "-d".into(),
                        "-s".into(),
                        session.clone(),
                        "-c".into(),
                        cwd,
                        launch,
                    ],
                )
                .await?;
                ensure_success(out, "tmux new-session")?;
            }
            WorkerHost::Background => {
                let child = std::process::Command::new(&self.shell)
                    .arg(&script)
                    .arg(&dir)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .process_group(0)
                    .spawn()
                    .map_err(|e| {
                        DirectiveError::ProcessLaunchFailure(format!("{}: {e}", self.shell))
                    })?;
                self.child = Some(child);
            }
        }

        let deadline = Instant::now() + ready_within;
        loop {
            if let Some(pid) = self.paths.read_pid() {
                if self.paths.is_worker_process(pid) {
                    debug!(pid, "worker ready");
                    self.pid = Some(pid);
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                self.terminate();
                return Err(DirectiveError::ProcessLaunchFailure(format!(
                    "worker did not report ready within {}",
                    format_duration(ready_within)
                )));
            }
            sleep(self.poll).await;
        }
    }

    pub(crate) fn is_alive(&mut self) -> bool {
        if let Some(child) = self.child.as_mut() {
            if !matches!(child.try_wait(), Ok(None)) {
                return false;
            }
        }
        self.pid.is_some_and(|pid| self.paths.is_worker_process(pid))
    }

    pub(crate) async fn last_marker(&self) -> Option<DoneMarker> {
        self.paths.read_marker().await
    }

    /// Stop the worker process. Idempotent.
    pub(crate) fn terminate(&mut self) {
        if let WorkerHost::Tmux { session } = &self.host {
            let _ = std::process::Command::new("tmux")
                .args(["kill-session", "-t", session])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }
        if let Some(pid) = self.pid.take() {
            let target = Pid::from_raw(pid);
            if killpg(target, Signal::SIGTERM).is_err() {
                let _ = kill(target, Signal::SIGTERM);
            }
        }
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Stop the worker and remove every IPC artifact.
    pub(crate) fn cleanup(&mut self) {
        self.terminate();
        if let Err(e) = self.paths.remove() {
            warn!("failed to remove {}: {e}", self.paths.dir.display());
        }
    }

    fn hand_off(&self, seq: u64) -> std::io::Result<()> {
        // Non-blocking so a vanished reader fails fast instead of hanging.
        let mut fifo = std::fs::OpenOptions::new()
            .write(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(&self.paths.fifo)?;
        fifo.write_all(format!("{seq}\n").as_bytes())
    }
}

#[async_trait]
impl ShellTransport for PersistentWorker {
    async fn submit(&mut self, command: &str) -> Result<PendingCommand, DirectiveError> {
        self.next_seq += 1;
        let seq = self.next_seq;

        self.paths.clear_marker().await?;
        tokio::fs::write(&self.paths.output, "").await?;
        tokio::fs::write(&self.paths.command, format!("{command}\n")).await?;
        self.hand_off(seq).map_err(|e| {
            DirectiveError::ProcessLaunchFailure(format!("worker handoff channel unavailable: {e}"))
        })?;
        debug!(seq, "command handed to worker");

        Ok(PendingCommand {
            seq,
            command: command.to_string(),
            submitted: Instant::now(),
        })
    }

    async fn wait(
        &mut self,
        pending: PendingCommand,
        max_wait: Duration,
    ) -> Result<ExecOutcome, DirectiveError> {
        let deadline = pending.submitted + max_wait;
        loop {
            match self.paths.read_marker().await {
                Some(DoneMarker::Completed { seq, status }) if seq == pending.seq => {
                    let output = ExecOutput {
                        exit_code: status,
                        stdout: self.paths.read_output().await,
                        stderr: String::new(),
                    };
                    if self.sudo.is_auth_failure(&pending.command, &output.stdout) {
                        warn!(seq, "elevation prompt rejected");
                        return Ok(ExecOutcome::AuthFailure(output));
                    }
                    return Ok(ExecOutcome::Completed(output));
                }
                Some(other) => debug!(?other, expected = pending.seq, "ignoring stale marker"),
                None => {}
            }

            if !self.is_alive() {
                warn!(seq = pending.seq, "worker exited before completing command");
                return Ok(ExecOutcome::Completed(ExecOutput {
                    exit_code: -1,
                    stdout: self.paths.read_output().await,
                    stderr: "worker exited before reporting completion".to_string(),
                }));
            }

            if Instant::now() >= deadline {
                warn!(seq = pending.seq, "command exceeded {}", format_duration(max_wait));
                self.paths.write_timeout_marker(pending.seq).await?;
                return Ok(ExecOutcome::TimedOut {
                    waited: max_wait,
                    partial: self.paths.read_output().await,
                });
            }
            sleep(self.poll).await;
        }
    }
}

impl Drop for PersistentWorker {
    fn drop(&mut self) {
        self.cleanup();
    }
}
