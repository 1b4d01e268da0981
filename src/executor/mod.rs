//! Terminal executor: owns the persistent worker and runs one command at a
//! time through it.
//!
//! State machine:
//! - `Uninitialized -> Launching` on the first command when no live worker
//!   is found in the runtime directory.
//! - `Launching -> Idle` once the worker writes its pid file. Missing the
//!   launch window moves to `Failed` and runs that one command directly.
//! - `Idle -> Busy -> Idle` per command.
//! - `Busy -> Failed` when the wait ceiling passes. The worker is then
//!   suspect: the next command reuses it only if the late command has
//!   since finished, and otherwise relaunches it.
//!
//! Without tmux in `auto` mode, or in `direct` mode, every command runs as
//! a plain subprocess with a fixed timeout.

mod ipc;
pub mod process;
mod transport;
pub mod types;
mod worker;

use crate::error::DirectiveError;
use std::path::PathBuf;
use tokio::sync::{watch, Mutex};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use ipc::{DoneMarker, RuntimePaths};
use process::program_available;
use transport::{DirectShell, ShellTransport};
use worker::{PersistentWorker, WorkerHost};

pub use process::shell_quote;
pub use types::{ExecOutcome, ExecOutput, ExecutorMode, ExecutorState, PendingCommand};

/// Executor tuning, normally derived from `[executor]` config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    pub mode: ExecutorMode,
    pub session_name: String,
    /// Defaults to `$TMPDIR/neo-<uid>-<session>`.
    pub runtime_dir: Option<PathBuf>,
    pub launch_timeout: Duration,
    pub max_wait: Duration,
    pub poll_interval: Duration,
    pub direct_timeout: Duration,
    pub shell: String,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            mode: ExecutorMode::Auto,
            session_name: "neo".to_string(),
            runtime_dir: None,
            launch_timeout: Duration::from_secs(10),
            max_wait: Duration::from_secs(180),
            poll_interval: Duration::from_millis(100),
            direct_timeout: Duration::from_secs(30),
            shell: "bash".to_string(),
        }
    }
}

impl ExecutorSettings {
    fn runtime_paths(&self) -> RuntimePaths {
        let dir = self
            .runtime_dir
            .clone()
            .unwrap_or_else(|| RuntimePaths::default_dir(&self.session_name));
        RuntimePaths::new(dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Persistent,
    Direct,
}

struct ExecutorInner {
    route: Option<Route>,
    host: Option<WorkerHost>,
    worker: Option<PersistentWorker>,
    direct: DirectShell,
    /// Sequence number of a command the executor stopped waiting for.
    suspect: Option<u64>,
}

/// Runs shell commands, one at a time, on behalf of every handler.
pub struct TerminalExecutor {
    settings: ExecutorSettings,
    inner: Mutex<ExecutorInner>,
    state: watch::Sender<ExecutorState>,
}

impl TerminalExecutor {
    pub fn new(settings: ExecutorSettings) -> Self {
        let direct = DirectShell::new(&settings.shell, settings.direct_timeout);
        let (state, _) = watch::channel(ExecutorState::Uninitialized);
        Self {
            settings,
            inner: Mutex::new(ExecutorInner {
                route: None,
                host: None,
                worker: None,
                direct,
                suspect: None,
            }),
            state,
        }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    pub fn state(&self) -> ExecutorState {
        *self.state.borrow()
    }

    /// Observe state transitions (for status displays).
    pub fn subscribe(&self) -> watch::Receiver<ExecutorState> {
        self.state.subscribe()
    }

    /// Where the worker's artifacts live when one is in use.
    pub fn runtime_dir(&self) -> PathBuf {
        self.settings.runtime_paths().dir
    }

    /// Run one command. Concurrent callers queue on the executor lock, so
    /// a second handoff never starts before the first completes.
    pub async fn execute(&self, command: &str) -> Result<ExecOutcome, DirectiveError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if self.resolve_route(inner).await == Route::Direct {
            self.set_state(ExecutorState::Busy);
            let outcome = inner.direct.run(command).await;
            self.set_state(ExecutorState::Idle);
            return outcome;
        }

        if let Err(e) = self.ensure_worker(inner).await {
            warn!("persistent worker unavailable ({e}); running command directly");
            self.set_state(ExecutorState::Failed);
            return inner.direct.run(command).await;
        }
        let Some(worker) = inner.worker.as_mut() else {
            return inner.direct.run(command).await;
        };

        self.set_state(ExecutorState::Busy);
        let pending = match worker.submit(command).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("handoff failed ({e}); dropping worker and running directly");
                inner.worker = None;
                self.set_state(ExecutorState::Failed);
                return inner.direct.run(command).await;
            }
        };
        let seq = pending.seq;
        let outcome = worker.wait(pending, self.settings.max_wait).await;

        match &outcome {
            Ok(ExecOutcome::TimedOut { .. }) => {
                inner.suspect = Some(seq);
                self.set_state(ExecutorState::Failed);
            }
            _ if !worker.is_alive() => {
                info!("worker exited; a fresh one starts with the next command");
                inner.worker = None;
                self.set_state(ExecutorState::Uninitialized);
            }
            _ => self.set_state(ExecutorState::Idle),
        }
        outcome
    }

    /// Terminate the worker and remove its runtime directory.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(mut worker) = inner.worker.take() {
            info!("shutting down persistent worker");
            worker.cleanup();
        }
        inner.suspect = None;
        self.set_state(ExecutorState::Uninitialized);
    }

    async fn resolve_route(&self, inner: &mut ExecutorInner) -> Route {
        if let Some(route) = inner.route {
            return route;
        }
        let (route, host) = match self.settings.mode {
            ExecutorMode::Direct => (Route::Direct, None),
            ExecutorMode::Background => (Route::Persistent, Some(WorkerHost::Background)),
            ExecutorMode::Tmux => (Route::Persistent, Some(self.tmux_host())),
            ExecutorMode::Auto => {
                if program_available("tmux", "-V").await {
                    (Route::Persistent, Some(self.tmux_host()))
                } else {
                    info!("tmux not found; running commands directly");
                    (Route::Direct, None)
                }
            }
        };
        debug!(?route, mode = ?self.settings.mode, "executor route resolved");
        inner.route = Some(route);
        inner.host = host;
        route
    }

    fn tmux_host(&self) -> WorkerHost {
        WorkerHost::Tmux {
            session: self.settings.session_name.clone(),
        }
    }

    async fn ensure_worker(&self, inner: &mut ExecutorInner) -> Result<(), DirectiveError> {
        if let Some(seq) = inner.suspect.take() {
            let recovered = match inner.worker.as_mut() {
                Some(worker) => {
                    worker.is_alive()
                        && matches!(
                            worker.last_marker().await,
                            Some(DoneMarker::Completed { seq: done, .. }) if done == seq
                        )
                }
                None => false,
            };
            if recovered {
                info!(seq, "suspect worker finished its late command; reusing it");
            } else {
                warn!(seq, "suspect worker still busy or gone; relaunching");
                inner.worker = None;
            }
        }

        if let Some(worker) = inner.worker.as_mut() {
            if worker.is_alive() {
                return Ok(());
            }
            warn!("worker is no longer alive; relaunching");
            inner.worker = None;
        }

        self.set_state(ExecutorState::Launching);
        let host = inner.host.clone().unwrap_or(WorkerHost::Background);
        let mut worker = PersistentWorker::new(
            self.settings.runtime_paths(),
            host,
            &self.settings.shell,
            self.settings.poll_interval,
        );
        if !worker.adopt_existing() {
            info!(dir = %self.runtime_dir().display(), "launching persistent worker");
            worker.launch(self.settings.launch_timeout).await?;
        }
        inner.worker = Some(worker);
        self.set_state(ExecutorState::Idle);
        Ok(())
    }

    fn set_state(&self, next: ExecutorState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(%prev, %next, "executor state");
        }
    }
}

impl Default for TerminalExecutor {
    fn default() -> Self {
        Self::new(ExecutorSettings::default())
    }
}

impl std::fmt::Debug for TerminalExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalExecutor")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
