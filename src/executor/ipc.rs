//! On-disk artifacts shared between the executor and its persistent worker.
//!
//! Everything lives in one private runtime directory:
//! - `worker.sh`: the worker loop
//! - `worker.pid`: identity record written by the worker once it is ready
//! - `handoff.fifo`: carries one sequence number per submitted command
//! - `command.sh`: body of the current command, sourced by the worker
//! - `output.log`: combined output of the current command
//! - `done`: completion marker, `<seq> <status>` or `timeout <seq>`

use nix::sys::signal::kill;
use nix::sys::stat::Mode;
use nix::unistd::{getuid, mkfifo, Pid};
use std::fs;
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Prefix of the status line the worker appends after each command. The
/// worker always writes a newline first, so the banner starts its own line
/// even when the command output lacks a trailing newline.
pub(crate) const BANNER_PREFIX: &str = "[neo-worker] ";

const WORKER_SCRIPT: &str = r#"#!/usr/bin/env bash
# neo persistent worker: runs one handed-off command at a time.
__neo_dir="$1"
printf '%s\n' "$$" > "$__neo_dir/worker.pid.tmp" && mv -f "$__neo_dir/worker.pid.tmp" "$__neo_dir/worker.pid"
exec 3<>"$__neo_dir/handoff.fifo"
while IFS= read -r __neo_seq <&3; do
  case "$__neo_seq" in
    ''|*[!0-9]*) continue ;;
  esac
  printf '\n[neo] #%s\n' "$__neo_seq"
  . "$__neo_dir/command.sh" >>"$__neo_dir/output.log" 2>&1 </dev/null
  __neo_status=$?
  cat "$__neo_dir/output.log" 2>/dev/null
  printf '\n[neo-worker] %s exit=%s\n' "$__neo_seq" "$__neo_status" >>"$__neo_dir/output.log"
  printf '%s %s\n' "$__neo_seq" "$__neo_status" >"$__neo_dir/done.tmp"
  mv -f "$__neo_dir/done.tmp" "$__neo_dir/done"
done
"#;

/// Parsed completion marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DoneMarker {
    Completed { seq: u64, status: i32 },
    /// Written by the executor when it stopped waiting.
    TimedOut { seq: u64 },
}

impl DoneMarker {
    pub(crate) fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let first = parts.next()?;
        let second = parts.next()?;
        if first == "timeout" {
            return Some(Self::TimedOut {
                seq: second.parse().ok()?,
            });
        }
        Some(Self::Completed {
            seq: first.parse().ok()?,
            status: second.parse().ok()?,
        })
    }
}

/// Paths of every IPC artifact for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RuntimePaths {
    pub dir: PathBuf,
    pub script: PathBuf,
    pub pid: PathBuf,
    pub fifo: PathBuf,
    pub command: PathBuf,
    pub output: PathBuf,
    pub done: PathBuf,
}

impl RuntimePaths {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self {
            script: dir.join("worker.sh"),
            pid: dir.join("worker.pid"),
            fifo: dir.join("handoff.fifo"),
            command: dir.join("command.sh"),
            output: dir.join("output.log"),
            done: dir.join("done"),
            dir,
        }
    }

    /// `$TMPDIR/neo-<uid>-<session>`.
    pub(crate) fn default_dir(session: &str) -> PathBuf {
        std::env::temp_dir().join(format!("neo-{}-{session}", getuid().as_raw()))
    }

    /// Create the private directory, the worker script and the FIFO, and
    /// clear any leftovers from a previous worker.
    pub(crate) fn prepare(&self) -> io::Result<()> {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&self.dir)?;
        fs::write(&self.script, WORKER_SCRIPT)?;
        fs::set_permissions(&self.script, fs::Permissions::from_mode(0o700))?;
        for stale in [&self.pid, &self.done, &self.command] {
            remove_if_exists(stale)?;
        }
        fs::write(&self.output, "")?;
        if !self.fifo.exists() {
            mkfifo(&self.fifo, Mode::S_IRUSR | Mode::S_IWUSR).map_err(io::Error::from)?;
        }
        Ok(())
    }

    pub(crate) async fn read_marker(&self) -> Option<DoneMarker> {
        let text = tokio::fs::read_to_string(&self.done).await.ok()?;
        DoneMarker::parse(&text)
    }

    pub(crate) async fn clear_marker(&self) -> io::Result<()> {
        match tokio::fs::remove_file(&self.done).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Unblock waiters for `seq` after the executor gives up on it.
    pub(crate) async fn write_timeout_marker(&self, seq: u64) -> io::Result<()> {
        tokio::fs::write(&self.done, format!("timeout {seq}\n")).await
    }

    /// Current output with worker banners removed.
    pub(crate) async fn read_output(&self) -> String {
        match tokio::fs::read(&self.output).await {
            Ok(bytes) => strip_banner(&String::from_utf8_lossy(&bytes)),
            Err(_) => String::new(),
        }
    }

    pub(crate) fn read_pid(&self) -> Option<i32> {
        fs::read_to_string(&self.pid).ok()?.trim().parse().ok()
    }

    /// Remove the runtime directory and every artifact in it.
    pub(crate) fn remove(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Whether `pid` is a live worker running our script as our user.
    pub(crate) fn is_worker_process(&self, pid: i32) -> bool {
        if pid <= 0 || kill(Pid::from_raw(pid), None).is_err() {
            return false;
        }
        let proc_dir = Path::new("/proc").join(pid.to_string());
        if !Path::new("/proc/self").exists() {
            // No procfs: signal delivery is the only check available.
            return true;
        }
        owned_by_current_user(&proc_dir) && cmdline_mentions(&proc_dir, &self.script)
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn owned_by_current_user(proc_dir: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(proc_dir).is_ok_and(|meta| meta.uid() == getuid().as_raw())
}

fn cmdline_mentions(proc_dir: &Path, script: &Path) -> bool {
    let Ok(raw) = fs::read(proc_dir.join("cmdline")) else {
        return false;
    };
    let cmdline = String::from_utf8_lossy(&raw);
    cmdline.contains(&*script.to_string_lossy())
}

/// Drop the trailing status banner, and the newline written before it,
/// from captured output. Output without a banner is returned unchanged.
pub(crate) fn strip_banner(output: &str) -> String {
    let marker = format!("\n{BANNER_PREFIX}");
    match output.rfind(&marker) {
        Some(at) if !output[at + 1..].trim_end_matches('\n').contains('\n') => {
            output[..at].to_string()
        }
        _ => output.to_string(),
    }
}
