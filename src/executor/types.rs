//! Shared executor data structures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::time::{Duration, Instant};

/// Structured process output for one shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    /// Stdout followed by stderr, the way a terminal would have shown them.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => {
                let sep = if self.stdout.ends_with('\n') { "" } else { "\n" };
                format!("{}{sep}{}", self.stdout, self.stderr)
            }
        }
    }
}

/// How one submitted command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    Completed(ExecOutput),
    /// The command ran but its elevation prompt was rejected.
    AuthFailure(ExecOutput),
    /// The wait ceiling passed; the command may still be running.
    TimedOut { waited: Duration, partial: String },
}

/// Handle for a command that has been handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    pub seq: u64,
    pub command: String,
    pub submitted: Instant,
}

/// Lifecycle of the persistent worker, as seen by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorState {
    #[default]
    Uninitialized,
    Launching,
    Idle,
    Busy,
    Failed,
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::Launching => "launching",
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Where commands run.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    /// tmux when installed, otherwise direct.
    #[default]
    Auto,
    /// Persistent worker inside a detached tmux session.
    Tmux,
    /// Persistent worker as a detached background process.
    Background,
    /// One subprocess per command, no persistence.
    Direct,
}

impl FromStr for ExecutorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "tmux" => Ok(Self::Tmux),
            "background" => Ok(Self::Background),
            "direct" => Ok(Self::Direct),
            other => Err(format!(
                "unknown executor mode `{other}`: expected auto, tmux, background or direct"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_joins_streams_with_newline() {
        let out = ExecOutput {
            exit_code: 1,
            stdout: "a".into(),
            stderr: "b\n".into(),
        };
        assert_eq!(out.combined(), "a\nb\n");
        let out = ExecOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: "only err".into(),
        };
        assert_eq!(out.combined(), "only err");
    }

    #[test]
    fn executor_mode_parses_case_insensitively() {
        assert_eq!("TMUX".parse::<ExecutorMode>(), Ok(ExecutorMode::Tmux));
        assert_eq!(" direct ".parse::<ExecutorMode>(), Ok(ExecutorMode::Direct));
        assert!("pty".parse::<ExecutorMode>().is_err());
    }

    #[test]
    fn executor_state_labels() {
        assert_eq!(ExecutorState::default().to_string(), "uninitialized");
        assert_eq!(ExecutorState::Busy.to_string(), "busy");
    }
}
