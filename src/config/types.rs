//! Configuration data model.
//!
//! Every section and field has a default, so an empty file is a complete
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::{
    DEFAULT_DIRECT_TIMEOUT_SECS, DEFAULT_LAUNCH_TIMEOUT_SECS, DEFAULT_MAX_OUTPUT_BYTES,
    DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SESSION_NAME, DEFAULT_SHELL,
};
use crate::executor::{ExecutorMode, ExecutorSettings};
use crate::policy::SessionPolicyState;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub approval: ApprovalConfig,
    pub executor: ExecutorConfig,
    pub display: DisplayConfig,
}

impl Config {
    /// Policy flags a new session starts with.
    pub fn session_policy(&self) -> SessionPolicyState {
        SessionPolicyState::new(
            self.approval.require_approval,
            self.approval.auto_approve_all,
        )
    }

    /// How long the gate waits for an answer. `None` waits indefinitely.
    pub fn approval_timeout(&self) -> Option<Duration> {
        self.approval.timeout_secs.map(Duration::from_secs)
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        let e = &self.executor;
        ExecutorSettings {
            mode: e.mode,
            session_name: e.session_name.clone(),
            runtime_dir: e.runtime_dir.clone(),
            launch_timeout: Duration::from_secs(e.launch_timeout_secs),
            max_wait: Duration::from_secs(e.max_wait_secs),
            poll_interval: Duration::from_millis(e.poll_interval_ms),
            direct_timeout: Duration::from_secs(e.direct_timeout_secs),
            shell: e.shell.clone(),
        }
    }
}

/// `[approval]`: initial session policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApprovalConfig {
    pub require_approval: bool,
    pub auto_approve_all: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            require_approval: true,
            auto_approve_all: false,
            timeout_secs: None,
        }
    }
}

/// `[executor]`: where and how shell commands run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    pub mode: ExecutorMode,
    pub session_name: String,
    /// Defaults to `$TMPDIR/neo-<uid>-<session>`.
    pub runtime_dir: Option<PathBuf>,
    pub launch_timeout_secs: u64,
    pub max_wait_secs: u64,
    pub poll_interval_ms: u64,
    pub direct_timeout_secs: u64,
    pub shell: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutorMode::Auto,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            runtime_dir: None,
            launch_timeout_secs: DEFAULT_LAUNCH_TIMEOUT_SECS,
            max_wait_secs: DEFAULT_MAX_WAIT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            direct_timeout_secs: DEFAULT_DIRECT_TIMEOUT_SECS,
            shell: DEFAULT_SHELL.to_string(),
        }
    }
}

/// `[display]`: result rendering.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub color: bool,
    /// Command output beyond this many bytes is truncated.
    pub max_output_bytes: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config PATH`.
    Explicit(PathBuf),
    /// `./neo.toml`.
    Local,
    /// `<config dir>/neo/neo.toml`.
    Global(PathBuf),
    /// No file found.
    BuiltInDefaults,
}

/// Loaded config plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
}
