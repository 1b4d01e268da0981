//! Default configuration constants.

/// Local config file name, looked up in the working directory.
pub(super) const LOCAL_CONFIG_FILE: &str = "neo.toml";
/// Directory under the platform config root holding the global file.
pub(super) const GLOBAL_CONFIG_DIR: &str = "neo";

pub(super) const DEFAULT_SESSION_NAME: &str = "neo";
pub(super) const DEFAULT_SHELL: &str = "bash";
pub(super) const DEFAULT_LAUNCH_TIMEOUT_SECS: u64 = 10;
/// Ceiling on how long one command may run in the persistent worker.
pub(super) const DEFAULT_MAX_WAIT_SECS: u64 = 180;
pub(super) const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub(super) const DEFAULT_DIRECT_TIMEOUT_SECS: u64 = 30;
pub(super) const DEFAULT_MAX_OUTPUT_BYTES: usize = crate::handlers::terminal::DEFAULT_MAX_OUTPUT_BYTES;
