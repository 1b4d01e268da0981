//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Command-line flags (applied by the binary after loading)
//! 2. Environment variables (`NEO_REQUIRE_APPROVAL`, `NEO_AUTO_APPROVE`,
//!    `NEO_EXECUTOR_MODE`, `NEO_MAX_WAIT_SECS`)
//! 3. TOML file specified via `--config`
//! 4. `./neo.toml` in the current directory
//! 5. `$XDG_CONFIG_HOME/neo/neo.toml` (or the platform equivalent)
//! 6. Built-in defaults

mod defaults;
mod env;
mod loader;
mod sources;
mod types;

pub use env::{ENV_AUTO_APPROVE, ENV_EXECUTOR_MODE, ENV_MAX_WAIT_SECS, ENV_REQUIRE_APPROVAL};
pub use loader::{load_config, load_config_with_source};
pub use types::{
    ApprovalConfig, Config, ConfigSource, DisplayConfig, ExecutorConfig, LoadedConfig,
};
