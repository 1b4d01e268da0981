//! CLI argument parsing via clap.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::executor::ExecutorMode;

/// Run the tagged directives embedded in model output, with approval.
#[derive(Debug, Parser)]
#[command(
    name = "neo",
    version,
    long_version = crate::build_info::LONG_VERSION,
    after_help = crate::build_info::HELP_BUILD_METADATA
)]
pub struct Args {
    /// Text containing directives. Read from --file or stdin when omitted.
    pub text: Option<String>,

    /// Read the text from a file instead.
    #[arg(short = 'f', long = "file", conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Path to config file (default: ./neo.toml or ~/.config/neo/neo.toml).
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Where commands run: auto, tmux, background or direct.
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<ExecutorMode>,

    /// Start the session with approve-all already on. Destructive
    /// privileged commands still ask.
    #[arg(long = "auto-approve", conflicts_with = "no_approval")]
    pub auto_approve: bool,

    /// Run commands without asking. Destructive privileged commands still ask.
    #[arg(long = "no-approval")]
    pub no_approval: bool,

    /// Print results as JSON.
    #[arg(long = "json")]
    pub json: bool,

    /// Disable color output.
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Log at debug level (overrides RUST_LOG).
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Args {
    /// Apply flag overrides on top of file and env config.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.executor.mode = mode;
        }
        if self.auto_approve {
            config.approval.auto_approve_all = true;
        }
        if self.no_approval {
            config.approval.require_approval = false;
        }
        if self.no_color {
            config.display.color = false;
        }
    }
}
