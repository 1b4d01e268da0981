//! Protocol handlers.
//!
//! A handler receives the content of one directive. Direct handlers finish
//! the work themselves (memory, files). Translating handlers turn a
//! `verb:params` request into a [`ShellDirective`] and hand it back; the
//! dispatcher runs it through the [`TerminalHandler`], so no handler ever
//! calls another one.

pub mod analyze;
pub mod files;
pub mod grammar;
pub mod memory;
pub mod monitor;
pub mod network;
pub mod search;
pub mod security;
pub mod state;
pub mod terminal;

use crate::directives::result::ExecutionResult;
use crate::error::DirectiveError;
use crate::policy::{ApprovalGate, SessionPolicyState};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub use analyze::AnalyzeHandler;
pub use files::FilesHandler;
pub use memory::MemoryHandler;
pub use monitor::MonitorHandler;
pub use network::NetworkHandler;
pub use search::SearchHandler;
pub use security::SecurityHandler;
pub use state::StateHandler;
pub use terminal::TerminalHandler;

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Everything a handler may touch while processing one directive.
pub struct HandlerContext<'a> {
    pub gate: &'a ApprovalGate,
    pub policy: &'a mut SessionPolicyState,
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The action ran (or was refused) in-process.
    Completed(ExecutionResult),
    /// A shell command for the terminal handler to authorize and run.
    Delegate(ShellDirective),
}

/// Shell command synthesized by a translating handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellDirective {
    pub command: String,
    pub meta: BTreeMap<String, String>,
    /// Prompt even when the session auto-approves.
    pub force_approval: bool,
}

impl ShellDirective {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            meta: BTreeMap::new(),
            force_approval: false,
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    pub fn forced(mut self) -> Self {
        self.force_approval = true;
        self
    }
}

/// One protocol's directive handler.
///
/// Unrecognized verbs are reported as [`DirectiveError::MalformedSubcommand`]
/// with a message listing the valid ones.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Tag name this handler answers to.
    fn protocol(&self) -> &'static str;

    async fn handle(
        &self,
        content: &str,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, DirectiveError>;
}
