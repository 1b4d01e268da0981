//! Directive pipeline: tag parsing, protocol lookup, and dispatch.
//!
//! ```no_run
//! use neo::approver::TerminalPrompter;
//! use neo::directives::Dispatcher;
//! use neo::executor::TerminalExecutor;
//! use neo::policy::{ApprovalGate, SessionPolicyState};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let gate = ApprovalGate::new(Arc::new(TerminalPrompter::new(true)));
//! let executor = Arc::new(TerminalExecutor::default());
//! let dispatcher = Dispatcher::new(gate, executor.clone());
//! let mut policy = SessionPolicyState::default();
//! let report = dispatcher
//!     .process("<terminal>uptime</terminal>", &mut policy)
//!     .await;
//! println!("{}", report.follow_up_prompt());
//! executor.shutdown().await;
//! # }
//! ```

pub mod dispatcher;
pub mod parser;
pub mod registry;
pub mod result;

pub use dispatcher::Dispatcher;
pub use parser::{Directives, TagParser};
pub use registry::ProtocolRegistry;
pub use result::{DispatchReport, ExecutionResult};

/// One `(protocol, content)` pair extracted from model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Lower-cased tag name.
    pub protocol: String,
    /// Trimmed text between the tags.
    pub content: String,
}

impl Command {
    pub fn new(protocol: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            content: content.into(),
        }
    }
}
