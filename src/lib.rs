//! Neo: runs the tagged directives an AI model embeds in its output.
//!
//! Text such as `<terminal>ls -la</terminal>` or `<network>ping:host</network>`
//! is parsed into commands, each command is routed to its protocol handler,
//! shell commands pass through an approval gate, and every directive yields
//! exactly one [`directives::ExecutionResult`].
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use neo::approver::TerminalPrompter;
//! use neo::config::load_config;
//! use neo::directives::Dispatcher;
//! use neo::executor::TerminalExecutor;
//! use neo::policy::ApprovalGate;
//!
//! # async fn example() {
//! let config = load_config(None).unwrap();
//! let gate = ApprovalGate::new(Arc::new(TerminalPrompter::new(true)));
//! let executor = Arc::new(TerminalExecutor::new(config.executor_settings()));
//! let dispatcher = Dispatcher::new(gate, executor.clone());
//! let mut policy = config.session_policy();
//! let report = dispatcher.process("<terminal>uptime</terminal>", &mut policy).await;
//! println!("{}", report.follow_up_prompt());
//! executor.shutdown().await;
//! # }
//! ```

pub mod approver;
pub mod build_info;
pub mod cli;
pub mod config;
pub mod directives;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod policy;
pub mod render;
#[cfg(test)]
pub mod testsupport;
pub mod textutil;
