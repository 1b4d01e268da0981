//! Text in, one result per directive out.

use super::parser::TagParser;
use super::registry::ProtocolRegistry;
use super::result::{DispatchReport, ExecutionResult};
use super::Command;
use crate::executor::TerminalExecutor;
use crate::handlers::{HandlerContext, HandlerOutcome, TerminalHandler};
use crate::policy::{ApprovalGate, SessionPolicyState};
use std::sync::Arc;
use tracing::{debug, warn};

/// Parses directives, routes each to its handler, and runs delegated shell
/// commands through the terminal handler.
///
/// Directives are processed one after another, in text order. A failing
/// directive never stops the ones after it.
#[derive(Debug)]
pub struct Dispatcher {
    parser: TagParser,
    registry: ProtocolRegistry,
    terminal: Arc<TerminalHandler>,
    gate: ApprovalGate,
}

impl Dispatcher {
    /// Dispatcher with every built-in handler registered.
    pub fn new(gate: ApprovalGate, executor: Arc<TerminalExecutor>) -> Self {
        Self::with_terminal(gate, Arc::new(TerminalHandler::new(executor)))
    }

    pub fn with_terminal(gate: ApprovalGate, terminal: Arc<TerminalHandler>) -> Self {
        let registry = ProtocolRegistry::with_default_handlers(terminal.clone());
        Self::with_registry(gate, terminal, registry)
    }

    /// Dispatcher over a caller-built registry. `terminal` runs delegated
    /// shell directives whether or not it is registered.
    pub fn with_registry(
        gate: ApprovalGate,
        terminal: Arc<TerminalHandler>,
        registry: ProtocolRegistry,
    ) -> Self {
        Self {
            parser: TagParser::new(),
            registry,
            terminal,
            gate,
        }
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProtocolRegistry {
        &mut self.registry
    }

    pub fn gate(&self) -> &ApprovalGate {
        &self.gate
    }

    pub fn executor(&self) -> &Arc<TerminalExecutor> {
        self.terminal.executor()
    }

    /// Process every directive in `text`.
    pub async fn process(&self, text: &str, policy: &mut SessionPolicyState) -> DispatchReport {
        let mut report = DispatchReport::default();
        for command in self.parser.parse(text) {
            report.push(self.dispatch(&command, policy).await);
        }
        debug!(directives = report.len(), "processed text");
        report
    }

    /// Process one directive. Every failure becomes an error-bearing result.
    pub async fn dispatch(
        &self,
        command: &Command,
        policy: &mut SessionPolicyState,
    ) -> ExecutionResult {
        let Command { protocol, content } = command;
        debug!(%protocol, content = %preview(content), "dispatching directive");

        let handler = match self.registry.resolve(protocol) {
            Ok(handler) => handler,
            Err(e) => {
                warn!(%protocol, "unknown protocol; skipping directive");
                return ExecutionResult::from_error(protocol, content, &e);
            }
        };

        let mut ctx = HandlerContext {
            gate: &self.gate,
            policy,
        };
        match handler.handle(content, &mut ctx).await {
            Ok(HandlerOutcome::Completed(result)) => result,
            Ok(HandlerOutcome::Delegate(directive)) => {
                self.terminal.run(protocol, directive, &mut ctx).await
            }
            Err(e) => {
                debug!(%protocol, kind = %e.kind(), "directive failed: {e}");
                ExecutionResult::from_error(protocol, content, &e)
            }
        }
    }
}

fn preview(content: &str) -> &str {
    crate::textutil::safe_prefix_by_bytes(content, 50)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::executor::{ExecutorMode, ExecutorSettings};
    use crate::testsupport::ScriptedPrompter;

    fn dispatcher(answers: &[&str]) -> (Dispatcher, Arc<ScriptedPrompter>) {
        let prompter = Arc::new(ScriptedPrompter::new(answers));
        let executor = Arc::new(TerminalExecutor::new(ExecutorSettings {
            mode: ExecutorMode::Direct,
            ..ExecutorSettings::default()
        }));
        (
            Dispatcher::new(ApprovalGate::new(prompter.clone()), executor),
            prompter,
        )
    }

    #[tokio::test]
    async fn approved_terminal_command_executes() {
        let (d, _) = dispatcher(&["y"]);
        let mut policy = SessionPolicyState::default();
        let report = d.process("<terminal>ls -la /tmp</terminal>", &mut policy).await;
        assert_eq!(report.len(), 1);
        let result = &report.results[0];
        assert_eq!(result.protocol, "terminal");
        assert!(result.executed);
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn unknown_protocol_does_not_stop_siblings() {
        let (d, _) = dispatcher(&[]);
        let mut policy = SessionPolicyState::default();
        let report = d
            .process("<foo>bar</foo><memory>save:k=v</memory>", &mut policy)
            .await;
        let grouped = report.by_protocol();
        let foo = grouped["foo"][0];
        assert_eq!(foo.error.as_deref(), Some("Unknown protocol 'foo'"));
        assert_eq!(foo.kind, Some(ErrorKind::UnknownProtocol));
        assert!(report.latest_by_protocol()["memory"].executed);
    }

    #[tokio::test]
    async fn denied_file_write_reports_message() {
        let (d, _) = dispatcher(&["n"]);
        let mut policy = SessionPolicyState::default();
        let report = d
            .process("<files>write:/root/protected.txt hello</files>", &mut policy)
            .await;
        let result = &report.results[0];
        assert!(!result.executed);
        assert_eq!(result.output, "File writing was denied.");
    }

    #[tokio::test]
    async fn network_directive_is_delegated_to_terminal() {
        let (d, prompter) = dispatcher(&["n"]);
        let mut policy = SessionPolicyState::default();
        let report = d.process("<network>ping:127.0.0.1</network>", &mut policy).await;
        let result = &report.results[0];
        assert_eq!(result.protocol, "network");
        assert_eq!(result.command, "ping -c 4 127.0.0.1");
        assert_eq!(result.meta["network_operation"], "ping");
        assert_eq!(prompter.requests()[0].command, "ping -c 4 127.0.0.1");
        assert_eq!(result.output, "Command execution was denied.");
    }

    #[tokio::test]
    async fn approve_all_carries_to_later_directives() {
        let (d, prompter) = dispatcher(&["t"]);
        let mut policy = SessionPolicyState::default();
        let report = d
            .process("<terminal>echo one</terminal><terminal>echo two</terminal>", &mut policy)
            .await;
        assert!(policy.auto_approve_all);
        assert_eq!(prompter.requests().len(), 1);
        let outputs: Vec<_> = report.by_protocol()["terminal"]
            .iter()
            .map(|r| r.output.clone())
            .collect();
        assert_eq!(outputs, ["one\n", "two\n"]);
    }

    #[tokio::test]
    async fn malformed_subcommand_becomes_error_result() {
        let (d, _) = dispatcher(&[]);
        let mut policy = SessionPolicyState::default();
        let report = d.process("<memory>forget:x</memory>", &mut policy).await;
        let result = &report.results[0];
        assert!(!result.executed);
        assert_eq!(result.kind, Some(ErrorKind::MalformedSubcommand));
        assert_eq!(
            result.output,
            "Unknown memory command. Use save:, get:, list, or clear."
        );
    }

    #[tokio::test]
    async fn text_without_tags_yields_empty_report() {
        let (d, _) = dispatcher(&[]);
        let mut policy = SessionPolicyState::default();
        let report = d.process("no directives here", &mut policy).await;
        assert!(report.is_empty());
        assert_eq!(report.follow_up_prompt(), "");
    }
}
