//! `terminal`: shell commands, verbatim, through approval and the executor.
//!
//! Also the sink for every [`ShellDirective`] other handlers synthesize.

use super::{Handler, HandlerContext, HandlerOutcome, ShellDirective};
use crate::directives::result::ExecutionResult;
use crate::error::{DirectiveError, ErrorKind};
use crate::executor::{ExecOutcome, ExecOutput, TerminalExecutor};
use crate::policy::SudoPolicy;
use crate::textutil::cap_output;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16_000;

const DENIED: &str = "Command execution was denied.";

#[derive(Debug)]
pub struct TerminalHandler {
    executor: Arc<TerminalExecutor>,
    sudo: SudoPolicy,
    max_output_bytes: usize,
}

impl TerminalHandler {
    pub fn new(executor: Arc<TerminalExecutor>) -> Self {
        Self {
            executor,
            sudo: SudoPolicy::new(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }

    pub fn executor(&self) -> &Arc<TerminalExecutor> {
        &self.executor
    }

    /// Authorize and execute one shell directive on behalf of `protocol`.
    /// Always yields exactly one result.
    pub async fn run(
        &self,
        protocol: &str,
        directive: ShellDirective,
        ctx: &mut HandlerContext<'_>,
    ) -> ExecutionResult {
        let ShellDirective {
            command,
            meta,
            force_approval,
        } = directive;

        let decision = if force_approval {
            ctx.gate.authorize_forced(&command).await
        } else {
            ctx.gate.authorize(&command, ctx.policy).await
        };
        let mut result = if decision.approved {
            let runnable = self.sudo.sanitize(&command);
            if runnable != command {
                debug!(%runnable, "inserted elevation prompt");
            }
            match self.executor.execute(&runnable).await {
                Ok(outcome) => self.outcome_result(protocol, &command, outcome),
                Err(e) => {
                    warn!(protocol, "command failed to run: {e}");
                    ExecutionResult::from_error(protocol, &command, &e)
                }
            }
        } else {
            ExecutionResult::failure(protocol, &command, ErrorKind::Denied, DENIED)
        };
        result.meta.extend(meta);
        result
    }

    fn outcome_result(&self, protocol: &str, command: &str, outcome: ExecOutcome) -> ExecutionResult {
        match outcome {
            ExecOutcome::Completed(output) => {
                let exit_code = output.exit_code;
                ExecutionResult::completed(protocol, command, self.render(&output))
                    .with_meta("exit_code", exit_code.to_string())
            }
            ExecOutcome::AuthFailure(output) => {
                warn!(protocol, command, "authentication failure");
                let err = DirectiveError::AuthFailure(
                    "elevation prompt was rejected or no password was provided".to_string(),
                );
                let mut result = ExecutionResult::from_error(protocol, command, &err);
                result.output = self.render(&output);
                result.executed = true;
                result.with_meta("exit_code", output.exit_code.to_string())
            }
            ExecOutcome::TimedOut { waited, partial } => {
                let err = DirectiveError::Timeout {
                    waited,
                    partial: cap_output(&partial, self.max_output_bytes),
                };
                let mut result = ExecutionResult::from_error(protocol, command, &err);
                // The command was handed off and may still be running.
                result.executed = true;
                result
            }
        }
    }

    fn render(&self, output: &ExecOutput) -> String {
        let text = output.combined();
        if text.trim().is_empty() && output.exit_code != 0 {
            return format!("Command exited with status {}", output.exit_code);
        }
        cap_output(&text, self.max_output_bytes)
    }
}

#[async_trait]
impl Handler for TerminalHandler {
    fn protocol(&self) -> &'static str {
        "terminal"
    }

    async fn handle(
        &self,
        content: &str,
        _ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, DirectiveError> {
        if content.trim().is_empty() {
            return Err(DirectiveError::MalformedSubcommand(
                "Empty terminal command.".to_string(),
            ));
        }
        Ok(HandlerOutcome::Delegate(ShellDirective::new(content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutorMode, ExecutorSettings};
    use crate::policy::{ApprovalGate, SessionPolicyState};
    use crate::testsupport::ScriptedPrompter;
    use std::time::Duration;

    fn handler(timeout: Duration) -> TerminalHandler {
        TerminalHandler::new(Arc::new(TerminalExecutor::new(ExecutorSettings {
            mode: ExecutorMode::Direct,
            direct_timeout: timeout,
            ..ExecutorSettings::default()
        })))
    }

    async fn run_with(
        handler: &TerminalHandler,
        directive: ShellDirective,
        answers: &[&str],
        policy: &mut SessionPolicyState,
    ) -> (ExecutionResult, Arc<ScriptedPrompter>) {
        let prompter = Arc::new(ScriptedPrompter::new(answers));
        let gate = ApprovalGate::new(prompter.clone());
        let mut ctx = HandlerContext {
            gate: &gate,
            policy,
        };
        (handler.run("terminal", directive, &mut ctx).await, prompter)
    }

    #[tokio::test]
    async fn approved_command_runs_and_records_exit_code() {
        let h = handler(Duration::from_secs(5));
        let mut policy = SessionPolicyState::default();
        let (result, prompter) =
            run_with(&h, ShellDirective::new("echo hi"), &["y"], &mut policy).await;
        assert!(result.executed);
        assert_eq!(result.error, None);
        assert_eq!(result.output, "hi\n");
        assert_eq!(result.meta["exit_code"], "0");
        assert_eq!(prompter.requests().len(), 1);
    }

    #[tokio::test]
    async fn denial_does_not_run_the_command() {
        let tmp = crate::testsupport::TestTempDir::new("terminal-deny");
        let marker = tmp.child("ran");
        let h = handler(Duration::from_secs(5));
        let mut policy = SessionPolicyState::default();
        let cmd = format!("touch {}", marker.display());
        let (result, _) = run_with(&h, ShellDirective::new(cmd), &["n"], &mut policy).await;
        assert!(!result.executed);
        assert_eq!(result.output, "Command execution was denied.");
        assert_eq!(result.kind, Some(ErrorKind::Denied));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn forced_directive_prompts_under_auto_approve() {
        let h = handler(Duration::from_secs(5));
        let mut policy = SessionPolicyState::new(true, true);
        let directive = ShellDirective::new("echo forced").forced();
        let (result, prompter) = run_with(&h, directive, &[], &mut policy).await;
        assert_eq!(prompter.requests().len(), 1);
        assert!(prompter.requests()[0].forced);
        assert!(!result.executed);
    }

    #[tokio::test]
    async fn silent_failure_reports_exit_status() {
        let h = handler(Duration::from_secs(5));
        let mut policy = SessionPolicyState::new(false, false);
        let (result, _) = run_with(&h, ShellDirective::new("exit 4"), &[], &mut policy).await;
        assert!(result.executed);
        assert_eq!(result.output, "Command exited with status 4");
        assert_eq!(result.meta["exit_code"], "4");
    }

    #[tokio::test]
    async fn timeout_is_reported_as_result() {
        let h = handler(Duration::from_millis(200));
        let mut policy = SessionPolicyState::new(false, false);
        let (result, _) = run_with(&h, ShellDirective::new("sleep 5"), &[], &mut policy).await;
        assert_eq!(result.kind, Some(ErrorKind::Timeout));
        assert!(result.error.as_deref().unwrap().starts_with("timeout"));
    }

    #[tokio::test]
    async fn output_is_capped() {
        let h = handler(Duration::from_secs(5)).with_max_output_bytes(10);
        let mut policy = SessionPolicyState::new(false, false);
        let (result, _) = run_with(
            &h,
            ShellDirective::new("printf '%0100d' 0"),
            &[],
            &mut policy,
        )
        .await;
        assert!(result.output.starts_with("0000000000\n...[90 bytes truncated]"));
    }

    #[tokio::test]
    async fn delegated_meta_is_carried_into_result() {
        let h = handler(Duration::from_secs(5));
        let mut policy = SessionPolicyState::new(false, false);
        let directive = ShellDirective::new("true").with_meta("network_operation", "dns");
        let (result, _) = run_with(&h, directive, &[], &mut policy).await;
        assert_eq!(result.meta["network_operation"], "dns");
        assert_eq!(result.command, "true");
    }

    #[tokio::test]
    async fn empty_content_is_malformed() {
        let h = handler(Duration::from_secs(1));
        let msg = crate::handlers::test_util::malformed(&h, "   ").await;
        assert_eq!(msg, "Empty terminal command.");
    }
}
