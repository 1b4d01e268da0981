//! Transport contract between the executor and whatever runs commands.

use crate::error::DirectiveError;
use crate::policy::SudoPolicy;
use async_trait::async_trait;
use tokio::time::{Duration, Instant};

use super::process::{run_sh_process, run_with_timeout};
use super::types::{ExecOutcome, PendingCommand};

/// Submit a command, then wait for its outcome.
///
/// Callers must not submit again before `wait` returns for the previous
/// handle; the executor's lock enforces that.
#[async_trait]
pub(crate) trait ShellTransport: Send {
    async fn submit(&mut self, command: &str) -> Result<PendingCommand, DirectiveError>;

    async fn wait(
        &mut self,
        pending: PendingCommand,
        max_wait: Duration,
    ) -> Result<ExecOutcome, DirectiveError>;
}

/// One subprocess per command with a fixed timeout. No state survives
/// between commands.
#[derive(Debug, Clone)]
pub(crate) struct DirectShell {
    shell: String,
    timeout: Duration,
    sudo: SudoPolicy,
    next_seq: u64,
}

impl DirectShell {
    pub(crate) fn new(shell: &str, timeout: Duration) -> Self {
        Self {
            shell: shell.to_string(),
            timeout,
            sudo: SudoPolicy::new(),
            next_seq: 0,
        }
    }

    /// Submit and wait in one step.
    pub(crate) async fn run(&mut self, command: &str) -> Result<ExecOutcome, DirectiveError> {
        let pending = self.submit(command).await?;
        let limit = self.timeout;
        self.wait(pending, limit).await
    }
}

#[async_trait]
impl ShellTransport for DirectShell {
    async fn submit(&mut self, command: &str) -> Result<PendingCommand, DirectiveError> {
        self.next_seq += 1;
        Ok(PendingCommand {
            seq: self.next_seq,
            command: command.to_string(),
            submitted: Instant::now(),
        })
    }

    async fn wait(
        &mut self,
        pending: PendingCommand,
        max_wait: Duration,
    ) -> Result<ExecOutcome, DirectiveError> {
        let limit = max_wait.min(self.timeout);
        match run_with_timeout(run_sh_process(&self.shell, &pending.command), limit).await {
            Ok(output) => {
                if self.sudo.is_auth_failure(&pending.command, &output.combined()) {
                    Ok(ExecOutcome::AuthFailure(output))
                } else {
                    Ok(ExecOutcome::Completed(output))
                }
            }
            Err(DirectiveError::Timeout { waited, partial }) => {
                Ok(ExecOutcome::TimedOut { waited, partial })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn direct_shell_runs_each_command_fresh() {
        let mut shell = DirectShell::new("bash", Duration::from_secs(5));
        match shell.run("cd /; export NEO_T=1; pwd").await.unwrap() {
            ExecOutcome::Completed(out) => assert_eq!(out.stdout, "/\n"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        match shell.run("echo ${NEO_T:-unset}").await.unwrap() {
            ExecOutcome::Completed(out) => assert_eq!(out.stdout, "unset\n"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn direct_shell_reports_timeout_as_outcome() {
        let mut shell = DirectShell::new("bash", Duration::from_millis(100));
        let outcome = shell.run("sleep 5").await.unwrap();
        assert!(matches!(outcome, ExecOutcome::TimedOut { .. }), "got {outcome:?}");
    }

    #[tokio::test]
    async fn direct_shell_sequence_numbers_increase() {
        let mut shell = DirectShell::new("bash", Duration::from_secs(1));
        let a = shell.submit("true").await.unwrap();
        let b = shell.submit("true").await.unwrap();
        assert!(b.seq > a.seq);
    }
}
