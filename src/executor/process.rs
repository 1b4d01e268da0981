//! Process and shell helpers shared by the executor backends and handlers.

use crate::error::DirectiveError;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::types::ExecOutput;

/// Run a shell command string through `shell -c`.
pub(crate) async fn run_sh_process(shell: &str, command: &str) -> Result<ExecOutput, DirectiveError> {
    run_process(shell, &["-c".into(), command.into()]).await
}

/// Await a command future, giving up after `limit`.
pub(crate) async fn run_with_timeout(
    fut: impl std::future::Future<Output = Result<ExecOutput, DirectiveError>>,
    limit: Duration,
) -> Result<ExecOutput, DirectiveError> {
    match timeout(limit, fut).await {
        Ok(out) => out,
        Err(_) => Err(DirectiveError::Timeout {
            waited: limit,
            partial: String::new(),
        }),
    }
}

/// Human-oriented duration formatting used in messages.
pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();
    if secs == 0 {
        return format!("{millis}ms");
    }
    if millis == 0 {
        if secs % 3600 == 0 {
            return format!("{}h", secs / 3600);
        }
        if secs % 60 == 0 {
            return format!("{}m", secs / 60);
        }
        return format!("{secs}s");
    }
    format!("{secs}.{millis:03}s")
}

/// Spawn and wait for a process with captured output.
pub(crate) async fn run_process(program: &str, args: &[String]) -> Result<ExecOutput, DirectiveError> {
    let mut cmd = Command::new(program);
    // A timed-out wait drops this future; take the child down with it.
    cmd.kill_on_drop(true);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let child = cmd
        .spawn()
        .map_err(|e| DirectiveError::ProcessLaunchFailure(format!("{program}: {e}")))?;

    let output = child.wait_with_output().await?;

    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Convert non-zero command status into a contextual launch error.
pub(crate) fn ensure_success(output: ExecOutput, context: &str) -> Result<ExecOutput, DirectiveError> {
    if output.exit_code == 0 {
        return Ok(output);
    }

    let mut details = if output.stderr.trim().is_empty() {
        output.stdout.trim().to_string()
    } else {
        output.stderr.trim().to_string()
    };
    if details.is_empty() {
        details = format!("command exited with {}", output.exit_code);
    }

    Err(DirectiveError::ProcessLaunchFailure(format!("{context}: {details}")))
}

/// Whether `program` can be spawned at all.
pub(crate) async fn program_available(program: &str, probe_arg: &str) -> bool {
    match Command::new(program)
        .arg(probe_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("{program} not available: {e}");
            false
        }
    }
}

/// Shell-safe single-quote escaping. Words made only of characters the
/// shell never interprets are returned as-is.
pub fn shell_quote(s: &str) -> String {
    let plain = |c: char| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c);
    if s.is_empty() {
        "''".into()
    } else if s.chars().all(plain) {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}
