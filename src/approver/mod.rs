//! Host-side approval callbacks.
//!
//! The gate never reads input itself. Hosts supply an [`ApprovalPrompter`]:
//! the terminal prompter for interactive CLI use, or the channel prompter
//! when another task (a UI, a test) answers requests.

use crate::policy::ApprovalRequest;
use async_trait::async_trait;

pub mod channel;
pub mod terminal;

pub use channel::{ChannelPrompter, PendingApproval};
pub use terminal::TerminalPrompter;

/// Host-provided approval-decision callback.
#[async_trait]
pub trait ApprovalPrompter: Send + Sync {
    /// Present `request` and return the raw response. An empty string (no
    /// input available) is treated as a denial.
    async fn ask(&self, request: &ApprovalRequest) -> String;

    /// Informational message that needs no answer.
    fn notice(&self, _message: &str) {}
}

/// Prompter for sessions with no human attached: every prompt is denied.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl ApprovalPrompter for DenyAll {
    async fn ask(&self, request: &ApprovalRequest) -> String {
        tracing::warn!(command = %request.command, "no approval source; denying");
        String::new()
    }
}

/// Format command text as a shell snippet block for approval rendering.
pub fn format_approval_command_block(command: &str) -> String {
    if command.trim().is_empty() {
        return "$".to_string();
    }

    let mut out = String::new();
    for (idx, line) in command.lines().enumerate() {
        if idx > 0 {
            out.push('\n');
            out.push_str("  ");
        } else {
            out.push_str("$ ");
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SudoPolicy;

    #[test]
    fn command_block_prefixes_first_line_and_indents_rest() {
        assert_eq!(format_approval_command_block("ls -la"), "$ ls -la");
        assert_eq!(
            format_approval_command_block("echo a\necho b"),
            "$ echo a\n  echo b"
        );
        assert_eq!(format_approval_command_block("   "), "$");
    }

    #[tokio::test]
    async fn deny_all_returns_empty_answer() {
        let request = ApprovalRequest {
            command: "ls".into(),
            risk: SudoPolicy::new().classify("ls"),
            allow_all: true,
            forced: false,
        };
        assert_eq!(DenyAll.ask(&request).await, "");
    }
}
