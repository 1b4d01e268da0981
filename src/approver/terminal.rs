//! Interactive approval prompts on the controlling terminal.

use super::{format_approval_command_block, ApprovalPrompter};
use crate::policy::ApprovalRequest;
use async_trait::async_trait;
use crossterm::style::{Color, Stylize};
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use tracing::warn;

/// Reads answers from `/dev/tty`, falling back to an interactive stdin.
/// With neither available every prompt resolves to a denial.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompter {
    color: bool,
}

impl TerminalPrompter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// True when a human can answer: a controlling terminal exists or
    /// stdin is interactive.
    pub fn available() -> bool {
        File::open("/dev/tty").is_ok() || io::stdin().is_terminal()
    }
}

#[async_trait]
impl ApprovalPrompter for TerminalPrompter {
    async fn ask(&self, request: &ApprovalRequest) -> String {
        render_approval_request(self.color, request);
        match tokio::task::spawn_blocking(read_answer_line).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => {
                eprintln!();
                String::new()
            }
            Ok(Err(e)) => {
                warn!("failed to read approval answer: {e}");
                String::new()
            }
            Err(e) => {
                warn!("approval reader task failed: {e}");
                String::new()
            }
        }
    }

    fn notice(&self, message: &str) {
        if self.color {
            eprintln!("{} {}", "•".with(Color::DarkGrey), message.with(Color::Yellow));
        } else {
            eprintln!("• {message}");
        }
    }
}

/// Map request risk to a display label and color.
pub(crate) fn approval_risk_style(request: &ApprovalRequest) -> (&'static str, Color) {
    if request.risk.is_critical() {
        ("privileged destructive", Color::Red)
    } else if request.risk.is_dangerous() {
        ("destructive", Color::Red)
    } else if request.risk.privileged {
        ("privileged", Color::Yellow)
    } else if request.forced {
        ("irreversible", Color::Yellow)
    } else {
        ("routine", Color::Green)
    }
}

fn render_approval_request(color: bool, request: &ApprovalRequest) {
    let (label, label_color) = approval_risk_style(request);
    let block = format_approval_command_block(&request.command);
    if color {
        eprintln!(
            "{} {} action requested",
            "•".with(Color::DarkGrey),
            label.with(label_color).bold()
        );
        if let Some(pattern) = request.risk.dangerous {
            eprintln!("  {}", format!("matches {pattern}").with(Color::DarkGrey));
        }
        eprintln!("{}", block.with(Color::White));
        eprint!("{} ", format!("approve? {}:", request.choices()).with(Color::Cyan));
    } else {
        eprintln!("• {label} action requested");
        if let Some(pattern) = request.risk.dangerous {
            eprintln!("  matches {pattern}");
        }
        eprintln!("{block}");
        eprint!("approve? {}: ", request.choices());
    }
    let _ = io::stderr().flush();
}

fn read_answer_line() -> io::Result<Option<String>> {
    match File::open("/dev/tty") {
        Ok(tty) => read_one_line(BufReader::new(tty)),
        Err(_) if io::stdin().is_terminal() => read_one_line(io::stdin().lock()),
        Err(_) => Ok(None),
    }
}

fn read_one_line(mut reader: impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
