//! `analyze`: broader system analysis snapshots.

use super::grammar::{find_preset, preset_names, required, split_verb, Preset};
use super::{Handler, HandlerContext, HandlerOutcome, ShellDirective};
use crate::error::DirectiveError;
use async_trait::async_trait;
use tracing::{debug, warn};

const META_KEY: &str = "analysis_type";

const PRESETS: &[Preset] = &[
    ("disk", "df -h"),
    ("memory", "free -h"),
    ("cpu", "top -bn1 | head -15"),
    ("processes", "ps aux | sort -rk 3,3 | head -n 10"),
    ("users", "who"),
    ("network", "ifconfig || ip addr"),
    (
        "system",
        "uname -a && lsb_release -a 2>/dev/null || cat /etc/*release 2>/dev/null",
    ),
    ("io", "iostat 2>/dev/null || echo 'iostat command not found'"),
    (
        "hardware",
        "lshw -short 2>/dev/null || echo 'lshw command not found'",
    ),
    (
        "packages",
        "dpkg -l 2>/dev/null || rpm -qa 2>/dev/null || pacman -Q 2>/dev/null || echo 'Package manager not detected'",
    ),
    (
        "services",
        "systemctl list-units --type=service --state=running 2>/dev/null || service --status-all 2>/dev/null || echo 'Service manager not detected'",
    ),
    ("modules", "lsmod | head -20"),
    ("space", "du -sh /* 2>/dev/null | sort -hr"),
    (
        "temperature",
        "sensors 2>/dev/null || echo 'sensors command not found'",
    ),
    ("logfiles", "ls -la /var/log/ | tail -20"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnalyzeRequest<'a> {
    Preset(Preset),
    Custom(&'a str),
}

impl<'a> AnalyzeRequest<'a> {
    fn parse(content: &'a str) -> Result<Self, DirectiveError> {
        match split_verb(content) {
            ("custom", Some(command)) => Ok(Self::Custom(required(command, "custom:command")?)),
            (name, None) => find_preset(PRESETS, name)
                .map(Self::Preset)
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }
}

fn unknown() -> DirectiveError {
    DirectiveError::MalformedSubcommand(format!(
        "Unknown analysis command. Valid options: {} or use custom:command",
        preset_names(PRESETS)
    ))
}

#[derive(Debug, Default)]
pub struct AnalyzeHandler;

impl AnalyzeHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for AnalyzeHandler {
    fn protocol(&self) -> &'static str {
        "analyze"
    }

    async fn handle(
        &self,
        content: &str,
        _ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, DirectiveError> {
        let request = AnalyzeRequest::parse(content).inspect_err(|_| {
            warn!(content, "unknown analysis command");
        })?;
        let directive = match request {
            AnalyzeRequest::Preset((name, command)) => {
                debug!(analysis = name, "analyze preset");
                ShellDirective::new(command).with_meta(META_KEY, name)
            }
            AnalyzeRequest::Custom(command) => ShellDirective::new(command)
                .forced()
                .with_meta(META_KEY, "custom"),
        };
        Ok(HandlerOutcome::Delegate(directive))
    }
}
