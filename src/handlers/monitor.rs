//! `monitor`: live resource usage and log tails.

use super::grammar::{find_preset, preset_names, required, split_verb, Preset};
use super::{Handler, HandlerContext, HandlerOutcome, ShellDirective};
use crate::directives::result::ExecutionResult;
use crate::error::{DirectiveError, ErrorKind};
use crate::executor::shell_quote;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, warn};

const PROTOCOL: &str = "monitor";
const META_KEY: &str = "monitoring_type";
const DEFAULT_LOG_LINES: u32 = 20;

const PRESETS: &[Preset] = &[
    ("cpu", "top -bn1 | head -15"),
    ("memory", "free -h"),
    ("disk", "df -h"),
    ("load", "uptime"),
    ("io", "iostat 2>/dev/null || echo 'iostat not installed'"),
    ("processes", "ps aux --sort=-%cpu | head -n 10"),
    ("network", "ifconfig || ip addr"),
    (
        "temperature",
        "sensors 2>/dev/null || echo 'sensors not installed'",
    ),
    ("users", "w"),
    ("swap", "swapon -s || echo 'No swap information available'"),
    ("space", "du -sh /* 2>/dev/null | sort -hr | head -10"),
    ("inodes", "df -i"),
    (
        "services",
        "systemctl list-units --state=running --type=service 2>/dev/null || service --status-all 2>/dev/null | grep ' + '",
    ),
    ("memory-hogs", "ps aux --sort=-%mem | head -10"),
    ("cpu-hogs", "ps aux --sort=-%cpu | head -10"),
    ("open-files", "lsof | wc -l"),
    (
        "connections",
        "netstat -ant | wc -l || ss -ant | wc -l",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorRequest<'a> {
    Preset(Preset),
    Log { file: &'a str, lines: u32 },
    Custom(&'a str),
}

impl<'a> MonitorRequest<'a> {
    fn parse(content: &'a str) -> Result<Self, DirectiveError> {
        match split_verb(content) {
            ("log", Some(params)) => {
                let params = required(params, "log:logfile[:lines]")?;
                let (file, lines) = match params.split_once(':') {
                    Some((file, lines)) => (file.trim(), parse_lines(lines.trim())?),
                    None => (params, DEFAULT_LOG_LINES),
                };
                Ok(Self::Log { file, lines })
            }
            ("custom", Some(command)) => Ok(Self::Custom(required(command, "custom:command")?)),
            (name, None) => find_preset(PRESETS, name)
                .map(Self::Preset)
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::Preset((name, _)) => *name,
            Self::Log { .. } => "log",
            Self::Custom(_) => "custom",
        }
    }
}

fn parse_lines(raw: &str) -> Result<u32, DirectiveError> {
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(DirectiveError::MalformedSubcommand(format!(
            "Invalid line count '{raw}'. Use log:logfile[:lines] with a positive number"
        ))),
    }
}

fn unknown() -> DirectiveError {
    DirectiveError::MalformedSubcommand(format!(
        "Unknown monitor command. Valid options: {}, log:logfile[:lines], custom:command",
        preset_names(PRESETS)
    ))
}

#[derive(Debug, Default)]
pub struct MonitorHandler;

impl MonitorHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for MonitorHandler {
    fn protocol(&self) -> &'static str {
        PROTOCOL
    }

    async fn handle(
        &self,
        content: &str,
        _ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, DirectiveError> {
        let request = MonitorRequest::parse(content).inspect_err(|e| {
            warn!(content, "rejected monitor command: {e}");
        })?;
        debug!(operation = request.operation(), "monitor request");
        let directive = match request {
            MonitorRequest::Preset((_, command)) => ShellDirective::new(command),
            MonitorRequest::Log { file, lines } => {
                if !Path::new(file).exists() {
                    warn!(file, "log file not found");
                    let result = ExecutionResult::failure(
                        PROTOCOL,
                        content,
                        ErrorKind::Io,
                        format!("Log file not found: {file}"),
                    )
                    .with_meta(META_KEY, "log");
                    return Ok(HandlerOutcome::Completed(result));
                }
                ShellDirective::new(format!("tail -n {lines} {}", shell_quote(file)))
            }
            MonitorRequest::Custom(command) => ShellDirective::new(command).forced(),
        };
        Ok(HandlerOutcome::Delegate(
            directive.with_meta(META_KEY, request.operation()),
        ))
    }
}
