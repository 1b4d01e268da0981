//! `state`: static facts about the host, a file, a process or a service.

use super::grammar::{find_preset, preset_names, required, split_verb, Preset};
use super::{Handler, HandlerContext, HandlerOutcome, ShellDirective};
use crate::error::DirectiveError;
use crate::executor::shell_quote;
use async_trait::async_trait;
use tracing::{debug, warn};

const META_KEY: &str = "state_type";

const PRESETS: &[Preset] = &[
    ("system", "uname -a"),
    ("uptime", "uptime"),
    ("kernel", "uname -r"),
    (
        "distro",
        "lsb_release -a 2>/dev/null || cat /etc/*release 2>/dev/null",
    ),
    (
        "hardware",
        "lshw -short 2>/dev/null || echo 'lshw not installed'",
    ),
    ("cpu", "cat /proc/cpuinfo | grep 'model name' | head -1"),
    (
        "memory",
        "cat /proc/meminfo | grep 'MemTotal\\|MemFree\\|MemAvailable'",
    ),
    ("storage", "lsblk"),
    ("hostname", "hostname"),
    (
        "network",
        "hostname -I || ip addr | grep 'inet ' | grep -v '127.0.0.1'",
    ),
    ("time", "date"),
    (
        "timezone",
        "timedatectl 2>/dev/null || cat /etc/timezone 2>/dev/null || date +%Z",
    ),
    (
        "selinux",
        "getenforce 2>/dev/null || echo 'SELinux not available'",
    ),
    (
        "runlevel",
        "runlevel 2>/dev/null || systemctl get-default 2>/dev/null || echo 'Runlevel information not available'",
    ),
    (
        "desktop",
        "echo $XDG_CURRENT_DESKTOP $GDMSESSION $DESKTOP_SESSION 2>/dev/null || echo 'No desktop environment detected'",
    ),
    ("shell", "echo $SHELL"),
    ("current-user", "whoami"),
    ("locale", "locale | grep LANG="),
];

/// Summary of the most useful presets in one command.
const ALL: &str = "echo 'SYSTEM:' && uname -a && \
echo -e '\\nKERNEL:' && uname -r && \
echo -e '\\nHOSTNAME:' && hostname && \
echo -e '\\nUPTIME:' && uptime && \
echo -e '\\nCURRENT USER:' && whoami && \
echo -e '\\nMEMORY:' && free -h && \
echo -e '\\nDISK:' && df -h";

const PROCESS_COLUMNS: &str = "pid,ppid,cmd,%cpu,%mem,state,start,time";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessRef<'a> {
    Pid(u32),
    Name(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateRequest<'a> {
    Preset(Preset),
    All,
    File(&'a str),
    Process(ProcessRef<'a>),
    Service(&'a str),
    Custom(&'a str),
}

impl<'a> StateRequest<'a> {
    fn parse(content: &'a str) -> Result<Self, DirectiveError> {
        match split_verb(content) {
            ("file", Some(path)) => Ok(Self::File(required(path, "file:filepath")?)),
            ("process", Some(target)) => {
                let target = required(target, "process:name/pid")?;
                Ok(Self::Process(match target.parse::<u32>() {
                    Ok(pid) if target.bytes().all(|b| b.is_ascii_digit()) => ProcessRef::Pid(pid),
                    _ => ProcessRef::Name(target),
                }))
            }
            ("service", Some(name)) => Ok(Self::Service(required(name, "service:name")?)),
            ("custom", Some(command)) => Ok(Self::Custom(required(command, "custom:command")?)),
            ("all", None) => Ok(Self::All),
            (name, None) => find_preset(PRESETS, name)
                .map(Self::Preset)
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::Preset((name, _)) => *name,
            Self::All => "all",
            Self::File(_) => "file",
            Self::Process(_) => "process",
            Self::Service(_) => "service",
            Self::Custom(_) => "custom",
        }
    }

    fn directive(&self) -> ShellDirective {
        let command = match self {
            Self::Preset((_, command)) => command.to_string(),
            Self::All => ALL.to_string(),
            Self::File(path) => {
                let path = shell_quote(path);
                format!(
                    "ls -la {path} 2>/dev/null && file {path} 2>/dev/null && stat {path} 2>/dev/null"
                )
            }
            Self::Process(ProcessRef::Pid(pid)) => format!(
                "ps -p {pid} -o {PROCESS_COLUMNS} && lsof -p {pid} 2>/dev/null | head -10"
            ),
            Self::Process(ProcessRef::Name(name)) => {
                let name = shell_quote(name);
                format!("ps -C {name} -o {PROCESS_COLUMNS} || pgrep -a {name}")
            }
            Self::Service(name) => {
                let missing = shell_quote(&format!(
                    "Service {name} not found or not supported by current service manager"
                ));
                let name = shell_quote(name);
                format!(
                    "systemctl status {name} 2>/dev/null || service {name} status 2>/dev/null || echo {missing}"
                )
            }
            Self::Custom(command) => return ShellDirective::new(*command).forced(),
        };
        ShellDirective::new(command)
    }
}

fn unknown() -> DirectiveError {
    DirectiveError::MalformedSubcommand(format!(
        "Unknown state command. Valid options: {}, all, file:filepath, process:name/pid, service:name, custom:command",
        preset_names(PRESETS)
    ))
}

#[derive(Debug, Default)]
pub struct StateHandler;

impl StateHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for StateHandler {
    fn protocol(&self) -> &'static str {
        "state"
    }

    async fn handle(
        &self,
        content: &str,
        _ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, DirectiveError> {
        let request = StateRequest::parse(content).inspect_err(|_| {
            warn!(content, "unknown state command");
        })?;
        debug!(operation = request.operation(), "state request");
        Ok(HandlerOutcome::Delegate(
            request.directive().with_meta(META_KEY, request.operation()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_util::{delegated, malformed};

    #[tokio::test]
    async fn process_by_pid_and_by_name() {
        let d = delegated(&StateHandler::new(), "process:1234").await;
        assert_eq!(
            d.command,
            "ps -p 1234 -o pid,ppid,cmd,%cpu,%mem,state,start,time && lsof -p 1234 2>/dev/null | head -10"
        );
        let d = delegated(&StateHandler::new(), "process:sshd;reboot").await;
        assert_eq!(
            d.command,
            "ps -C 'sshd;reboot' -o pid,ppid,cmd,%cpu,%mem,state,start,time || pgrep -a 'sshd;reboot'"
        );
        assert_eq!(d.meta[META_KEY], "process");
    }

    #[tokio::test]
    async fn service_message_is_quoted_as_one_word() {
        let d = delegated(&StateHandler::new(), "service:nginx").await;
        assert_eq!(
            d.command,
            "systemctl status nginx 2>/dev/null || service nginx status 2>/dev/null || \
echo 'Service nginx not found or not supported by current service manager'"
        );
    }

    #[tokio::test]
    async fn all_combines_sections() {
        let d = delegated(&StateHandler::new(), "all").await;
        assert!(d.command.starts_with("echo 'SYSTEM:' && uname -a && "));
        assert!(d.command.ends_with("echo -e '\\nDISK:' && df -h"));
        assert_eq!(d.meta[META_KEY], "all");
    }

    #[tokio::test]
    async fn file_path_is_escaped() {
        let d = delegated(&StateHandler::new(), "file:/tmp/a'b").await;
        assert!(d.command.starts_with("ls -la '/tmp/a'\\''b' 2>/dev/null"));
    }

    #[tokio::test]
    async fn unknown_state_command() {
        let msg = malformed(&StateHandler::new(), "weather").await;
        assert!(msg.starts_with("Unknown state command. Valid options: cpu, current-user, desktop"));
    }
}
