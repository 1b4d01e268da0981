//! `security`: account, permission and exposure audits.

use super::grammar::{find_preset, preset_names, required, split_verb, Preset};
use super::{Handler, HandlerContext, HandlerOutcome, ShellDirective};
use crate::error::DirectiveError;
use crate::executor::shell_quote;
use async_trait::async_trait;
use tracing::{debug, warn};

const META_KEY: &str = "security_operation";

const PRESETS: &[Preset] = &[
    (
        "users",
        "cat /etc/passwd | grep -v '/nologin' | grep -v '/false'",
    ),
    ("groups", "cat /etc/group"),
    ("ports", "netstat -tuln || ss -tuln"),
    ("sudo", "sudo -l"),
    (
        "listening",
        "lsof -i -P -n | grep LISTEN || netstat -tuln | grep LISTEN || ss -tuln | grep LISTEN",
    ),
    ("accounts", "lastlog | grep -v 'Never logged in'"),
    ("logins", "last -n 20"),
    ("history", "history | tail -n 20"),
    ("suid", "find / -perm -4000 -ls 2>/dev/null | head -20"),
    ("sgid", "find / -perm -2000 -ls 2>/dev/null | head -20"),
    ("processes", "ps aux --forest"),
    ("kernelmodules", "lsmod"),
    (
        "capabilities",
        "getcap -r / 2>/dev/null || echo 'getcap command not found'",
    ),
    (
        "cronjobs",
        "crontab -l 2>/dev/null; ls -la /etc/cron*/ 2>/dev/null",
    ),
    (
        "ssh-config",
        "cat /etc/ssh/sshd_config 2>/dev/null | grep -v '^#' | grep -v '^$'",
    ),
    (
        "failed-logins",
        "grep 'Failed password' /var/log/auth.log 2>/dev/null || journalctl -u sshd 2>/dev/null | grep 'Failed password'",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SecurityRequest<'a> {
    Preset(Preset),
    /// Permissions of a path plus world-writable files beneath it.
    Check(&'a str),
    Vulnerabilities(&'a str),
    Custom(&'a str),
}

impl<'a> SecurityRequest<'a> {
    fn parse(content: &'a str) -> Result<Self, DirectiveError> {
        match split_verb(content) {
            ("check", Some(path)) => Ok(Self::Check(required(path, "check:file/dir")?)),
            ("vulnerabilities", Some(package)) => Ok(Self::Vulnerabilities(required(
                package,
                "vulnerabilities:package",
            )?)),
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
            Self::Check(_) => "check",
            Self::Vulnerabilities(_) => "vulnerabilities",
            Self::Custom(_) => "custom",
        }
    }

    fn directive(&self) -> ShellDirective {
        let command = match self {
            Self::Preset((_, command)) => command.to_string(),
            Self::Check(path) => {
                let path = shell_quote(path);
                format!(
                    "ls -la {path} 2>/dev/null && find {path} -type f -perm -o+w -ls 2>/dev/null | head -10"
                )
            }
            Self::Vulnerabilities(package) => {
                let package = shell_quote(package);
                format!(
                    "apt list --installed 2>/dev/null | grep {package} || rpm -q {package} 2>/dev/null || pacman -Qi {package} 2>/dev/null"
                )
            }
            Self::Custom(command) => return ShellDirective::new(*command).forced(),
        };
        ShellDirective::new(command)
    }
}

fn unknown() -> DirectiveError {
    DirectiveError::MalformedSubcommand(format!(
        "Unknown security command. Valid options: {}, check:file/dir, vulnerabilities:package, custom:command",
        preset_names(PRESETS)
    ))
}

#[derive(Debug, Default)]
pub struct SecurityHandler;

impl SecurityHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for SecurityHandler {
    fn protocol(&self) -> &'static str {
        "security"
    }

    async fn handle(
        &self,
        content: &str,
        _ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, DirectiveError> {
        let request = SecurityRequest::parse(content).inspect_err(|_| {
            warn!(content, "unknown security command");
        })?;
        debug!(operation = request.operation(), "security request");
        Ok(HandlerOutcome::Delegate(
            request.directive().with_meta(META_KEY, request.operation()),
        ))
    }
}
