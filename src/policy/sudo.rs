//! Privilege and destructive-pattern classification for shell commands.
//!
//! Classification is textual. It is an advisory input to the approval gate,
//! not a sandbox.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Fixed prompt injected into `sudo` invocations so a rejected or missing
/// password can be recognized in captured output. `%u` is expanded by sudo.
pub const SUDO_PROMPT: &str = "[neo-sudo] password for %u: ";

/// Stable prefix of [`SUDO_PROMPT`] after sudo's own expansion.
const SUDO_PROMPT_PREFIX: &str = "[neo-sudo] password for ";

/// Words that may precede the real command: leading assignments, the bare
/// `command`, `exec`, `nohup` and `time` wrappers, and `env` with its flags
/// and `VAR=value` arguments.
const COMMAND_PREFIX: &str =
    r"(?:\w+=\S*\s+)*(?:(?:command|exec|nohup|time)\s+|env(?:\s+-\S+)*(?:\s+\w+=\S*)*\s+)*";

/// An elevation tool, bare or path-qualified.
const ELEVATION_TOOL: &str = r"(?:[^\s;&|()`]*/)?(?:sudo|su|doas|pkexec)";

static PRIVILEGED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?m)(?:^|[;&|(`\n]|\$\()\s*{COMMAND_PREFIX}{ELEVATION_TOOL}(?:\s|$)"
    ))
    .expect("privileged regex is valid")
});

static SUDO_POSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?m)(^|[;&(`\n]|\$\()(\s*{COMMAND_PREFIX})((?:[^\s;&|()`]*/)?sudo)(\s+|$)"
    ))
    .expect("sudo position regex is valid")
});

/// Ordered destructive patterns; the first match names the risk.
static DANGEROUS_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        (
            "recursive-delete-system-path",
            r#"\brm\s+(?:-\S+\s+)*(?:-[a-zA-Z]*[rR][a-zA-Z]*|--recursive)\s+(?:-\S+\s+)*(?:--\s+)?['"]?(?:/\*?|~/?|/(?:bin|boot|dev|etc|home|lib|lib32|lib64|opt|root|sbin|srv|sys|usr|var)(?:/[^\s'";&|]*)?)['"]?(?:\s|[;&|]|$)"#,
        ),
        ("filesystem-format", r"\bmkfs(?:\.\w+)?\b"),
        ("raw-disk-write", r"\bdd\b[^\n]*\bof=/dev/"),
        ("disk-wipe", r"\b(?:wipefs|shred)\b[^\n]*/dev/"),
        (
            "block-device-redirect",
            r">\s*/dev/(?:sd[a-z]|hd[a-z]|vd[a-z]|xvd[a-z]|nvme\d|mmcblk\d)",
        ),
        (
            "recursive-chown",
            r"\bchown\b[^\n;|&]*\s(?:-[a-zA-Z]*R[a-zA-Z]*|--recursive)(?:\s|$)",
        ),
        (
            "recursive-chmod",
            r"\bchmod\b[^\n;|&]*\s(?:-[a-zA-Z]*R[a-zA-Z]*|--recursive)(?:\s|$)",
        ),
        (
            "service-disable",
            r"\bsystemctl\s+(?:\S+\s+)*(?:disable|mask)\b",
        ),
        ("fork-bomb", r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:"),
        (
            "credential-overwrite",
            r"(?:>{1,2}|\btee(?:\s+-\S+)*|\b(?:cp|mv|install)\s[^\n;|&]*)\s*(?:/etc/(?:passwd|shadow|gshadow|group|sudoers)\b|\S*\.ssh/authorized_keys\b)",
        ),
    ]
    .into_iter()
    .map(|(label, pattern)| {
        (
            label,
            Regex::new(pattern).expect("dangerous command regex is valid"),
        )
    })
    .collect()
});

/// Classification of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandRisk {
    pub privileged: bool,
    /// Label of the first dangerous pattern that matched.
    pub dangerous: Option<&'static str>,
}

impl CommandRisk {
    pub fn is_dangerous(&self) -> bool {
        self.dangerous.is_some()
    }

    /// Privileged and destructive: never auto-approved.
    pub fn is_critical(&self) -> bool {
        self.privileged && self.dangerous.is_some()
    }
}

/// Stateless command classifier and rewriter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SudoPolicy;

impl SudoPolicy {
    pub fn new() -> Self {
        Self
    }

    /// True when an elevation tool appears in command position.
    pub fn is_privileged(&self, command: &str) -> bool {
        PRIVILEGED_RE.is_match(command)
    }

    pub fn is_dangerous(&self, command: &str) -> bool {
        self.dangerous_match(command).is_some()
    }

    /// Name of the first destructive pattern the command matches.
    pub fn dangerous_match(&self, command: &str) -> Option<&'static str> {
        DANGEROUS_PATTERNS
            .iter()
            .find(|(_, re)| re.is_match(command))
            .map(|(label, _)| *label)
    }

    pub fn classify(&self, command: &str) -> CommandRisk {
        CommandRisk {
            privileged: self.is_privileged(command),
            dangerous: self.dangerous_match(command),
        }
    }

    /// Inject [`SUDO_PROMPT`] into every `sudo` invocation that lacks an
    /// explicit prompt. Commands that pipe output elsewhere are returned
    /// unchanged.
    pub fn sanitize(&self, command: &str) -> String {
        if !self.is_privileged(command) || command.contains('|') {
            return command.to_string();
        }
        SUDO_POSITION_RE
            .replace_all(command, |caps: &Captures<'_>| {
                let whole = caps.get(0).map_or(0..0, |m| m.range());
                let rest = &command[whole.end..];
                let lead = &caps[1];
                let prefix = &caps[2];
                let tool = &caps[3];
                let after = &caps[4];
                if has_prompt_flag(rest) {
                    return format!("{lead}{prefix}{tool}{after}");
                }
                let tail = if after.is_empty() { "" } else { " " };
                format!("{lead}{prefix}{tool} -p '{SUDO_PROMPT}'{tail}")
            })
            .into_owned()
    }

    /// Detect an elevation rejection in the captured output of `command`.
    pub fn is_auth_failure(&self, command: &str, output: &str) -> bool {
        if !self.is_privileged(command) {
            return false;
        }
        let rejected = output.lines().map(str::trim).any(|line| {
            let lower = line.to_ascii_lowercase();
            let from_tool = ["sudo:", "su:", "doas:", "pkexec"]
                .iter()
                .any(|p| lower.starts_with(p));
            lower.starts_with("sorry, try again")
                || (from_tool
                    && [
                        "incorrect password",
                        "a password is required",
                        "no password was provided",
                        "authentication failure",
                        "a terminal is required",
                    ]
                    .iter()
                    .any(|sig| lower.contains(sig)))
        });
        if rejected {
            return true;
        }
        // Prompt printed with nothing after it: no password was supplied.
        output
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .is_some_and(|line| line.trim_start().starts_with(SUDO_PROMPT_PREFIX))
    }
}

fn has_prompt_flag(rest: &str) -> bool {
    let mut tokens = rest.split_whitespace();
    tokens.next().is_some_and(|first| {
        first == "-p" || first.starts_with("--prompt") || (first.starts_with("-p") && first.len() > 2)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_at_start_or_after_separator() {
        let p = SudoPolicy::new();
        assert!(p.is_privileged("sudo ls"));
        assert!(p.is_privileged("  sudo apt update"));
        assert!(p.is_privileged("cd /tmp && sudo rm x"));
        assert!(p.is_privileged("ls; su -"));
        assert!(p.is_privileged("echo $(sudo cat /etc/shadow)"));
        assert!(p.is_privileged("true || doas reboot"));
        assert!(p.is_privileged("pkexec visudo"));
    }

    #[test]
    fn wrapped_or_path_qualified_tools_are_privileged() {
        let p = SudoPolicy::new();
        assert!(p.is_privileged("/usr/bin/sudo ls"));
        assert!(p.is_privileged("cd / && /bin/su -"));
        assert!(p.is_privileged("command sudo id"));
        assert!(p.is_privileged("exec doas sh"));
        assert!(p.is_privileged("env LANG=C sudo apt update"));
        assert!(p.is_privileged("env -i PATH=/usr/bin sudo id"));
        assert!(p.is_privileged("DEBIAN_FRONTEND=noninteractive sudo apt upgrade"));
        assert!(p.is_privileged("nohup sudo reboot"));
        assert!(!p.is_privileged("command -v sudo"));
        assert!(!p.is_privileged("ls /usr/bin/sudo"));
    }

    #[test]
    fn mention_outside_command_position_is_not_privileged() {
        let p = SudoPolicy::new();
        assert!(!p.is_privileged("echo sudo"));
        assert!(!p.is_privileged("grep sudoers /etc/group"));
        assert!(!p.is_privileged("sudoku --solve"));
        assert!(!p.is_privileged("ls -la"));
    }

    #[test]
    fn dangerous_patterns_report_first_label() {
        let p = SudoPolicy::new();
        assert_eq!(
            p.dangerous_match("rm -rf /"),
            Some("recursive-delete-system-path")
        );
        assert_eq!(
            p.dangerous_match("sudo rm -f -r /etc"),
            Some("recursive-delete-system-path")
        );
        for quoted in ["sudo rm -rf \"/\"", "sudo rm -rf '/etc'", "rm -r -- '/usr/lib'"] {
            assert_eq!(
                p.dangerous_match(quoted),
                Some("recursive-delete-system-path"),
                "{quoted}"
            );
        }
        assert_eq!(p.dangerous_match("mkfs.ext4 /dev/sdb1"), Some("filesystem-format"));
        assert_eq!(
            p.dangerous_match("dd if=/dev/zero of=/dev/sda bs=1M"),
            Some("raw-disk-write")
        );
        assert_eq!(p.dangerous_match("wipefs -a /dev/sdb"), Some("disk-wipe"));
        assert_eq!(p.dangerous_match("cat x > /dev/sda"), Some("block-device-redirect"));
        assert_eq!(p.dangerous_match("chown -R me /usr"), Some("recursive-chown"));
        assert_eq!(p.dangerous_match("chmod -R 777 /"), Some("recursive-chmod"));
        assert_eq!(
            p.dangerous_match("systemctl --now disable sshd"),
            Some("service-disable")
        );
        assert_eq!(p.dangerous_match("systemctl mask nginx"), Some("service-disable"));
        assert_eq!(p.dangerous_match(":(){ :|:& };:"), Some("fork-bomb"));
        assert_eq!(
            p.dangerous_match("echo 'x::0:0::/:/bin/sh' >> /etc/passwd"),
            Some("credential-overwrite")
        );
        assert_eq!(
            p.dangerous_match("cat key.pub | tee -a ~/.ssh/authorized_keys"),
            Some("credential-overwrite")
        );
    }

    #[test]
    fn ordinary_commands_are_not_dangerous() {
        let p = SudoPolicy::new();
        for cmd in [
            "ls -la /tmp",
            "rm -rf /tmp/build",
            "rm -rf ./target",
            "rm -rf '/tmp/build'",
            "rm -rf /etcetera",
            "cat /etc/passwd | grep -v '/nologin'",
            "systemctl status sshd",
            "chmod 644 notes.txt",
            "df -h",
        ] {
            assert!(!p.is_dangerous(cmd), "flagged: {cmd}");
        }
    }

    #[test]
    fn classify_combines_both_checks() {
        let risk = SudoPolicy::new().classify("sudo rm -rf /var");
        assert!(risk.privileged);
        assert!(risk.is_critical());
        let risk = SudoPolicy::new().classify("sudo ls");
        assert!(risk.privileged);
        assert!(!risk.is_critical());
    }

    #[test]
    fn sanitize_injects_prompt_for_each_sudo() {
        let p = SudoPolicy::new();
        assert_eq!(
            p.sanitize("sudo apt update"),
            format!("sudo -p '{SUDO_PROMPT}' apt update")
        );
        assert_eq!(
            p.sanitize("cd /srv && sudo make install"),
            format!("cd /srv && sudo -p '{SUDO_PROMPT}' make install")
        );
        assert_eq!(
            p.sanitize("env LANG=C /usr/bin/sudo id"),
            format!("env LANG=C /usr/bin/sudo -p '{SUDO_PROMPT}' id")
        );
    }

    #[test]
    fn sanitize_leaves_pipes_and_explicit_prompts_alone() {
        let p = SudoPolicy::new();
        assert_eq!(p.sanitize("sudo cat /var/log/syslog | tail"), "sudo cat /var/log/syslog | tail");
        assert_eq!(p.sanitize("sudo -p 'pw:' ls"), "sudo -p 'pw:' ls");
        assert_eq!(p.sanitize("ls -la"), "ls -la");
        assert_eq!(p.sanitize("/usr/bin/sudo -p 'pw:' ls"), "/usr/bin/sudo -p 'pw:' ls");
        assert_eq!(p.sanitize("su - root"), "su - root");
    }

    #[test]
    fn auth_failure_signatures() {
        let p = SudoPolicy::new();
        assert!(p.is_auth_failure("sudo ls", "Sorry, try again.\nsudo: 3 incorrect password attempts"));
        assert!(p.is_auth_failure("sudo ls", "sudo: a password is required\n"));
        assert!(p.is_auth_failure("su -", "su: Authentication failure"));
        assert!(p.is_auth_failure("sudo ls", "[neo-sudo] password for alice: \n"));
    }

    #[test]
    fn auth_failure_requires_privileged_command() {
        let p = SudoPolicy::new();
        let log = "sshd[1]: pam_unix(sshd:auth): authentication failure; rhost=1.2.3.4";
        assert!(!p.is_auth_failure("grep auth /var/log/auth.log", log));
        assert!(!p.is_auth_failure("sudo ls", "file1\nfile2\n"));
    }
}
