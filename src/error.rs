//! Unified error types for directive processing.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Classification tag attached to every error-bearing execution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownProtocol,
    MalformedSubcommand,
    Denied,
    ProcessLaunchFailure,
    Timeout,
    AuthFailure,
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownProtocol => "unknown_protocol",
            Self::MalformedSubcommand => "malformed_subcommand",
            Self::Denied => "denied",
            Self::ProcessLaunchFailure => "process_launch_failure",
            Self::Timeout => "timeout",
            Self::AuthFailure => "auth_failure",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DirectiveError
// ---------------------------------------------------------------------------

/// Errors arising while handling one directive.
///
/// The dispatcher converts every variant into an error-bearing result, so
/// none of these escape a processing cycle.
#[derive(Debug)]
pub enum DirectiveError {
    /// No handler is registered for the tag name.
    UnknownProtocol(String),
    /// The handler could not parse its `verb:params` content.
    MalformedSubcommand(String),
    /// The approval gate refused the action. Carries the user-facing message.
    Denied(String),
    /// The persistent worker could not be started.
    ProcessLaunchFailure(String),
    /// The command did not finish within the wait ceiling.
    Timeout { waited: Duration, partial: String },
    /// An elevation prompt rejected or never received a password.
    AuthFailure(String),
    Io(std::io::Error),
}

impl DirectiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownProtocol(_) => ErrorKind::UnknownProtocol,
            Self::MalformedSubcommand(_) => ErrorKind::MalformedSubcommand,
            Self::Denied(_) => ErrorKind::Denied,
            Self::ProcessLaunchFailure(_) => ErrorKind::ProcessLaunchFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::AuthFailure(_) => ErrorKind::AuthFailure,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for DirectiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProtocol(name) => write!(f, "Unknown protocol '{name}'"),
            Self::MalformedSubcommand(msg) => f.write_str(msg),
            Self::Denied(msg) => f.write_str(msg),
            Self::ProcessLaunchFailure(msg) => write!(f, "process launch failed: {msg}"),
            Self::Timeout { waited, .. } => {
                write!(f, "timeout: command did not finish within {}", format_secs(*waited))
            }
            Self::AuthFailure(msg) => write!(f, "authentication failed: {msg}"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

fn format_secs(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

impl std::error::Error for DirectiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DirectiveError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}
