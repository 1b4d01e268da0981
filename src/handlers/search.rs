//! `search`: grep and find wrappers.
//!
//! Every pattern, path and extension is shell-quoted before it reaches the
//! command line. Patterns are passed with `-e` and paths never start with
//! `-`, so neither can be read as an option.

use super::grammar::{fields, path_operand};
use super::{Handler, HandlerContext, HandlerOutcome, ShellDirective};
use crate::error::DirectiveError;
use crate::executor::shell_quote;
use async_trait::async_trait;
use tracing::{debug, warn};

const SEARCH_TYPES: &[(&str, &str)] = &[
    ("file", "file:pattern filepath"),
    ("recursive", "recursive:pattern directory"),
    ("content", "content:extension pattern directory"),
    ("name", "name:pattern directory"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchRequest<'a> {
    File { pattern: &'a str, path: &'a str },
    Recursive { pattern: &'a str, dir: &'a str },
    Content { ext: &'a str, pattern: &'a str, dir: &'a str },
    Name { pattern: &'a str, dir: &'a str },
}

impl<'a> SearchRequest<'a> {
    fn parse(content: &'a str) -> Result<Self, DirectiveError> {
        // Params keep their inner spacing; only the type is trimmed.
        let Some((kind, params)) = content.split_once(':') else {
            return Err(malformed("Invalid search format. Use type:parameters".to_string()));
        };
        let kind = kind.trim();
        let params = params.trim();
        let Some(&(_, usage)) = SEARCH_TYPES.iter().find(|(name, _)| *name == kind) else {
            let valid: Vec<&str> = SEARCH_TYPES.iter().map(|(name, _)| *name).collect();
            return Err(malformed(format!(
                "Unknown search type '{kind}'. Valid types: {}",
                valid.join(", ")
            )));
        };
        let arity = if kind == "content" { 3 } else { 2 };
        let Some(parts) = fields(params, arity) else {
            return Err(malformed(format!("Invalid search format. Use {usage}")));
        };
        Ok(match (kind, parts.as_slice()) {
            ("file", &[pattern, path]) => Self::File { pattern, path },
            ("recursive", &[pattern, dir]) => Self::Recursive { pattern, dir },
            ("content", &[ext, pattern, dir]) => Self::Content { ext, pattern, dir },
            ("name", &[pattern, dir]) => Self::Name { pattern, dir },
            _ => return Err(malformed(format!("Invalid search format. Use {usage}"))),
        })
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Recursive { .. } => "recursive",
            Self::Content { .. } => "content",
            Self::Name { .. } => "name",
        }
    }

    fn command(&self) -> String {
        match self {
            Self::File { pattern, path } => format!(
                "grep -n -e {} -- {}",
                shell_quote(pattern),
                shell_quote(path)
            ),
            Self::Recursive { pattern, dir } => format!(
                "grep -r -n -e {} -- {}",
                shell_quote(pattern),
                shell_quote(dir)
            ),
            Self::Content { ext, pattern, dir } => format!(
                "find {} -name {} -exec grep -l -e {} {{}} \\;",
                shell_quote(&path_operand(dir)),
                shell_quote(&format!("*.{ext}")),
                shell_quote(pattern)
            ),
            Self::Name { pattern, dir } => format!(
                "find {} -name {}",
                shell_quote(&path_operand(dir)),
                shell_quote(pattern)
            ),
        }
    }
}

fn malformed(message: String) -> DirectiveError {
    DirectiveError::MalformedSubcommand(message)
}

#[derive(Debug, Default)]
pub struct SearchHandler;

impl SearchHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for SearchHandler {
    fn protocol(&self) -> &'static str {
        "search"
    }

    async fn handle(
        &self,
        content: &str,
        _ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, DirectiveError> {
        let request = SearchRequest::parse(content).inspect_err(|e| {
            warn!(content, "invalid search: {e}");
        })?;
        let command = request.command();
        debug!(%command, "generated search command");
        Ok(HandlerOutcome::Delegate(
            ShellDirective::new(command).with_meta("search_type", request.kind()),
        ))
    }
}
