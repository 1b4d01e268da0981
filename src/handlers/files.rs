//! `files`: read, write, append and list, performed in-process.
//!
//! Reads go through the normal approval cycle. Writes and appends always
//! prompt, since they cannot be undone.

use super::grammar::split_verb;
use super::{Handler, HandlerContext, HandlerOutcome};
use crate::directives::result::ExecutionResult;
use crate::error::{DirectiveError, ErrorKind};
use crate::textutil::truncate_with_suffix_by_bytes;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const PROTOCOL: &str = "files";
const META_KEY: &str = "file_operation";
const PREVIEW_BYTES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilesRequest<'a> {
    Read { path: &'a str },
    Write { path: &'a str, content: &'a str },
    Append { path: &'a str, content: &'a str },
    List { dir: &'a str },
}

impl<'a> FilesRequest<'a> {
    fn parse(content: &'a str) -> Result<Self, DirectiveError> {
        let (verb, params) = split_verb(content);
        match (verb, params) {
            ("read", Some(path)) => Ok(Self::Read { path }),
            ("write", Some(params)) => {
                let (path, content) = path_and_content(params, "write")?;
                Ok(Self::Write { path, content })
            }
            ("append", Some(params)) => {
                let (path, content) = path_and_content(params, "append")?;
                Ok(Self::Append { path, content })
            }
            ("list", Some(dir)) => Ok(Self::List {
                dir: if dir.is_empty() { "." } else { dir },
            }),
            _ => Err(DirectiveError::MalformedSubcommand(
                "Unknown files command. Use read:, write:, append:, or list:".to_string(),
            )),
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Append { .. } => "append",
            Self::List { .. } => "list",
        }
    }
}

fn path_and_content<'a>(params: &'a str, verb: &str) -> Result<(&'a str, &'a str), DirectiveError> {
    match params.split_once(' ') {
        Some((path, content)) if !path.is_empty() => Ok((path, content)),
        _ => Err(DirectiveError::MalformedSubcommand(format!(
            "Invalid {verb} format. Use {verb}:filepath content"
        ))),
    }
}

fn preview(content: &str) -> String {
    if content.len() > PREVIEW_BYTES {
        truncate_with_suffix_by_bytes(content, PREVIEW_BYTES, "...")
    } else {
        content.to_string()
    }
}

#[derive(Debug, Default)]
pub struct FilesHandler;

impl FilesHandler {
    pub fn new() -> Self {
        Self
    }

    async fn read(
        &self,
        content: &str,
        path: &str,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<ExecutionResult, DirectiveError> {
        let decision = ctx
            .gate
            .authorize(&format!("Read file: {path}"), ctx.policy)
            .await;
        if !decision.approved {
            info!(path, "file read denied");
            return Err(DirectiveError::Denied("File reading was denied.".to_string()));
        }
        if !Path::new(path).is_file() {
            warn!(path, "file not found");
            return Ok(not_found(content, format!("File not found: {path}")));
        }
        let bytes = tokio::fs::read(path).await?;
        debug!(path, bytes = bytes.len(), "read file");
        Ok(ExecutionResult::completed(
            PROTOCOL,
            content,
            String::from_utf8_lossy(&bytes),
        ))
    }

    async fn write(
        &self,
        content: &str,
        path: &str,
        body: &str,
        append: bool,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<ExecutionResult, DirectiveError> {
        let (action, denied) = if append {
            ("Append to file", "File appending was denied.")
        } else {
            ("Write to file", "File writing was denied.")
        };
        let decision = ctx
            .gate
            .authorize_forced(&format!("{action}: {path}\nContent: {}", preview(body)))
            .await;
        if !decision.approved {
            info!(path, append, "file modification denied");
            return Err(DirectiveError::Denied(denied.to_string()));
        }

        if append {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(body.as_bytes()).await?;
            file.flush().await?;
            debug!(path, bytes = body.len(), "appended to file");
            return Ok(ExecutionResult::completed(
                PROTOCOL,
                content,
                format!("Successfully appended to file: {path}"),
            ));
        }

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
                debug!(dir = %parent.display(), "created parent directory");
            }
        }
        tokio::fs::write(path, body).await?;
        debug!(path, bytes = body.len(), "wrote file");
        Ok(ExecutionResult::completed(
            PROTOCOL,
            content,
            format!("Successfully wrote to file: {path}"),
        ))
    }

    async fn list(&self, content: &str, dir: &str) -> Result<ExecutionResult, DirectiveError> {
        if !Path::new(dir).is_dir() {
            warn!(dir, "directory not found");
            return Ok(not_found(content, format!("Directory not found: {dir}")));
        }
        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = reader.next_entry().await? {
            let meta = entry.metadata().await?;
            let kind = if meta.is_dir() { 'd' } else { 'f' };
            entries.push((
                entry.file_name().to_string_lossy().into_owned(),
                kind,
                meta.len(),
            ));
        }
        entries.sort();
        debug!(dir, count = entries.len(), "listed directory");
        let listing = entries
            .iter()
            .map(|(name, kind, size)| format!("{kind} {size:8} {name}"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ExecutionResult::completed(PROTOCOL, content, listing))
    }
}

fn not_found(content: &str, message: String) -> ExecutionResult {
    ExecutionResult::failure(PROTOCOL, content, ErrorKind::Io, message)
}

#[async_trait]
impl Handler for FilesHandler {
    fn protocol(&self) -> &'static str {
        PROTOCOL
    }

    async fn handle(
        &self,
        content: &str,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, DirectiveError> {
        let request = FilesRequest::parse(content)?;
        let result = match request {
            FilesRequest::Read { path } => self.read(content, path, ctx).await?,
            FilesRequest::Write { path, content: body } => {
                self.write(content, path, body, false, ctx).await?
            }
            FilesRequest::Append { path, content: body } => {
                self.write(content, path, body, true, ctx).await?
            }
            FilesRequest::List { dir } => self.list(content, dir).await?,
        };
        Ok(HandlerOutcome::Completed(
            result.with_meta(META_KEY, request.operation()),
        ))
    }
}
