//! `memory`: a small key/value scratchpad that lives as long as the handler.

use super::grammar::split_verb;
use super::{Handler, HandlerContext, HandlerOutcome};
use crate::directives::result::ExecutionResult;
use crate::error::{DirectiveError, ErrorKind};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const PROTOCOL: &str = "memory";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemoryRequest<'a> {
    Save { key: &'a str, value: &'a str },
    Get { key: &'a str },
    List,
    Clear,
}

impl<'a> MemoryRequest<'a> {
    fn parse(content: &'a str) -> Result<Self, DirectiveError> {
        match split_verb(content) {
            ("save", Some(pair)) => match pair.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => Ok(Self::Save {
                    key: key.trim(),
                    value: value.trim(),
                }),
                _ => Err(DirectiveError::MalformedSubcommand(
                    "Invalid save format. Use save:key=value".to_string(),
                )),
            },
            ("get", Some(key)) => Ok(Self::Get { key }),
            ("list", None) => Ok(Self::List),
            ("clear", None) => Ok(Self::Clear),
            _ => Err(DirectiveError::MalformedSubcommand(
                "Unknown memory command. Use save:, get:, list, or clear.".to_string(),
            )),
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::Save { .. } => "save",
            Self::Get { .. } => "get",
            Self::List => "list",
            Self::Clear => "clear",
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryHandler {
    store: Mutex<BTreeMap<String, String>>,
}

impl MemoryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }
}

#[async_trait]
impl Handler for MemoryHandler {
    fn protocol(&self) -> &'static str {
        PROTOCOL
    }

    async fn handle(
        &self,
        content: &str,
        _ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, DirectiveError> {
        let request = MemoryRequest::parse(content)?;
        let mut store = self.store.lock().await;
        let result = match request {
            MemoryRequest::Save { key, value } => {
                store.insert(key.to_string(), value.to_string());
                debug!(key, "saved memory entry");
                ExecutionResult::completed(PROTOCOL, content, format!("Saved '{key}' to memory."))
            }
            MemoryRequest::Get { key } => match store.get(key) {
                Some(value) => ExecutionResult::completed(PROTOCOL, content, value.clone()),
                None => {
                    warn!(key, "memory key not found");
                    ExecutionResult::failure(
                        PROTOCOL,
                        content,
                        ErrorKind::Io,
                        format!("Key '{key}' not found in memory."),
                    )
                }
            },
            MemoryRequest::List => {
                let listing = if store.is_empty() {
                    "Memory is empty.".to_string()
                } else {
                    store
                        .iter()
                        .map(|(k, v)| format!("{k}: {v}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                ExecutionResult::completed(PROTOCOL, content, listing)
            }
            MemoryRequest::Clear => {
                let removed = store.len();
                store.clear();
                debug!(removed, "cleared memory");
                ExecutionResult::completed(
                    PROTOCOL,
                    content,
                    format!("Memory cleared ({removed} items removed)."),
                )
            }
        };
        Ok(HandlerOutcome::Completed(
            result.with_meta("memory_operation", request.operation()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_util::{malformed, run};
    use crate::policy::SessionPolicyState;

    async fn output(handler: &MemoryHandler, content: &str) -> ExecutionResult {
        let mut policy = SessionPolicyState::default();
        match run(handler, content, &[], &mut policy).await.0 {
            Ok(HandlerOutcome::Completed(result)) => result,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let h = MemoryHandler::new();
        assert_eq!(output(&h, "save: a = 1 ").await.output, "Saved 'a' to memory.");
        let got = output(&h, "get:a").await;
        assert!(got.executed);
        assert_eq!(got.output, "1");
        assert_eq!(got.meta["memory_operation"], "get");
    }

    #[tokio::test]
    async fn value_may_contain_equals_sign() {
        let h = MemoryHandler::new();
        output(&h, "save:query=a=b").await;
        assert_eq!(output(&h, "get:query").await.output, "a=b");
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let h = MemoryHandler::new();
        let got = output(&h, "get:nope").await;
        assert!(!got.executed);
        assert_eq!(got.output, "Key 'nope' not found in memory.");
    }

    #[tokio::test]
    async fn list_and_clear() {
        let h = MemoryHandler::new();
        assert_eq!(output(&h, "list").await.output, "Memory is empty.");
        output(&h, "save:b=2").await;
        output(&h, "save:a=1").await;
        assert_eq!(output(&h, "list").await.output, "a: 1\nb: 2");
        assert_eq!(output(&h, "clear").await.output, "Memory cleared (2 items removed).");
        assert_eq!(h.len().await, 0);
    }

    #[tokio::test]
    async fn malformed_requests() {
        let h = MemoryHandler::new();
        assert_eq!(malformed(&h, "save:novalue").await, "Invalid save format. Use save:key=value");
        assert_eq!(
            malformed(&h, "forget:x").await,
            "Unknown memory command. Use save:, get:, list, or clear."
        );
    }
}
