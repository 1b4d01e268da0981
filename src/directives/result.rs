//! Per-directive results and the per-text report that collects them.

use crate::error::{DirectiveError, ErrorKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of exactly one processed directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub protocol: String,
    pub command: String,
    pub executed: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Handler-specific annotations such as `network_operation`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl ExecutionResult {
    /// A successfully executed action.
    pub fn completed(
        protocol: impl Into<String>,
        command: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            command: command.into(),
            executed: true,
            output: output.into(),
            error: None,
            kind: None,
            meta: BTreeMap::new(),
        }
    }

    /// An action that did not run. `Denied` carries no error string; its
    /// message is the output.
    pub fn failure(
        protocol: impl Into<String>,
        command: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            protocol: protocol.into(),
            command: command.into(),
            executed: false,
            error: (kind != ErrorKind::Denied).then(|| message.clone()),
            output: message,
            kind: Some(kind),
            meta: BTreeMap::new(),
        }
    }

    pub fn from_error(
        protocol: impl Into<String>,
        command: impl Into<String>,
        err: &DirectiveError,
    ) -> Self {
        let mut result = Self::failure(protocol, command, err.kind(), err.to_string());
        if let DirectiveError::Timeout { partial, .. } = err {
            result.output = partial.clone();
        }
        result
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_denied(&self) -> bool {
        self.kind == Some(ErrorKind::Denied)
    }

    /// Text fed back to the model for this result.
    pub fn follow_up(&self) -> String {
        if let Some(error) = &self.error {
            let mut text = format!("The command '{}' failed: {error}", self.command);
            if !self.output.is_empty() && self.output != *error {
                text.push_str("\nOutput:\n");
                text.push_str(&self.output);
            }
            return text;
        }
        if self.executed {
            return format!(
                "The command '{}' was executed. Here is the result:\n{}",
                self.command, self.output
            );
        }
        format!("The command '{}' was not executed: {}", self.command, self.output)
    }
}

/// Every result produced from one text, in directive order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub results: Vec<ExecutionResult>,
}

impl DispatchReport {
    pub fn push(&mut self, result: ExecutionResult) {
        self.results.push(result);
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Results grouped by protocol; repeated tags keep every result.
    pub fn by_protocol(&self) -> BTreeMap<String, Vec<&ExecutionResult>> {
        let mut grouped: BTreeMap<String, Vec<&ExecutionResult>> = BTreeMap::new();
        for result in &self.results {
            grouped.entry(result.protocol.clone()).or_default().push(result);
        }
        grouped
    }

    /// Last result per protocol (single-slot view).
    pub fn latest_by_protocol(&self) -> BTreeMap<String, &ExecutionResult> {
        self.results
            .iter()
            .map(|result| (result.protocol.clone(), result))
            .collect()
    }

    /// Follow-up text covering every result, or empty when nothing ran.
    pub fn follow_up_prompt(&self) -> String {
        self.results
            .iter()
            .map(ExecutionResult::follow_up)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
