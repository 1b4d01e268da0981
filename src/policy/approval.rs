//! Approval gate: decides whether one proposed action may run.
//!
//! Rules, in order:
//! 1. When the session skips prompts, ordinary commands are approved
//!    silently. Privileged and dangerous commands still get a fresh
//!    once/deny prompt.
//! 2. Otherwise the host is asked for once, all-future, or deny. The
//!    all-future option is withheld for privileged and dangerous commands.
//! 3. Anything but a recognized affirmative token denies.
//! 4. All-future flips `auto_approve_all` for the rest of the session.

use crate::approver::ApprovalPrompter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::session::SessionPolicyState;
use super::sudo::{CommandRisk, SudoPolicy};

/// How far an approval reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalScope {
    Once,
    AllFuture,
}

/// Outcome of one authorization cycle. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalDecision {
    pub approved: bool,
    pub scope: ApprovalScope,
}

impl ApprovalDecision {
    pub fn approve_once() -> Self {
        Self {
            approved: true,
            scope: ApprovalScope::Once,
        }
    }

    pub fn approve_all() -> Self {
        Self {
            approved: true,
            scope: ApprovalScope::AllFuture,
        }
    }

    pub fn deny() -> Self {
        Self {
            approved: false,
            scope: ApprovalScope::Once,
        }
    }
}

/// Prompt payload handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub command: String,
    pub risk: CommandRisk,
    /// Whether the approve-all-future answer is on offer.
    pub allow_all: bool,
    /// Set for irreversible actions that prompt even under auto-approve.
    pub forced: bool,
}

impl ApprovalRequest {
    /// Accepted answers, shown next to the prompt.
    pub fn choices(&self) -> &'static str {
        if self.allow_all {
            "[y]es once, [t] approve all, anything else denies"
        } else {
            "[y]es once, anything else denies"
        }
    }
}

/// Map a raw host response to a decision. Unrecognized input denies.
pub fn parse_approval_response(input: &str, allow_all: bool) -> ApprovalDecision {
    let normalized = input.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "y" | "yes" => ApprovalDecision::approve_once(),
        "t" | "a" | "all" if allow_all => ApprovalDecision::approve_all(),
        _ => ApprovalDecision::deny(),
    }
}

/// Authorization checkpoint between a proposed action and its execution.
#[derive(Clone)]
pub struct ApprovalGate {
    prompter: Arc<dyn ApprovalPrompter>,
    sudo: SudoPolicy,
    timeout: Option<Duration>,
}

impl ApprovalGate {
    pub fn new(prompter: Arc<dyn ApprovalPrompter>) -> Self {
        Self {
            prompter,
            sudo: SudoPolicy::new(),
            timeout: None,
        }
    }

    /// Deny prompts left unanswered for longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sudo_policy(&self) -> &SudoPolicy {
        &self.sudo
    }

    /// Run one authorization cycle for a shell command.
    pub async fn authorize(
        &self,
        command: &str,
        state: &mut SessionPolicyState,
    ) -> ApprovalDecision {
        let risk = self.sudo.classify(command);

        if state.skips_prompt() {
            if !risk.is_critical() {
                if risk.privileged {
                    self.prompter
                        .notice(&format!("running privileged command without prompt: {command}"));
                }
                return ApprovalDecision::approve_once();
            }
            info!(
                pattern = risk.dangerous.unwrap_or_default(),
                "privileged dangerous command requires confirmation despite auto-approve"
            );
        }

        let request = ApprovalRequest {
            command: command.to_string(),
            risk,
            allow_all: !risk.is_critical(),
            forced: false,
        };
        let decision = parse_approval_response(&self.ask(&request).await, request.allow_all);
        if decision.scope == ApprovalScope::AllFuture {
            state.auto_approve_all = true;
            info!("auto-approve enabled for the rest of the session");
        }
        info!(approved = decision.approved, command, "approval decision");
        decision
    }

    /// One-shot prompt for irreversible actions; ignores session auto-approve.
    pub async fn authorize_forced(&self, description: &str) -> ApprovalDecision {
        let request = ApprovalRequest {
            command: description.to_string(),
            risk: self.sudo.classify(description),
            allow_all: false,
            forced: true,
        };
        let decision = parse_approval_response(&self.ask(&request).await, false);
        info!(approved = decision.approved, action = description, "forced approval decision");
        decision
    }

    async fn ask(&self, request: &ApprovalRequest) -> String {
        let Some(limit) = self.timeout else {
            return self.prompter.ask(request).await;
        };
        match tokio::time::timeout(limit, self.prompter.ask(request)).await {
            Ok(answer) => answer,
            Err(_) => {
                warn!(?limit, "approval prompt timed out; denying");
                self.prompter.notice("approval timed out; denied");
                String::new()
            }
        }
    }
}

impl std::fmt::Debug for ApprovalGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalGate")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
