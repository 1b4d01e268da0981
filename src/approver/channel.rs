//! Channel-backed prompter: approval requests are forwarded to whichever
//! task owns the receiver, and answered through a oneshot.

use super::ApprovalPrompter;
use crate::policy::ApprovalRequest;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// Approval request waiting for an answer from the receiving task.
#[derive(Debug)]
pub struct PendingApproval {
    request: ApprovalRequest,
    response: oneshot::Sender<String>,
}

impl PendingApproval {
    pub fn request(&self) -> &ApprovalRequest {
        &self.request
    }

    pub fn command(&self) -> &str {
        &self.request.command
    }

    /// Reply with a raw response token (`y`, `t`, ...).
    pub fn respond(self, answer: impl Into<String>) {
        let _ = self.response.send(answer.into());
    }

    pub fn approve(self) {
        self.respond("y");
    }

    pub fn approve_all(self) {
        self.respond("t");
    }

    pub fn deny(self) {
        self.respond("n");
    }
}

/// Sender side for approval requests.
#[derive(Clone, Debug)]
pub struct ChannelPrompter {
    tx: mpsc::UnboundedSender<PendingApproval>,
    notices: Option<mpsc::UnboundedSender<String>>,
}

impl ChannelPrompter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PendingApproval>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, notices: None }, rx)
    }

    /// Also forward notices to a second receiver.
    pub fn with_notices(mut self) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.notices = Some(tx);
        (self, rx)
    }
}

#[async_trait]
impl ApprovalPrompter for ChannelPrompter {
    async fn ask(&self, request: &ApprovalRequest) -> String {
        let (response_tx, response_rx) = oneshot::channel();
        let pending = PendingApproval {
            request: request.clone(),
            response: response_tx,
        };
        if self.tx.send(pending).is_err() {
            tracing::warn!("approval receiver is gone; denying");
            return String::new();
        }
        // A dropped request resolves as a denial.
        response_rx.await.unwrap_or_default()
    }

    fn notice(&self, message: &str) {
        if let Some(tx) = &self.notices {
            let _ = tx.send(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SudoPolicy;

    fn request(command: &str) -> ApprovalRequest {
        ApprovalRequest {
            command: command.into(),
            risk: SudoPolicy::new().classify(command),
            allow_all: true,
            forced: false,
        }
    }

    #[tokio::test]
    async fn forwards_request_and_returns_answer() {
        let (prompter, mut rx) = ChannelPrompter::channel();
        let join = tokio::spawn(async move { prompter.ask(&request("echo hi")).await });

        let pending = rx.recv().await.expect("approval request expected");
        assert_eq!(pending.command(), "echo hi");
        pending.approve_all();

        assert_eq!(join.await.expect("join should succeed"), "t");
    }

    #[tokio::test]
    async fn dropped_request_is_a_denial() {
        let (prompter, mut rx) = ChannelPrompter::channel();
        let join = tokio::spawn(async move { prompter.ask(&request("ls")).await });
        drop(rx.recv().await.expect("approval request expected"));
        assert_eq!(join.await.expect("join should succeed"), "");
    }

    #[tokio::test]
    async fn closed_receiver_is_a_denial() {
        let (prompter, rx) = ChannelPrompter::channel();
        drop(rx);
        assert_eq!(prompter.ask(&request("ls")).await, "");
    }

    #[tokio::test]
    async fn notices_are_forwarded_when_enabled() {
        let (prompter, _rx) = ChannelPrompter::channel();
        let (prompter, mut notices) = prompter.with_notices();
        prompter.notice("privileged");
        assert_eq!(notices.recv().await.as_deref(), Some("privileged"));
    }
}
