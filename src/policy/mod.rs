//! Authorization layer: command classification, session policy, and the
//! approval gate that combines them with a human decision.

pub mod approval;
pub mod session;
pub mod sudo;

pub use approval::{
    parse_approval_response, ApprovalDecision, ApprovalGate, ApprovalRequest, ApprovalScope,
};
pub use session::SessionPolicyState;
pub use sudo::{CommandRisk, SudoPolicy, SUDO_PROMPT};
