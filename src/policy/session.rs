//! Mutable per-session approval policy.

/// Approval flags shared by every directive processed in one host session.
///
/// Only an explicit approve-all response mutates this during processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicyState {
    pub require_approval: bool,
    pub auto_approve_all: bool,
    initial: (bool, bool),
}

impl SessionPolicyState {
    pub fn new(require_approval: bool, auto_approve_all: bool) -> Self {
        Self {
            require_approval,
            auto_approve_all,
            initial: (require_approval, auto_approve_all),
        }
    }

    /// True when commands run without asking (critical ones still ask).
    pub fn skips_prompt(&self) -> bool {
        !self.require_approval || self.auto_approve_all
    }

    /// Restore the flags this session started with.
    pub fn reset(&mut self) {
        (self.require_approval, self.auto_approve_all) = self.initial;
    }
}

impl Default for SessionPolicyState {
    fn default() -> Self {
        Self::new(true, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requires_approval() {
        let state = SessionPolicyState::default();
        assert!(state.require_approval);
        assert!(!state.auto_approve_all);
        assert!(!state.skips_prompt());
    }

    #[test]
    fn reset_restores_initial_flags() {
        let mut state = SessionPolicyState::new(true, false);
        state.auto_approve_all = true;
        assert!(state.skips_prompt());
        state.reset();
        assert_eq!(state, SessionPolicyState::new(true, false));
    }
}
