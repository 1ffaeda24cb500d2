// Two-step gate for destructive operations: Idle -> Pending -> (commit | cancel) -> Idle.

use crate::state::{Confirmation, PendingAction};

impl Confirmation {
    /// Puts `action` up for confirmation. A request made while another is pending replaces
    /// it, the way a newer dialog replaces an older one.
    pub(crate) fn request(&mut self, action: PendingAction) -> Option<PendingAction> {
        match std::mem::replace(self, Confirmation::Pending { action }) {
            Confirmation::Pending { action } => Some(action),
            Confirmation::Idle => None,
        }
    }

    /// Takes the pending action for commit, leaving the gate idle.
    pub(crate) fn take(&mut self) -> Option<PendingAction> {
        match std::mem::take(self) {
            Confirmation::Pending { action } => Some(action),
            Confirmation::Idle => None,
        }
    }

    /// Drops the pending action without side effects. Returns whether anything was pending.
    pub(crate) fn cancel(&mut self) -> bool {
        self.take().is_some()
    }

    /// Drops a pending action that targets a session which no longer exists.
    pub(crate) fn discard_for_session(&mut self, session_id: &str) -> bool {
        let stale = matches!(
            &*self,
            Confirmation::Pending {
                action: PendingAction::StopChat { session_id: id }
                    | PendingAction::SkipStranger { session_id: id },
            } if id == session_id
        );
        if stale {
            *self = Confirmation::Idle;
        }
        stale
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        match self {
            Confirmation::Pending { action } => Some(action),
            Confirmation::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: &str) -> PendingAction {
        PendingAction::StopChat {
            session_id: id.to_string(),
        }
    }

    #[test]
    fn request_then_take_commits_once() {
        let mut gate = Confirmation::Idle;
        assert_eq!(gate.request(stop("s1")), None);
        assert_eq!(gate.pending(), Some(&stop("s1")));

        assert_eq!(gate.take(), Some(stop("s1")));
        assert_eq!(gate, Confirmation::Idle);
        assert_eq!(gate.take(), None);
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut gate = Confirmation::Idle;
        assert!(!gate.cancel());
        gate.request(PendingAction::ClearHistory);
        assert!(gate.cancel());
        assert_eq!(gate, Confirmation::Idle);
    }

    #[test]
    fn newer_request_replaces_pending_one() {
        let mut gate = Confirmation::Idle;
        gate.request(stop("s1"));
        let replaced = gate.request(PendingAction::Unfriend {
            friend_id: "u1".into(),
        });
        assert_eq!(replaced, Some(stop("s1")));
        assert!(matches!(
            gate.pending(),
            Some(PendingAction::Unfriend { .. })
        ));
    }

    #[test]
    fn stale_targets_are_discarded() {
        let mut gate = Confirmation::Idle;
        gate.request(PendingAction::SkipStranger {
            session_id: "s1".into(),
        });
        assert!(!gate.discard_for_session("s2"));
        assert!(gate.discard_for_session("s1"));
        assert_eq!(gate, Confirmation::Idle);

        gate.request(PendingAction::Unfriend {
            friend_id: "u1".into(),
        });
        assert!(!gate.discard_for_session("u1"));
        assert!(gate.pending().is_some());
    }
}
