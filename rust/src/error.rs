//! Error types for store operations.

use thiserror::Error;

use crate::state::PendingAction;

/// Error type shared by the session registry, relationship store and history archive.
///
/// None of these cross the FFI boundary: the app actor absorbs every variant and turns it
/// into either "no state change", a toast, or a pending confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The referenced session, friend, request or history entry no longer exists.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Rejected before any state was touched.
    #[error("{0}")]
    InvalidInput(String),

    /// Destructive operation that must pass through the confirmation gate first.
    #[error("confirmation required: {}", .0.tag())]
    ConfirmationRequired(PendingAction),

    /// Valid request that would not change anything.
    #[error("unchanged")]
    Unchanged,
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_display() {
        let err = CoreError::not_found("session", "abc");
        assert_eq!(err.to_string(), "session not found: abc");

        let err = CoreError::invalid("Message is empty");
        assert_eq!(err.to_string(), "Message is empty");

        let err = CoreError::ConfirmationRequired(PendingAction::ClearHistory);
        assert_eq!(err.to_string(), "confirmation required: ClearHistory");

        assert_eq!(CoreError::Unchanged.to_string(), "unchanged");
    }

    #[test]
    fn core_error_is_error() {
        let err: Box<dyn std::error::Error> = Box::new(CoreError::not_found("friend", "u1"));
        assert!(err.to_string().contains("friend not found"));
    }
}
