use crate::state::{AppState, FriendRequest, UserProfile};
use crate::AppAction;

#[derive(uniffi::Enum, Clone, Debug)]
pub enum AppUpdate {
    FullState(AppState),
    /// Side-effect update so the UI can play a sound or vibrate; the new session is
    /// already part of the snapshot.
    MatchFound {
        rev: u64,
        session_id: String,
    },
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
            AppUpdate::MatchFound { rev, .. } => *rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Internal(Box<InternalEvent>),
}

/// Events from the matcher and the chat transport. They share the action queue so remote
/// changes are serialized against local intents.
#[derive(Debug)]
pub enum InternalEvent {
    // Matcher
    StrangerMatched {
        profile: UserProfile,
    },
    MatchTimedOut,

    // Transport
    MessageReceived {
        session_id: String,
        text: String,
    },
    StrangerLeft {
        session_id: String,
    },
    FriendRequestReceived {
        request: FriendRequest,
    },
    FriendRequestAccepted {
        participant_id: String,
    },
    FriendPresenceChanged {
        friend_id: String,
        is_online: bool,
    },
}

impl InternalEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            InternalEvent::StrangerMatched { .. } => "StrangerMatched",
            InternalEvent::MatchTimedOut => "MatchTimedOut",
            InternalEvent::MessageReceived { .. } => "MessageReceived",
            InternalEvent::StrangerLeft { .. } => "StrangerLeft",
            InternalEvent::FriendRequestReceived { .. } => "FriendRequestReceived",
            InternalEvent::FriendRequestAccepted { .. } => "FriendRequestAccepted",
            InternalEvent::FriendPresenceChanged { .. } => "FriendPresenceChanged",
        }
    }
}
