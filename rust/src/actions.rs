use crate::state::Region;

#[derive(uniffi::Enum, Debug, Clone)]
pub enum AppAction {
    // Sessions
    SendMessage {
        session_id: String,
        text: String,
    },
    SwitchChat {
        session_id: String,
    },
    /// Skips the active stranger chat and looks for the next match.
    SkipStranger,
    StopChat {
        session_id: String,
    },
    StartFriendChat {
        friend_id: String,
    },

    // Matching
    FindStranger,
    CancelMatching,
    UpdateWaitTime {
        wait_time_secs: Option<u32>,
    },
    UpdateRegion {
        region: Region,
    },

    // Relationships
    SendFriendRequest {
        session_id: String,
    },
    AcceptFriendRequest {
        request_id: String,
    },
    DeclineFriendRequest {
        request_id: String,
    },
    Unfriend {
        friend_id: String,
    },
    SearchFriends {
        query: String,
    },

    // History
    DeleteHistoryChat {
        history_id: String,
    },
    ClearAllHistory,
    SearchHistory {
        query: String,
    },

    // Confirmation dialog
    ConfirmPending,
    CancelPending,

    // UI
    OpenProfile {
        target_id: String,
    },
    CloseProfile,
    ClearToast,
}

impl AppAction {
    /// Log-safe action tag (never includes message text or search queries).
    pub fn tag(&self) -> &'static str {
        match self {
            // Sessions
            AppAction::SendMessage { .. } => "SendMessage",
            AppAction::SwitchChat { .. } => "SwitchChat",
            AppAction::SkipStranger => "SkipStranger",
            AppAction::StopChat { .. } => "StopChat",
            AppAction::StartFriendChat { .. } => "StartFriendChat",

            // Matching
            AppAction::FindStranger => "FindStranger",
            AppAction::CancelMatching => "CancelMatching",
            AppAction::UpdateWaitTime { .. } => "UpdateWaitTime",
            AppAction::UpdateRegion { .. } => "UpdateRegion",

            // Relationships
            AppAction::SendFriendRequest { .. } => "SendFriendRequest",
            AppAction::AcceptFriendRequest { .. } => "AcceptFriendRequest",
            AppAction::DeclineFriendRequest { .. } => "DeclineFriendRequest",
            AppAction::Unfriend { .. } => "Unfriend",
            AppAction::SearchFriends { .. } => "SearchFriends",

            // History
            AppAction::DeleteHistoryChat { .. } => "DeleteHistoryChat",
            AppAction::ClearAllHistory => "ClearAllHistory",
            AppAction::SearchHistory { .. } => "SearchHistory",

            // Confirmation dialog
            AppAction::ConfirmPending => "ConfirmPending",
            AppAction::CancelPending => "CancelPending",

            // UI
            AppAction::OpenProfile { .. } => "OpenProfile",
            AppAction::CloseProfile => "CloseProfile",
            AppAction::ClearToast => "ClearToast",
        }
    }
}
