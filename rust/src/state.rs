use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Matching region. `Worldwide` disables the region filter.
#[derive(
    uniffi::Enum, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    #[default]
    Worldwide,
    NorthAmerica,
    SouthAmerica,
    Europe,
    Asia,
    Africa,
    Oceania,
}

impl Region {
    pub const ALL: [Region; 7] = [
        Region::Worldwide,
        Region::NorthAmerica,
        Region::SouthAmerica,
        Region::Europe,
        Region::Asia,
        Region::Africa,
        Region::Oceania,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Region::Worldwide => "Worldwide",
            Region::NorthAmerica => "North America",
            Region::SouthAmerica => "South America",
            Region::Europe => "Europe",
            Region::Asia => "Asia",
            Region::Africa => "Africa",
            Region::Oceania => "Oceania",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Region::Worldwide => "worldwide",
            Region::NorthAmerica => "north-america",
            Region::SouthAmerica => "south-america",
            Region::Europe => "europe",
            Region::Asia => "asia",
            Region::Africa => "africa",
            Region::Oceania => "oceania",
        }
    }
}

impl FromStr for Region {
    type Err = CoreError;

    /// Accepts either the slug (`north-america`) or the label (`North America`).
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        Region::ALL
            .into_iter()
            .find(|r| r.slug() == normalized)
            .ok_or_else(|| CoreError::invalid(format!("Unknown region: {}", input.trim())))
    }
}

/// Allowed matching wait times. `None` waits forever.
pub const WAIT_TIME_CHOICES: [Option<u32>; 4] = [Some(15), Some(30), Some(60), None];

pub const DEFAULT_WAIT_TIME_SECS: Option<u32> = Some(30);

pub fn validate_wait_time(wait_time_secs: Option<u32>) -> Result<Option<u32>, CoreError> {
    if WAIT_TIME_CHOICES.contains(&wait_time_secs) {
        Ok(wait_time_secs)
    } else {
        Err(CoreError::invalid(format!(
            "Unsupported wait time: {}s",
            wait_time_secs.unwrap_or_default()
        )))
    }
}

#[uniffi::export]
pub fn wait_time_label(wait_time_secs: Option<u32>) -> String {
    match wait_time_secs {
        None => "Forever".to_string(),
        Some(secs) => format!("{secs} seconds"),
    }
}

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    /// Single emoji.
    pub avatar: String,
    /// Gradient token, e.g. `from-violet-500 to-fuchsia-500`.
    pub avatar_color: String,
    pub bio: String,
    pub region: Region,
    pub gender: Option<Gender>,
    /// Unix seconds.
    pub joined_date: i64,
}

impl UserProfile {
    pub fn joined_label(&self) -> String {
        chrono::DateTime::<chrono::Utc>::from_timestamp(self.joined_date, 0)
            .map(|d| format!("Joined {}", d.format("%B %Y")))
            .unwrap_or_default()
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct Friend {
    pub profile: UserProfile,
    pub is_online: bool,
    pub last_seen: Option<i64>,
}

impl Friend {
    pub fn id(&self) -> &str {
        &self.profile.id
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct FriendRequest {
    pub id: String,
    pub from: Friend,
    pub received_at: i64,
}

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Stranger,
    Friend,
}

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageSender {
    Me,
    Peer,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub sender: MessageSender,
    pub text: String,
    pub timestamp: i64,
}

/// Friendship progress for the participant of an open session.
#[derive(uniffi::Enum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FriendRequestStatus {
    #[default]
    None,
    Sent,
    Friends,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ChatSession {
    pub id: String,
    pub kind: ChatKind,
    pub participant: UserProfile,
    pub messages: Vec<ChatMessage>,
    pub started_at: i64,
    pub friend_request: FriendRequestStatus,
    pub unread_count: u32,
}

impl ChatSession {
    pub fn is_stranger(&self) -> bool {
        self.kind == ChatKind::Stranger
    }
}

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndedBy {
    You,
    Stranger,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ChatHistory {
    pub id: String,
    pub stranger_id: String,
    pub stranger_name: String,
    pub stranger_avatar: String,
    pub stranger_avatar_color: String,
    pub stranger_region: Region,
    pub stranger_gender: Option<Gender>,
    pub duration_secs: u64,
    pub message_count: u32,
    pub start_time: i64,
    pub ended_at: i64,
    pub ended_by: EndedBy,
    pub became_friend: bool,
    pub chat_mode: ChatKind,
}

#[derive(uniffi::Record, Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub total_chats: u32,
    pub total_duration_secs: u64,
    pub average_duration_secs: u64,
    pub longest_chat: Option<ChatHistory>,
    pub ended_by_you: u32,
    pub ended_by_stranger: u32,
    pub ended_by_you_percent: u32,
    pub ended_by_stranger_percent: u32,
    pub friends_made: u32,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct MatchingSettings {
    pub region: Region,
    pub wait_time_secs: Option<u32>,
}

impl MatchingSettings {
    pub fn wait_time_label(&self) -> String {
        wait_time_label(self.wait_time_secs)
    }
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            region: Region::Worldwide,
            wait_time_secs: DEFAULT_WAIT_TIME_SECS,
        }
    }
}

#[derive(uniffi::Enum, Clone, Debug, PartialEq, Eq)]
pub enum MatchingStatus {
    Idle,
    Searching {
        started_at: i64,
        region: Region,
        wait_time_secs: Option<u32>,
    },
}

impl MatchingStatus {
    pub fn is_searching(&self) -> bool {
        matches!(self, Self::Searching { .. })
    }
}

/// Destructive operation waiting on an explicit yes/no from the user.
#[derive(uniffi::Enum, Clone, Debug, PartialEq, Eq)]
pub enum PendingAction {
    StopChat { session_id: String },
    SkipStranger { session_id: String },
    Unfriend { friend_id: String },
    ClearHistory,
}

impl PendingAction {
    pub fn tag(&self) -> &'static str {
        match self {
            PendingAction::StopChat { .. } => "StopChat",
            PendingAction::SkipStranger { .. } => "SkipStranger",
            PendingAction::Unfriend { .. } => "Unfriend",
            PendingAction::ClearHistory => "ClearHistory",
        }
    }
}

#[derive(uniffi::Enum, Clone, Debug, Default, PartialEq, Eq)]
pub enum Confirmation {
    #[default]
    Idle,
    Pending {
        action: PendingAction,
    },
}

/// Whose profile the profile dialog is showing.
#[derive(uniffi::Enum, Clone, Debug, PartialEq, Eq)]
pub enum ProfileSubject {
    Myself { profile: UserProfile },
    Friend { friend: Friend },
    Stranger { profile: UserProfile },
}

impl ProfileSubject {
    pub fn profile(&self) -> &UserProfile {
        match self {
            ProfileSubject::Myself { profile } | ProfileSubject::Stranger { profile } => profile,
            ProfileSubject::Friend { friend } => &friend.profile,
        }
    }
}

#[derive(uniffi::Record, Clone, Debug)]
pub struct AppState {
    pub rev: u64,
    pub me: UserProfile,
    pub sessions: Vec<ChatSession>,
    pub active_session_id: Option<String>,
    pub friends: Vec<Friend>,
    /// Together with `offline_friends`, always the whole friend list.
    pub online_friends: Vec<Friend>,
    pub offline_friends: Vec<Friend>,
    /// `friends` filtered by `friend_search`.
    pub visible_friends: Vec<Friend>,
    pub friend_search: String,
    pub friend_requests: Vec<FriendRequest>,
    pub history: Vec<ChatHistory>,
    /// `history` filtered by `history_search`, newest first.
    pub visible_history: Vec<ChatHistory>,
    pub history_search: String,
    pub history_stats: HistoryStats,
    pub settings: MatchingSettings,
    pub matching: MatchingStatus,
    pub confirmation: Confirmation,
    pub profile_dialog: Option<ProfileSubject>,
    pub toast: Option<String>,
}

impl AppState {
    pub fn new(me: UserProfile, settings: MatchingSettings) -> Self {
        Self {
            rev: 0,
            me,
            sessions: vec![],
            active_session_id: None,
            friends: vec![],
            online_friends: vec![],
            offline_friends: vec![],
            visible_friends: vec![],
            friend_search: String::new(),
            friend_requests: vec![],
            history: vec![],
            visible_history: vec![],
            history_search: String::new(),
            history_stats: HistoryStats::default(),
            settings,
            matching: MatchingStatus::Idle,
            confirmation: Confirmation::Idle,
            profile_dialog: None,
            toast: None,
        }
    }

    /// Placeholder published until the core has loaded its config.
    pub fn empty() -> Self {
        let me = UserProfile {
            id: String::new(),
            name: String::new(),
            avatar: String::new(),
            avatar_color: String::new(),
            bio: String::new(),
            region: Region::Worldwide,
            gender: None,
            joined_date: 0,
        };
        Self::new(me, MatchingSettings::default())
    }

    pub fn active_session(&self) -> Option<&ChatSession> {
        let id = self.active_session_id.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }
}

pub fn now_seconds() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Case-insensitive substring match; an empty needle matches everything.
pub(crate) fn matches_query(haystacks: &[&str], query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    haystacks.iter().any(|h| h.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forever_wait_time_has_a_label() {
        assert_eq!(wait_time_label(None), "Forever");
        assert_eq!(wait_time_label(Some(15)), "15 seconds");
        let settings = MatchingSettings {
            region: Region::Asia,
            wait_time_secs: None,
        };
        assert_eq!(settings.wait_time_label(), "Forever");
    }

    #[test]
    fn wait_time_validation_accepts_only_the_fixed_choices() {
        for choice in WAIT_TIME_CHOICES {
            assert_eq!(validate_wait_time(choice), Ok(choice));
        }
        assert!(matches!(
            validate_wait_time(Some(45)),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(validate_wait_time(Some(0)).is_err());
    }

    #[test]
    fn region_parses_slugs_and_labels() {
        assert_eq!("north-america".parse::<Region>(), Ok(Region::NorthAmerica));
        assert_eq!(" South America ".parse::<Region>(), Ok(Region::SouthAmerica));
        assert_eq!("WORLDWIDE".parse::<Region>(), Ok(Region::Worldwide));
        assert_eq!("oceania".parse::<Region>(), Ok(Region::Oceania));
        assert!(matches!(
            "atlantis".parse::<Region>(),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn region_slug_roundtrips_through_serde() {
        let json = serde_json::to_string(&Region::NorthAmerica).unwrap();
        assert_eq!(json, "\"north-america\"");
        for region in Region::ALL {
            assert_eq!(region.slug().parse::<Region>(), Ok(region));
        }
    }

    #[test]
    fn joined_label_formats_month_and_year() {
        let profile = UserProfile {
            id: "me".into(),
            name: "Me".into(),
            avatar: "🦊".into(),
            avatar_color: "from-orange-400 to-rose-500".into(),
            bio: String::new(),
            region: Region::Europe,
            gender: None,
            joined_date: 1_741_000_000, // 2025-03-03
        };
        assert_eq!(profile.joined_label(), "Joined March 2025");
    }

    #[test]
    fn query_matching_is_case_insensitive() {
        assert!(matches_query(&["Sam", "likes jazz"], "JAZZ"));
        assert!(matches_query(&["Sam"], "  "));
        assert!(!matches_query(&["Sam", "likes jazz"], "rock"));
    }
}
