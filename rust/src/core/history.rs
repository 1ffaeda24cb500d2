// Append-only record of finished chats plus the aggregates the history page shows.

use crate::error::{CoreError, CoreResult};
use crate::state::{
    matches_query, ChatHistory, ChatSession, EndedBy, FriendRequestStatus, HistoryStats,
};

#[derive(Debug, Default)]
pub(crate) struct HistoryArchive {
    entries: Vec<ChatHistory>,
}

impl HistoryArchive {
    pub(crate) fn entries(&self) -> &[ChatHistory] {
        &self.entries
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshots a closed session. Entries are never edited afterwards, so a friendship
    /// formed later does not flip `became_friend` here.
    pub(crate) fn archive(
        &mut self,
        session: &ChatSession,
        ended_by: EndedBy,
        now: i64,
    ) -> ChatHistory {
        let p = &session.participant;
        let entry = ChatHistory {
            id: uuid::Uuid::new_v4().to_string(),
            stranger_id: p.id.clone(),
            stranger_name: p.name.clone(),
            stranger_avatar: p.avatar.clone(),
            stranger_avatar_color: p.avatar_color.clone(),
            stranger_region: p.region,
            stranger_gender: p.gender,
            duration_secs: now.saturating_sub(session.started_at).max(0) as u64,
            message_count: u32::try_from(session.messages.len()).unwrap_or(u32::MAX),
            start_time: session.started_at,
            ended_at: now,
            ended_by,
            // Friend chats were already friends going in.
            became_friend: session.is_stranger()
                && session.friend_request == FriendRequestStatus::Friends,
            chat_mode: session.kind,
        };
        self.entries.push(entry.clone());
        entry
    }

    pub(crate) fn delete_entry(&mut self, id: &str) -> CoreResult<ChatHistory> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| CoreError::not_found("history entry", id))?;
        Ok(self.entries.remove(idx))
    }

    pub(crate) fn clear_all(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    /// Entries whose stranger name or region matches `query`, newest first.
    pub(crate) fn search(&self, query: &str) -> Vec<ChatHistory> {
        self.entries
            .iter()
            .rev()
            .filter(|e| matches_query(&[e.stranger_name.as_str(), e.stranger_region.label()], query))
            .cloned()
            .collect()
    }

    pub(crate) fn stats(&self) -> HistoryStats {
        let total = self.entries.len() as u64;
        let total_duration_secs: u64 = self.entries.iter().map(|e| e.duration_secs).sum();
        let ended_by_you = self
            .entries
            .iter()
            .filter(|e| e.ended_by == EndedBy::You)
            .count() as u64;
        let ended_by_stranger = total - ended_by_you;

        // `max_by_key` keeps the last maximum; fold keeps the first.
        let longest_chat = self
            .entries
            .iter()
            .fold(None::<&ChatHistory>, |best, e| match best {
                Some(b) if b.duration_secs >= e.duration_secs => Some(b),
                _ => Some(e),
            })
            .cloned();

        let ended_by_you_percent = rounded_div(ended_by_you * 100, total) as u32;
        HistoryStats {
            total_chats: total as u32,
            total_duration_secs,
            average_duration_secs: rounded_div(total_duration_secs, total),
            longest_chat,
            ended_by_you: ended_by_you as u32,
            ended_by_stranger: ended_by_stranger as u32,
            ended_by_you_percent,
            // Complement, so the two shares always add up to 100.
            ended_by_stranger_percent: if total == 0 { 0 } else { 100 - ended_by_you_percent },
            friends_made: self.entries.iter().filter(|e| e.became_friend).count() as u32,
        }
    }
}

// Round-half-up integer division; zero when there is nothing to divide by.
fn rounded_div(n: u64, d: u64) -> u64 {
    if d == 0 {
        return 0;
    }
    (n + d / 2) / d
}

/// Compact duration for chat rows: `45s`, `3m 12s`, `1h 02m`.
pub fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChatKind, ChatMessage, MessageSender, Region, UserProfile};

    fn session(id: &str, started_at: i64, messages: usize) -> ChatSession {
        ChatSession {
            id: id.to_string(),
            kind: ChatKind::Stranger,
            participant: UserProfile {
                id: format!("p-{id}"),
                name: format!("Stranger {id}"),
                avatar: "🦉".to_string(),
                avatar_color: "from-amber-400 to-orange-500".to_string(),
                bio: String::new(),
                region: Region::SouthAmerica,
                gender: None,
                joined_date: 0,
            },
            messages: (0..messages)
                .map(|i| ChatMessage {
                    id: format!("m{i}"),
                    sender: MessageSender::Me,
                    text: "hi".to_string(),
                    timestamp: started_at + i as i64,
                })
                .collect(),
            started_at,
            friend_request: FriendRequestStatus::None,
            unread_count: 0,
        }
    }

    #[test]
    fn archive_snapshots_duration_and_message_count() {
        let mut archive = HistoryArchive::default();
        let entry = archive.archive(&session("a", 100, 3), EndedBy::You, 190);
        assert_eq!(entry.duration_secs, 90);
        assert_eq!(entry.message_count, 3);
        assert_eq!(entry.ended_by, EndedBy::You);
        assert!(!entry.became_friend);
        assert_eq!(entry.stranger_id, "p-a");
        assert_eq!(entry.chat_mode, ChatKind::Stranger);
        assert_eq!(archive.entries().len(), 1);
    }

    #[test]
    fn archive_marks_friendships() {
        let mut archive = HistoryArchive::default();
        let mut s = session("a", 0, 1);
        s.friend_request = FriendRequestStatus::Friends;
        assert!(archive.archive(&s, EndedBy::Stranger, 10).became_friend);

        s.friend_request = FriendRequestStatus::Sent;
        assert!(!archive.archive(&s, EndedBy::Stranger, 10).became_friend);
    }

    #[test]
    fn clock_skew_never_yields_negative_duration() {
        let mut archive = HistoryArchive::default();
        let entry = archive.archive(&session("a", 500, 0), EndedBy::You, 400);
        assert_eq!(entry.duration_secs, 0);
    }

    #[test]
    fn stats_on_empty_archive_are_zero() {
        let stats = HistoryArchive::default().stats();
        assert_eq!(stats, HistoryStats::default());
    }

    #[test]
    fn stats_aggregate_counts_and_percentages() {
        let mut archive = HistoryArchive::default();
        archive.archive(&session("a", 0, 2), EndedBy::You, 60);
        archive.archive(&session("b", 0, 5), EndedBy::Stranger, 100);
        archive.archive(&session("c", 0, 1), EndedBy::You, 15);

        let stats = archive.stats();
        assert_eq!(stats.total_chats as usize, archive.entries().len());
        assert_eq!(stats.total_duration_secs, 175);
        assert_eq!(stats.average_duration_secs, 58);
        let approx = stats.average_duration_secs * stats.total_chats as u64;
        assert!(approx.abs_diff(stats.total_duration_secs) < stats.total_chats as u64);
        assert_eq!(stats.ended_by_you, 2);
        assert_eq!(stats.ended_by_stranger, 1);
        assert_eq!(stats.ended_by_you_percent, 67);
        assert_eq!(stats.ended_by_stranger_percent, 33);
        assert_eq!(stats.longest_chat.unwrap().stranger_id, "p-b");
    }

    #[test]
    fn ended_by_percentages_sum_to_one_hundred() {
        let mut archive = HistoryArchive::default();
        archive.archive(&session("a", 0, 0), EndedBy::You, 1);
        for id in ["b", "c", "d", "e", "f", "g", "h"] {
            archive.archive(&session(id, 0, 0), EndedBy::Stranger, 1);
        }
        let stats = archive.stats();
        assert_eq!(stats.ended_by_you_percent, 13);
        assert_eq!(stats.ended_by_stranger_percent, 87);
        assert_eq!(
            stats.ended_by_you_percent + stats.ended_by_stranger_percent,
            100
        );
    }

    #[test]
    fn longest_chat_tie_goes_to_first_seen() {
        let mut archive = HistoryArchive::default();
        archive.archive(&session("a", 0, 0), EndedBy::You, 30);
        archive.archive(&session("b", 0, 0), EndedBy::You, 30);
        assert_eq!(archive.stats().longest_chat.unwrap().stranger_id, "p-a");
    }

    #[test]
    fn delete_and_clear() {
        let mut archive = HistoryArchive::default();
        let a = archive.archive(&session("a", 0, 0), EndedBy::You, 1);
        archive.archive(&session("b", 0, 0), EndedBy::You, 1);

        assert_eq!(archive.delete_entry(&a.id).unwrap().id, a.id);
        assert!(matches!(
            archive.delete_entry(&a.id),
            Err(CoreError::NotFound { .. })
        ));
        assert_eq!(archive.clear_all(), 1);
        assert!(archive.is_empty());
        assert_eq!(archive.stats().total_chats, 0);
    }

    #[test]
    fn search_is_newest_first_and_matches_region_label() {
        let mut archive = HistoryArchive::default();
        archive.archive(&session("a", 0, 0), EndedBy::You, 1);
        archive.archive(&session("b", 0, 0), EndedBy::You, 2);

        let ids: Vec<_> = archive
            .search("")
            .into_iter()
            .map(|e| e.stranger_id)
            .collect();
        assert_eq!(ids, vec!["p-b", "p-a"]);
        assert_eq!(archive.search("south america").len(), 2);
        assert_eq!(archive.search("stranger a").len(), 1);
        assert!(archive.search("europe").is_empty());
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(192), "3m 12s");
        assert_eq!(format_duration(3720), "1h 02m");
    }
}
