// Open conversations and the single active selection.

use crate::error::{CoreError, CoreResult};
use crate::state::{
    ChatKind, ChatMessage, ChatSession, EndedBy, Friend, FriendRequestStatus, MessageSender,
    UserProfile,
};

pub(crate) const MAX_MESSAGE_LEN: usize = 2000;
pub(crate) const DEFAULT_MAX_OPEN_SESSIONS: usize = 5;

#[derive(Debug)]
pub(crate) struct SessionRegistry {
    // Insertion order; the last entry is the most recently opened.
    sessions: Vec<ChatSession>,
    active: Option<String>,
    max_open: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OPEN_SESSIONS)
    }
}

impl SessionRegistry {
    pub(crate) fn new(max_open: usize) -> Self {
        Self {
            sessions: Vec::new(),
            active: None,
            max_open: max_open.max(1),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.sessions.len() >= self.max_open
    }

    pub(crate) fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub(crate) fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub(crate) fn get(&self, session_id: &str) -> CoreResult<&ChatSession> {
        self.sessions
            .iter()
            .find(|s| s.id == session_id)
            .ok_or_else(|| CoreError::not_found("session", session_id))
    }

    fn get_mut(&mut self, session_id: &str) -> CoreResult<&mut ChatSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| CoreError::not_found("session", session_id))
    }

    pub(crate) fn find_by_participant(&self, participant_id: &str) -> Option<&ChatSession> {
        self.sessions
            .iter()
            .rev()
            .find(|s| s.participant.id == participant_id)
    }

    pub(crate) fn participant_ids(&self) -> Vec<String> {
        self.sessions
            .iter()
            .map(|s| s.participant.id.clone())
            .collect()
    }

    fn insert_active(&mut self, session: ChatSession) -> String {
        let id = session.id.clone();
        self.sessions.push(session);
        self.active = Some(id.clone());
        id
    }

    /// Opens a session with a freshly matched stranger and selects it.
    pub(crate) fn open_stranger_session(
        &mut self,
        participant: UserProfile,
        now: i64,
    ) -> CoreResult<String> {
        if self.is_full() {
            return Err(CoreError::invalid(format!(
                "You can have at most {} chats open",
                self.max_open
            )));
        }
        if self.find_by_participant(&participant.id).is_some() {
            return Err(CoreError::invalid("Already chatting with this person"));
        }
        let session = ChatSession {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ChatKind::Stranger,
            participant,
            messages: vec![],
            started_at: now,
            friend_request: FriendRequestStatus::None,
            unread_count: 0,
        };
        Ok(self.insert_active(session))
    }

    /// Opens (or re-selects) the chat with `friend`. Any open session with the same person
    /// is reused, including the stranger chat the friendship came from. Returns the session
    /// id and whether a new session was created.
    pub(crate) fn open_friend_session(
        &mut self,
        friend: &Friend,
        now: i64,
    ) -> CoreResult<(String, bool)> {
        if let Some(existing) = self.find_by_participant(friend.id()) {
            let existing = existing.id.clone();
            // Already active is fine here; the caller only cares that it is selected.
            let _ = self.switch_chat(&existing);
            return Ok((existing, false));
        }
        if self.is_full() {
            return Err(CoreError::invalid(format!(
                "You can have at most {} chats open",
                self.max_open
            )));
        }
        let session = ChatSession {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ChatKind::Friend,
            participant: friend.profile.clone(),
            messages: vec![],
            started_at: now,
            friend_request: FriendRequestStatus::Friends,
            unread_count: 0,
        };
        Ok((self.insert_active(session), true))
    }

    pub(crate) fn friend_session_for(&self, friend_id: &str) -> Option<&str> {
        self.sessions
            .iter()
            .find(|s| s.kind == ChatKind::Friend && s.participant.id == friend_id)
            .map(|s| s.id.as_str())
    }

    pub(crate) fn switch_chat(&mut self, session_id: &str) -> CoreResult<()> {
        if self.active.as_deref() == Some(session_id) {
            return Err(CoreError::Unchanged);
        }
        let session = self.get_mut(session_id)?;
        session.unread_count = 0;
        self.active = Some(session_id.to_string());
        Ok(())
    }

    fn validate_text(text: &str) -> CoreResult<&str> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::invalid("Message is empty"));
        }
        if text.chars().count() > MAX_MESSAGE_LEN {
            return Err(CoreError::invalid(format!(
                "Message is longer than {MAX_MESSAGE_LEN} characters"
            )));
        }
        Ok(text)
    }

    pub(crate) fn send_message(
        &mut self,
        session_id: &str,
        text: &str,
        now: i64,
    ) -> CoreResult<ChatMessage> {
        let text = Self::validate_text(text)?;
        self.append(session_id, MessageSender::Me, text, now)
    }

    pub(crate) fn receive_message(
        &mut self,
        session_id: &str,
        text: &str,
        now: i64,
    ) -> CoreResult<ChatMessage> {
        let text = Self::validate_text(text)?;
        let is_active = self.active.as_deref() == Some(session_id);
        let msg = self.append(session_id, MessageSender::Peer, text, now)?;
        if !is_active {
            let session = self.get_mut(session_id)?;
            session.unread_count = session.unread_count.saturating_add(1);
        }
        Ok(msg)
    }

    fn append(
        &mut self,
        session_id: &str,
        sender: MessageSender,
        text: &str,
        now: i64,
    ) -> CoreResult<ChatMessage> {
        let session = self.get_mut(session_id)?;
        let msg = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            text: text.to_string(),
            timestamp: now,
        };
        session.messages.push(msg.clone());
        Ok(msg)
    }

    /// Stranger chats ended by the local user go through the confirmation gate; friend chats
    /// and chats the stranger already left close right away.
    pub(crate) fn requires_confirmation(
        &self,
        session_id: &str,
        ended_by: EndedBy,
    ) -> CoreResult<bool> {
        let session = self.get(session_id)?;
        Ok(session.is_stranger() && ended_by == EndedBy::You)
    }

    /// The session `SkipStranger` applies to: the active one, which must be a stranger chat.
    pub(crate) fn skip_target(&self) -> CoreResult<&str> {
        let active = self
            .active
            .as_deref()
            .ok_or_else(|| CoreError::not_found("session", "<none active>"))?;
        let session = self.get(active)?;
        if !session.is_stranger() {
            return Err(CoreError::invalid("Only stranger chats can be skipped"));
        }
        Ok(&session.id)
    }

    /// Removes the session. If it was active, the most recently opened remaining session
    /// takes over the selection.
    pub(crate) fn remove(&mut self, session_id: &str) -> CoreResult<ChatSession> {
        let idx = self
            .sessions
            .iter()
            .position(|s| s.id == session_id)
            .ok_or_else(|| CoreError::not_found("session", session_id))?;
        let removed = self.sessions.remove(idx);
        if self.active.as_deref() == Some(session_id) {
            self.active = self.sessions.last().map(|s| s.id.clone());
            if let Some(next) = self.sessions.last_mut() {
                next.unread_count = 0;
            }
        }
        Ok(removed)
    }

    pub(crate) fn set_friend_request_status(
        &mut self,
        session_id: &str,
        status: FriendRequestStatus,
    ) -> CoreResult<()> {
        let session = self.get_mut(session_id)?;
        if session.friend_request == status {
            return Err(CoreError::Unchanged);
        }
        session.friend_request = status;
        Ok(())
    }

    /// Applies `status` to every open stranger session with `participant_id`. Returns how
    /// many sessions changed.
    pub(crate) fn set_participant_status(
        &mut self,
        participant_id: &str,
        status: FriendRequestStatus,
    ) -> usize {
        let mut changed = 0;
        for s in self
            .sessions
            .iter_mut()
            .filter(|s| s.is_stranger() && s.participant.id == participant_id)
        {
            if s.friend_request != status {
                s.friend_request = status;
                changed += 1;
            }
        }
        changed
    }
}
