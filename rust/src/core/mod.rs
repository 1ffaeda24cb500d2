mod config;
mod confirm;
mod history;
mod relationships;
mod sessions;

use std::sync::{Arc, RwLock};

use flume::Sender;

use crate::actions::AppAction;
use crate::error::{CoreError, CoreResult};
use crate::matcher::{MatchRequest, SharedStrangerMatcher, SimulatedMatcher, StrangerMatcher};
use crate::state::{
    now_seconds, validate_wait_time, AppState, ChatHistory, EndedBy, FriendRequestStatus,
    MatchingStatus, PendingAction, ProfileSubject, Region, UserProfile,
};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};

use history::HistoryArchive;
use relationships::RelationshipStore;
use sessions::SessionRegistry;

pub(crate) use config::default_app_config_json;
pub use history::format_duration;

pub struct AppCore {
    pub state: AppState,
    rev: u64,

    update_sender: Sender<AppUpdate>,
    shared_state: Arc<RwLock<AppState>>,

    sessions: SessionRegistry,
    relationships: RelationshipStore,
    history: HistoryArchive,

    // Platform-provided matcher wins; the simulated one is a dev fallback.
    matcher: SharedStrangerMatcher,
    simulated_matcher: Option<Arc<SimulatedMatcher>>,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        matcher: SharedStrangerMatcher,
    ) -> Self {
        let config = config::load_app_config(&data_dir);
        let me = config.local_profile();
        let settings = config.matching_settings();
        tracing::info!(
            me = %me.id,
            region = settings.region.slug(),
            wait = %settings.wait_time_label(),
            simulate_matches = config.simulate_matches(),
            "core starting"
        );

        let simulated_matcher = config.simulate_matches().then(|| {
            Arc::new(SimulatedMatcher::new(
                core_sender,
                config.simulated_match_delay(),
            ))
        });

        let mut this = Self {
            state: AppState::new(me, settings),
            rev: 0,
            update_sender,
            shared_state,
            sessions: SessionRegistry::new(config.max_open_sessions()),
            relationships: RelationshipStore::default(),
            history: HistoryArchive::default(),
            matcher,
            simulated_matcher,
        };

        // Ensure FfiApp.state() has an immediately-available snapshot.
        this.rebuild_derived_state();
        let snapshot = this.state.clone();
        this.commit_state_snapshot(&snapshot);
        this
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.rebuild_derived_state();
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    fn emit_match_found(&mut self, session_id: String) {
        let rev = self.next_rev();
        // Keep snapshot rev in sync with the update stream even though this is a side-effect update.
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self
            .update_sender
            .send(AppUpdate::MatchFound { rev, session_id });
    }

    fn toast(&mut self, msg: impl Into<String>) {
        // Stays in state until the UI clears it.
        self.state.toast = Some(msg.into());
        self.emit_state();
    }

    /// Copies store contents into the published state. Everything the stores own is
    /// derived here so a snapshot can never mix old and new store data.
    fn rebuild_derived_state(&mut self) {
        self.state.sessions = self.sessions.sessions().to_vec();
        self.state.active_session_id = self.sessions.active_id().map(ToString::to_string);

        self.state.friends = self.relationships.friends().to_vec();
        let (online, offline) = self.relationships.partition();
        self.state.online_friends = online;
        self.state.offline_friends = offline;
        self.state.visible_friends = self.relationships.search(&self.state.friend_search);
        self.state.friend_requests = self.relationships.requests().to_vec();

        self.state.history = self.history.entries().to_vec();
        self.state.visible_history = self.history.search(&self.state.history_search);
        self.state.history_stats = self.history.stats();

        if let Some(open) = self.state.profile_dialog.as_ref() {
            let target = open.profile().id.clone();
            self.state.profile_dialog = self.resolve_profile(&target).ok();
        }
    }

    fn absorb(&mut self, op: &'static str, err: CoreError) {
        match err {
            CoreError::NotFound { kind, id } => {
                tracing::warn!(op, kind, id = %id, "not found; ignoring");
            }
            CoreError::Unchanged => {
                tracing::debug!(op, "no change");
            }
            CoreError::InvalidInput(msg) => {
                tracing::info!(op, reason = %msg, "rejected");
                self.toast(msg);
            }
            CoreError::ConfirmationRequired(action) => {
                tracing::info!(op, action = action.tag(), "awaiting confirmation");
                if let Some(prev) = self.state.confirmation.request(action) {
                    tracing::debug!(replaced = prev.tag(), "pending confirmation replaced");
                }
                self.emit_state();
            }
        }
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(action) => {
                // Never log `?action` directly: it carries message text.
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action);
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        let tag = action.tag();
        let now = now_seconds();
        let result = match action {
            // Sessions
            AppAction::SendMessage { session_id, text } => self
                .sessions
                .send_message(&session_id, &text, now)
                .map(|_| ()),
            AppAction::SwitchChat { session_id } => self.sessions.switch_chat(&session_id),
            AppAction::SkipStranger => self.skip_stranger(),
            AppAction::StopChat { session_id } => self.stop_chat(&session_id),
            AppAction::StartFriendChat { friend_id } => self.start_friend_chat(&friend_id, now),

            // Matching
            AppAction::FindStranger => self.find_stranger(),
            AppAction::CancelMatching => self.cancel_matching(),
            AppAction::UpdateWaitTime { wait_time_secs } => self.update_wait_time(wait_time_secs),
            AppAction::UpdateRegion { region } => self.update_region(region),

            // Relationships
            AppAction::SendFriendRequest { session_id } => self.send_friend_request(&session_id),
            AppAction::AcceptFriendRequest { request_id } => {
                self.accept_friend_request(&request_id)
            }
            AppAction::DeclineFriendRequest { request_id } => self
                .relationships
                .decline_friend_request(&request_id)
                .map(|_| ()),
            AppAction::Unfriend { friend_id } => self.unfriend(&friend_id),
            AppAction::SearchFriends { query } => set_query(&mut self.state.friend_search, query),

            // History
            AppAction::DeleteHistoryChat { history_id } => {
                self.history.delete_entry(&history_id).map(|_| ())
            }
            AppAction::ClearAllHistory => self.clear_all_history(),
            AppAction::SearchHistory { query } => {
                set_query(&mut self.state.history_search, query)
            }

            // Confirmation dialog
            AppAction::ConfirmPending => self.confirm_pending(),
            AppAction::CancelPending => {
                if self.state.confirmation.cancel() {
                    Ok(())
                } else {
                    Err(CoreError::Unchanged)
                }
            }

            // UI
            AppAction::OpenProfile { target_id } => self.open_profile(&target_id),
            AppAction::CloseProfile => match self.state.profile_dialog.take() {
                Some(_) => Ok(()),
                None => Err(CoreError::Unchanged),
            },
            AppAction::ClearToast => match self.state.toast.take() {
                Some(_) => Ok(()),
                None => Err(CoreError::Unchanged),
            },
        };
        match result {
            Ok(()) => self.emit_state(),
            Err(e) => self.absorb(tag, e),
        }
    }

    fn handle_internal(&mut self, event: InternalEvent) {
        let tag = event.tag();
        tracing::debug!(event = tag, "internal");
        let now = now_seconds();
        let result = match event {
            InternalEvent::StrangerMatched { profile } => match self.stranger_matched(profile, now)
            {
                Ok(session_id) => {
                    self.emit_state();
                    self.emit_match_found(session_id);
                    return;
                }
                Err(e) => Err(e),
            },
            InternalEvent::MatchTimedOut => self.match_timed_out(),
            InternalEvent::MessageReceived { session_id, text } => self
                .sessions
                .receive_message(&session_id, &text, now)
                .map(|_| ())
                .map_err(quiet_remote_input),
            InternalEvent::StrangerLeft { session_id } => {
                self.close_session(&session_id, EndedBy::Stranger)
            }
            InternalEvent::FriendRequestReceived { request } => {
                self.relationships.receive_friend_request(request)
            }
            InternalEvent::FriendRequestAccepted { participant_id } => {
                self.friend_request_accepted(&participant_id)
            }
            InternalEvent::FriendPresenceChanged {
                friend_id,
                is_online,
            } => self.relationships.set_presence(&friend_id, is_online, now),
        };
        match result {
            Ok(()) => self.emit_state(),
            Err(e) => self.absorb(tag, e),
        }
    }

    // Sessions

    fn stop_chat(&mut self, session_id: &str) -> CoreResult<()> {
        if self.sessions.requires_confirmation(session_id, EndedBy::You)? {
            return Err(CoreError::ConfirmationRequired(PendingAction::StopChat {
                session_id: session_id.to_string(),
            }));
        }
        self.close_session(session_id, EndedBy::You)
    }

    fn skip_stranger(&mut self) -> CoreResult<()> {
        let session_id = self.sessions.skip_target()?.to_string();
        Err(CoreError::ConfirmationRequired(
            PendingAction::SkipStranger { session_id },
        ))
    }

    /// Removes the session and archives it. Exactly one history entry per closed session.
    fn close_session(&mut self, session_id: &str, ended_by: EndedBy) -> CoreResult<()> {
        let session = self.sessions.remove(session_id)?;
        let entry = self.history.archive(&session, ended_by, now_seconds());
        if self.state.confirmation.discard_for_session(session_id) {
            tracing::debug!(session_id, "dropped stale confirmation");
        }
        tracing::info!(
            session_id,
            ended_by = ?ended_by,
            messages = entry.message_count,
            duration_secs = entry.duration_secs,
            became_friend = entry.became_friend,
            open = self.sessions.len(),
            "session archived"
        );
        Ok(())
    }

    fn start_friend_chat(&mut self, friend_id: &str, now: i64) -> CoreResult<()> {
        let friend = self.relationships.friend(friend_id)?.clone();
        let active_before = self.sessions.active_id().map(ToString::to_string);
        let (session_id, created) = self.sessions.open_friend_session(&friend, now)?;
        if !created && active_before.as_deref() == Some(session_id.as_str()) {
            return Err(CoreError::Unchanged);
        }
        tracing::info!(friend_id, session_id = %session_id, created, "friend chat");
        Ok(())
    }

    // Matching

    fn active_matcher(&self) -> Option<Arc<dyn StrangerMatcher>> {
        let external = match self.matcher.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        };
        external.or_else(|| {
            self.simulated_matcher
                .clone()
                .map(|m| m as Arc<dyn StrangerMatcher>)
        })
    }

    fn find_stranger(&mut self) -> CoreResult<()> {
        if self.state.matching.is_searching() {
            return Err(CoreError::Unchanged);
        }
        self.request_match()
    }

    fn request_match(&mut self) -> CoreResult<()> {
        let Some(matcher) = self.active_matcher() else {
            tracing::warn!("no stranger matcher registered");
            return Err(CoreError::invalid("Matching is unavailable right now"));
        };
        if self.sessions.is_full() {
            return Err(CoreError::invalid(
                "Close a chat before looking for someone new",
            ));
        }
        let settings = self.state.settings.clone();
        self.state.matching = MatchingStatus::Searching {
            started_at: now_seconds(),
            region: settings.region,
            wait_time_secs: settings.wait_time_secs,
        };
        tracing::info!(
            region = settings.region.slug(),
            wait = %settings.wait_time_label(),
            "match requested"
        );
        matcher.request_match(MatchRequest {
            region: settings.region,
            wait_time_secs: settings.wait_time_secs,
            exclude_ids: self.sessions.participant_ids(),
        });
        Ok(())
    }

    fn cancel_matching(&mut self) -> CoreResult<()> {
        if !self.state.matching.is_searching() {
            return Err(CoreError::Unchanged);
        }
        self.state.matching = MatchingStatus::Idle;
        if let Some(matcher) = self.active_matcher() {
            matcher.cancel_match();
        }
        Ok(())
    }

    fn stranger_matched(&mut self, profile: UserProfile, now: i64) -> CoreResult<String> {
        if !self.state.matching.is_searching() {
            tracing::info!(stranger = %profile.id, "match arrived after cancel; dropping");
            return Err(CoreError::Unchanged);
        }
        self.state.matching = MatchingStatus::Idle;
        let session_id = self.sessions.open_stranger_session(profile, now)?;
        tracing::info!(session_id = %session_id, "stranger matched");
        Ok(session_id)
    }

    fn match_timed_out(&mut self) -> CoreResult<()> {
        let MatchingStatus::Searching { wait_time_secs, .. } = self.state.matching else {
            return Err(CoreError::Unchanged);
        };
        self.state.matching = MatchingStatus::Idle;
        self.state.toast = Some(match wait_time_secs {
            Some(secs) => format!("No one found within {secs} seconds"),
            None => "No one found".to_string(),
        });
        Ok(())
    }

    fn update_wait_time(&mut self, wait_time_secs: Option<u32>) -> CoreResult<()> {
        let wait_time_secs = validate_wait_time(wait_time_secs)?;
        if self.state.settings.wait_time_secs == wait_time_secs {
            return Err(CoreError::Unchanged);
        }
        self.state.settings.wait_time_secs = wait_time_secs;
        tracing::info!(wait = %self.state.settings.wait_time_label(), "wait time updated");
        Ok(())
    }

    fn update_region(&mut self, region: Region) -> CoreResult<()> {
        if self.state.settings.region == region {
            return Err(CoreError::Unchanged);
        }
        self.state.settings.region = region;
        tracing::info!(region = region.slug(), "region updated");
        Ok(())
    }

    // Relationships

    fn send_friend_request(&mut self, session_id: &str) -> CoreResult<()> {
        let session = self.sessions.get(session_id)?;
        if !session.is_stranger() {
            return Err(CoreError::invalid("You are already friends"));
        }
        let participant_id = session.participant.id.clone();
        self.relationships.send_friend_request(&participant_id)?;
        self.sessions
            .set_friend_request_status(session_id, FriendRequestStatus::Sent)
    }

    fn accept_friend_request(&mut self, request_id: &str) -> CoreResult<()> {
        let friend = self.relationships.accept_friend_request(request_id)?;
        let marked = self
            .sessions
            .set_participant_status(friend.id(), FriendRequestStatus::Friends);
        tracing::info!(friend_id = friend.id(), sessions = marked, "friend request accepted");
        Ok(())
    }

    fn friend_request_accepted(&mut self, participant_id: &str) -> CoreResult<()> {
        if !self.relationships.has_outgoing(participant_id) {
            return Err(CoreError::not_found(
                "outgoing friend request",
                participant_id,
            ));
        }
        let profile = match self.sessions.find_by_participant(participant_id) {
            Some(session) => session.participant.clone(),
            // Chat already over: rebuild what we know from its history entry.
            None => self
                .history
                .entries()
                .iter()
                .rev()
                .find(|e| e.stranger_id == participant_id)
                .map(profile_from_history)
                .ok_or_else(|| CoreError::not_found("participant", participant_id))?,
        };
        let friend = self.relationships.outgoing_accepted(profile)?;
        self.sessions
            .set_participant_status(friend.id(), FriendRequestStatus::Friends);
        tracing::info!(friend_id = friend.id(), "outgoing friend request accepted");
        Ok(())
    }

    fn unfriend(&mut self, friend_id: &str) -> CoreResult<()> {
        self.relationships.friend(friend_id)?;
        Err(CoreError::ConfirmationRequired(PendingAction::Unfriend {
            friend_id: friend_id.to_string(),
        }))
    }

    fn commit_unfriend(&mut self, friend_id: &str) -> CoreResult<()> {
        let friend = self.relationships.unfriend(friend_id)?;
        if let Some(session_id) = self
            .sessions
            .friend_session_for(friend_id)
            .map(ToString::to_string)
        {
            self.close_session(&session_id, EndedBy::You)?;
        }
        self.sessions
            .set_participant_status(friend_id, FriendRequestStatus::None);
        tracing::info!(friend_id = friend.id(), "unfriended");
        Ok(())
    }

    // History

    fn clear_all_history(&mut self) -> CoreResult<()> {
        if self.history.is_empty() {
            return Err(CoreError::Unchanged);
        }
        Err(CoreError::ConfirmationRequired(PendingAction::ClearHistory))
    }

    // Confirmation

    fn confirm_pending(&mut self) -> CoreResult<()> {
        let action = self.state.confirmation.take().ok_or(CoreError::Unchanged)?;
        let tag = action.tag();
        tracing::info!(action = tag, "confirmed");
        let result = match action {
            PendingAction::StopChat { session_id } => {
                self.close_session(&session_id, EndedBy::You)
            }
            PendingAction::SkipStranger { session_id } => self
                .close_session(&session_id, EndedBy::You)
                .and_then(|()| self.request_match()),
            PendingAction::Unfriend { friend_id } => self.commit_unfriend(&friend_id),
            PendingAction::ClearHistory => {
                let cleared = self.history.clear_all();
                tracing::info!(cleared, "history cleared");
                Ok(())
            }
        };
        // The dialog is gone either way, so the caller always publishes.
        if let Err(e) = result {
            self.absorb(tag, e);
        }
        Ok(())
    }

    // Profile dialog

    fn resolve_profile(&self, target_id: &str) -> CoreResult<ProfileSubject> {
        if self.state.me.id == target_id {
            return Ok(ProfileSubject::Myself {
                profile: self.state.me.clone(),
            });
        }
        if let Ok(friend) = self.relationships.friend(target_id) {
            return Ok(ProfileSubject::Friend {
                friend: friend.clone(),
            });
        }
        self.sessions
            .find_by_participant(target_id)
            .map(|s| ProfileSubject::Stranger {
                profile: s.participant.clone(),
            })
            .ok_or_else(|| CoreError::not_found("profile", target_id))
    }

    fn open_profile(&mut self, target_id: &str) -> CoreResult<()> {
        let subject = self.resolve_profile(target_id)?;
        if self.state.profile_dialog.as_ref() == Some(&subject) {
            return Err(CoreError::Unchanged);
        }
        self.state.profile_dialog = Some(subject);
        Ok(())
    }
}

fn set_query(slot: &mut String, query: String) -> CoreResult<()> {
    if *slot == query {
        return Err(CoreError::Unchanged);
    }
    *slot = query;
    Ok(())
}

// Bad input from the transport is the peer's problem, not something to toast about.
fn quiet_remote_input(err: CoreError) -> CoreError {
    match err {
        CoreError::InvalidInput(reason) => {
            tracing::warn!(%reason, "dropping remote message");
            CoreError::Unchanged
        }
        other => other,
    }
}

fn profile_from_history(entry: &ChatHistory) -> UserProfile {
    UserProfile {
        id: entry.stranger_id.clone(),
        name: entry.stranger_name.clone(),
        avatar: entry.stranger_avatar.clone(),
        avatar_color: entry.stranger_avatar_color.clone(),
        bio: String::new(),
        region: entry.stranger_region,
        gender: entry.stranger_gender,
        joined_date: 0,
    }
}
