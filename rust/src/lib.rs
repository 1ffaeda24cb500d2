mod actions;
mod core;
mod error;
mod logging;
mod matcher;
mod state;
mod updates;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use flume::{Receiver, Sender};

pub use actions::AppAction;
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use matcher::{MatchRequest, SharedStrangerMatcher, StrangerMatcher};
pub use state::*;
pub use updates::*;

/// Return the default `whispa_config.json` payload used when no config file exists.
pub fn default_config_json() -> String {
    core::default_app_config_json()
}

#[uniffi::export]
pub fn wait_time_choices() -> Vec<Option<u32>> {
    WAIT_TIME_CHOICES.to_vec()
}

#[uniffi::export]
pub fn region_label(region: Region) -> String {
    region.label().to_string()
}

/// Accepts slugs (`north-america`) and labels (`North America`), case-insensitively.
#[uniffi::export]
pub fn parse_region(input: String) -> Option<Region> {
    input.parse().ok()
}

#[uniffi::export]
pub fn format_chat_duration(secs: u64) -> String {
    core::format_duration(secs)
}

#[uniffi::export]
pub fn profile_joined_label(profile: UserProfile) -> String {
    profile.joined_label()
}

uniffi::setup_scaffolding!();

#[uniffi::export(callback_interface)]
pub trait AppReconciler: Send + Sync + 'static {
    fn reconcile(&self, update: AppUpdate);
}

#[derive(uniffi::Object)]
pub struct FfiApp {
    core_tx: Sender<CoreMsg>,
    update_rx: Receiver<AppUpdate>,
    listening: AtomicBool,
    shared_state: Arc<RwLock<AppState>>,
    stranger_matcher: SharedStrangerMatcher,
}

#[uniffi::export]
impl FfiApp {
    #[uniffi::constructor]
    pub fn new(data_dir: String) -> Arc<Self> {
        logging::init_logging(&data_dir);
        tracing::info!(data_dir = %data_dir, "FfiApp::new() starting");

        let (update_tx, update_rx) = flume::unbounded();
        let (core_tx, core_rx) = flume::unbounded::<CoreMsg>();
        let shared_state = Arc::new(RwLock::new(AppState::empty()));
        let stranger_matcher: SharedStrangerMatcher = Arc::new(RwLock::new(None));

        // Actor loop thread (single threaded "app actor").
        let core_tx_for_core = core_tx.clone();
        let shared_for_core = shared_state.clone();
        let matcher_for_core = stranger_matcher.clone();
        thread::spawn(move || {
            let mut core = crate::core::AppCore::new(
                update_tx,
                core_tx_for_core,
                data_dir,
                shared_for_core,
                matcher_for_core,
            );
            while let Ok(msg) = core_rx.recv() {
                core.handle_message(msg);
            }
        });

        Arc::new(Self {
            core_tx,
            update_rx,
            listening: AtomicBool::new(false),
            shared_state,
            stranger_matcher,
        })
    }

    pub fn state(&self) -> AppState {
        match self.shared_state.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn dispatch(&self, action: AppAction) {
        // Contract: never block caller.
        let _ = self.core_tx.send(CoreMsg::Action(action));
    }

    pub fn listen_for_updates(&self, reconciler: Box<dyn AppReconciler>) {
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Avoid multiple listeners that would split messages.
            return;
        }

        let rx = self.update_rx.clone();
        thread::spawn(move || {
            while let Ok(update) = rx.recv() {
                reconciler.reconcile(update);
            }
        });
    }

    /// Replaces the built-in simulated matcher, if any.
    pub fn set_stranger_matcher(&self, matcher: Box<dyn StrangerMatcher>) {
        let matcher: Arc<dyn StrangerMatcher> = Arc::from(matcher);
        match self.stranger_matcher.write() {
            Ok(mut slot) => {
                *slot = Some(matcher);
            }
            Err(poison) => {
                *poison.into_inner() = Some(matcher);
            }
        }
    }

    // Transport and matcher callbacks. All of them go through the actor queue.

    pub fn stranger_matched(&self, profile: UserProfile) {
        self.send_internal(InternalEvent::StrangerMatched { profile });
    }

    pub fn match_timed_out(&self) {
        self.send_internal(InternalEvent::MatchTimedOut);
    }

    pub fn message_received(&self, session_id: String, text: String) {
        self.send_internal(InternalEvent::MessageReceived { session_id, text });
    }

    pub fn stranger_left(&self, session_id: String) {
        self.send_internal(InternalEvent::StrangerLeft { session_id });
    }

    pub fn friend_request_received(&self, request: FriendRequest) {
        self.send_internal(InternalEvent::FriendRequestReceived { request });
    }

    pub fn friend_request_accepted(&self, participant_id: String) {
        self.send_internal(InternalEvent::FriendRequestAccepted { participant_id });
    }

    pub fn friend_presence_changed(&self, friend_id: String, is_online: bool) {
        self.send_internal(InternalEvent::FriendPresenceChanged {
            friend_id,
            is_online,
        });
    }
}

impl FfiApp {
    fn send_internal(&self, event: InternalEvent) {
        let _ = self.core_tx.send(CoreMsg::Internal(Box::new(event)));
    }
}
