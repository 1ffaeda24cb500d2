use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use flume::Sender;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::state::{now_seconds, Gender, Region, UserProfile};
use crate::updates::{CoreMsg, InternalEvent};

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct MatchRequest {
    pub region: Region,
    /// `None` keeps searching until cancelled.
    pub wait_time_secs: Option<u32>,
    /// Participants we are already talking to.
    pub exclude_ids: Vec<String>,
}

/// Stranger matching lives outside the core. Implementations report back through
/// `FfiApp::stranger_matched` / `FfiApp::match_timed_out`.
#[uniffi::export(callback_interface)]
pub trait StrangerMatcher: Send + Sync + 'static {
    fn request_match(&self, request: MatchRequest);
    fn cancel_match(&self);
}

pub type SharedStrangerMatcher = Arc<RwLock<Option<Arc<dyn StrangerMatcher>>>>;

const NAMES: &[&str] = &[
    "Nova", "Kai", "Luna", "Milo", "Iris", "Ezra", "Juno", "Remy", "Sage", "Theo", "Wren", "Zane",
];
const AVATARS: &[&str] = &["🦊", "🐼", "🦉", "🐙", "🐨", "🦄", "🐯", "🐸", "🐧", "🦋"];
const AVATAR_COLORS: &[&str] = &[
    "from-violet-500 to-fuchsia-500",
    "from-sky-400 to-indigo-500",
    "from-emerald-400 to-teal-500",
    "from-amber-400 to-orange-500",
    "from-rose-400 to-pink-500",
];
const BIOS: &[&str] = &[
    "Just here to talk",
    "Night owl, coffee addict",
    "Ask me about music",
    "Learning languages one chat at a time",
    "",
];

/// Demo matcher: every request resolves with a synthetic stranger after a fixed delay.
pub(crate) struct SimulatedMatcher {
    core_tx: Sender<CoreMsg>,
    delay: Duration,
    // Bumped on every request and cancel; a sleeping thread only reports if it still owns
    // the latest generation.
    generation: Arc<AtomicU64>,
}

impl SimulatedMatcher {
    pub(crate) fn new(core_tx: Sender<CoreMsg>, delay: Duration) -> Self {
        Self {
            core_tx,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl StrangerMatcher for SimulatedMatcher {
    fn request_match(&self, request: MatchRequest) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.generation.clone();
        let tx = self.core_tx.clone();
        let delay = self.delay;
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            if current.load(Ordering::SeqCst) != generation {
                tracing::debug!(generation, "simulated match superseded");
                return;
            }
            let profile = random_stranger(request.region);
            tracing::debug!(stranger = %profile.id, region = profile.region.slug(), "simulated match");
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::StrangerMatched {
                profile,
            })));
        });
    }

    fn cancel_match(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Synthetic stranger with a fresh id, so it never collides with an open session.
pub(crate) fn random_stranger(region: Region) -> UserProfile {
    let mut rng = rand::thread_rng();
    let id = uuid::Uuid::new_v4().to_string();
    let region = match region {
        Region::Worldwide => *Region::ALL[1..]
            .choose(&mut rng)
            .unwrap_or(&Region::Europe),
        other => other,
    };
    let gender = [Some(Gender::Male), Some(Gender::Female), Some(Gender::Other), None]
        .choose(&mut rng)
        .copied()
        .flatten();
    // Joined sometime in the last year.
    let joined_date = now_seconds() - rng.gen_range(0..365 * 24 * 3600);
    UserProfile {
        id,
        name: NAMES.choose(&mut rng).copied().unwrap_or("Stranger").to_string(),
        avatar: AVATARS.choose(&mut rng).copied().unwrap_or("👤").to_string(),
        avatar_color: AVATAR_COLORS
            .choose(&mut rng)
            .copied()
            .unwrap_or(AVATAR_COLORS[0])
            .to_string(),
        bio: BIOS.choose(&mut rng).copied().unwrap_or_default().to_string(),
        region,
        gender,
        joined_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_stranger_respects_region_filter() {
        for _ in 0..20 {
            assert_eq!(random_stranger(Region::Africa).region, Region::Africa);
            assert_ne!(random_stranger(Region::Worldwide).region, Region::Worldwide);
        }
    }

    #[test]
    fn simulated_matcher_reports_through_the_core_queue() {
        let (tx, rx) = flume::unbounded();
        let matcher = SimulatedMatcher::new(tx, Duration::from_millis(0));
        matcher.request_match(MatchRequest {
            region: Region::Oceania,
            wait_time_secs: Some(15),
            exclude_ids: vec![],
        });
        let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        match msg {
            CoreMsg::Internal(ev) => match *ev {
                InternalEvent::StrangerMatched { profile } => {
                    assert_eq!(profile.region, Region::Oceania)
                }
                other => panic!("unexpected event: {other:?}"),
            },
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn cancelled_simulated_match_is_dropped() {
        let (tx, rx) = flume::unbounded();
        let matcher = SimulatedMatcher::new(tx, Duration::from_millis(100));
        matcher.request_match(MatchRequest {
            region: Region::Worldwide,
            wait_time_secs: None,
            exclude_ids: vec![],
        });
        matcher.cancel_match();
        assert!(rx.recv_timeout(Duration::from_millis(400)).is_err());
    }
}
