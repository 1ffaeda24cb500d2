use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::state::{
    now_seconds, validate_wait_time, MatchingSettings, Region, UserProfile, DEFAULT_WAIT_TIME_SECS,
};

use super::sessions::DEFAULT_MAX_OPEN_SESSIONS;

pub(crate) const CONFIG_FILE_NAME: &str = "whispa_config.json";

const DEFAULT_DISPLAY_NAME: &str = "Anonymous";
const DEFAULT_AVATAR: &str = "👤";
const DEFAULT_AVATAR_COLOR: &str = "from-slate-400 to-slate-600";
const DEFAULT_SIMULATED_MATCH_DELAY_MS: u64 = 1500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) display_name: Option<String>,
    pub(crate) avatar: Option<String>,
    pub(crate) avatar_color: Option<String>,
    pub(crate) bio: Option<String>,
    /// Slug or label; unknown values fall back to worldwide.
    pub(crate) default_region: Option<String>,
    pub(crate) default_wait_time_secs: Option<u32>,
    /// Overrides `default_wait_time_secs` with "Forever".
    pub(crate) wait_forever: Option<bool>,
    pub(crate) max_open_sessions: Option<u32>,
    // Dev/demo: resolve matches locally with synthetic strangers.
    pub(crate) simulate_matches: Option<bool>,
    pub(crate) simulated_match_delay_ms: Option<u64>,
}

fn read_app_config(path: &Path) -> anyhow::Result<AppConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice::<AppConfig>(&bytes)
        .with_context(|| format!("parse {}", path.display()))
}

pub(crate) fn load_app_config(data_dir: &str) -> AppConfig {
    let path = Path::new(data_dir).join(CONFIG_FILE_NAME);
    if !path.exists() {
        return AppConfig::default();
    }
    match read_app_config(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(err = %format!("{e:#}"), "config unreadable, using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn default_app_config_json() -> String {
    let config = AppConfig {
        display_name: Some(DEFAULT_DISPLAY_NAME.to_string()),
        avatar: Some(DEFAULT_AVATAR.to_string()),
        avatar_color: Some(DEFAULT_AVATAR_COLOR.to_string()),
        bio: Some(String::new()),
        default_region: Some(Region::Worldwide.slug().to_string()),
        default_wait_time_secs: DEFAULT_WAIT_TIME_SECS,
        wait_forever: Some(false),
        max_open_sessions: Some(DEFAULT_MAX_OPEN_SESSIONS as u32),
        simulate_matches: Some(false),
        simulated_match_delay_ms: Some(DEFAULT_SIMULATED_MATCH_DELAY_MS),
    };
    serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string())
}

impl AppConfig {
    pub(crate) fn region(&self) -> Region {
        let Some(raw) = self.default_region.as_deref() else {
            return Region::Worldwide;
        };
        raw.parse().unwrap_or_else(|e| {
            tracing::warn!(%e, "bad default_region in config");
            Region::Worldwide
        })
    }

    pub(crate) fn matching_settings(&self) -> MatchingSettings {
        let wait_time_secs = if self.wait_forever == Some(true) {
            None
        } else {
            match self.default_wait_time_secs {
                Some(secs) => validate_wait_time(Some(secs)).unwrap_or_else(|e| {
                    tracing::warn!(%e, "bad default_wait_time_secs in config");
                    DEFAULT_WAIT_TIME_SECS
                }),
                None => DEFAULT_WAIT_TIME_SECS,
            }
        };
        MatchingSettings {
            region: self.region(),
            wait_time_secs,
        }
    }

    pub(crate) fn max_open_sessions(&self) -> usize {
        self.max_open_sessions
            .map(|n| n.max(1) as usize)
            .unwrap_or(DEFAULT_MAX_OPEN_SESSIONS)
    }

    pub(crate) fn simulate_matches(&self) -> bool {
        if let Some(enabled) = self.simulate_matches {
            return enabled;
        }
        std::env::var("WHISPA_SIMULATE_MATCHES").ok().as_deref() == Some("1")
    }

    pub(crate) fn simulated_match_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(
            self.simulated_match_delay_ms
                .unwrap_or(DEFAULT_SIMULATED_MATCH_DELAY_MS),
        )
    }

    /// Profile for the local anonymous user. Fresh id on every start.
    pub(crate) fn local_profile(&self) -> UserProfile {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
        };
        UserProfile {
            id: uuid::Uuid::new_v4().to_string(),
            name: non_empty(&self.display_name).unwrap_or_else(|| DEFAULT_DISPLAY_NAME.into()),
            avatar: non_empty(&self.avatar).unwrap_or_else(|| DEFAULT_AVATAR.into()),
            avatar_color: non_empty(&self.avatar_color)
                .unwrap_or_else(|| DEFAULT_AVATAR_COLOR.into()),
            bio: self.bio.clone().unwrap_or_default(),
            region: self.region(),
            gender: None,
            joined_date: now_seconds(),
        }
    }
}
