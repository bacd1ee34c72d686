//! Watcher settings mirror.

use serde::{Deserialize, Serialize};

use crate::keys;

/// The three behavior toggles owned by the configuration store.
///
/// The watcher holds a read-only mirror of these and refreshes it from
/// change notifications; it never writes them itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherSettings {
    /// Master switch for the watcher.
    pub enabled: bool,
    /// Mute ad audio while an ad session is active.
    pub mute_ad_sound: bool,
    /// Blur ad visuals while an ad session is active.
    pub blur_ads: bool,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            enabled: keys::DEFAULT_WATCHER_ENABLED,
            mute_ad_sound: keys::DEFAULT_MUTE_AD_SOUND,
            blur_ads: keys::DEFAULT_BLUR_ADS,
        }
    }
}
