//! Persisted field names and their first-run defaults.
//!
//! The store is a flat key/value namespace shared with the settings
//! surface; every key here is lazily initialized by the coordinator if
//! absent.

/// Whether the watcher is enabled at all.
pub const WATCHER_ENABLED: &str = "watcherEnabled";

/// Whether ad audio is muted while an ad session is active.
pub const MUTE_AD_SOUND: &str = "muteAdSound";

/// Whether ad visuals are blurred while an ad session is active.
pub const BLUR_ADS: &str = "blurAds";

/// Running tally of successfully dismissed ads.
pub const ADS_SKIPPED: &str = "adsSkipped";

/// Default for [`WATCHER_ENABLED`].
pub const DEFAULT_WATCHER_ENABLED: bool = false;

/// Default for [`MUTE_AD_SOUND`].
pub const DEFAULT_MUTE_AD_SOUND: bool = true;

/// Default for [`BLUR_ADS`].
pub const DEFAULT_BLUR_ADS: bool = false;

/// Default for [`ADS_SKIPPED`].
pub const DEFAULT_ADS_SKIPPED: i64 = 0;
