//! Audio muting with snapshot-once restore.

use tracing::debug;

use aw_page::Page;

/// Pre-mute audio state, captured once per session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestoreSnapshot {
    pub volume: f64,
    pub muted: bool,
}

/// Mutes the main video for the duration of a session and restores the
/// user's audio state afterwards. Repeated applies within a session
/// never overwrite the snapshot.
#[derive(Debug, Default)]
pub struct MuteApplier {
    snapshot: Option<RestoreSnapshot>,
}

impl MuteApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mute the video. No-op outside an active session so a late-firing
    /// apply cannot strand the player muted.
    pub fn apply(&mut self, page: &mut Page, session_active: bool) {
        if !session_active {
            return;
        }
        let Some(video_id) = page.video() else {
            return;
        };
        let Some(media) = page.get_mut(video_id).and_then(|el| el.media.as_mut()) else {
            return;
        };
        if self.snapshot.is_none() {
            self.snapshot = Some(RestoreSnapshot {
                volume: media.volume,
                muted: media.muted,
            });
            debug!(volume = media.volume, muted = media.muted, "captured audio snapshot");
        }
        media.muted = true;
        media.volume = 0.0;
    }

    /// Restore the captured audio state. If the video is gone the
    /// snapshot is kept so a later restore can still succeed.
    pub fn restore(&mut self, page: &mut Page) {
        let Some(snapshot) = self.snapshot else {
            return;
        };
        let Some(video_id) = page.video() else {
            return;
        };
        let Some(media) = page.get_mut(video_id).and_then(|el| el.media.as_mut()) else {
            return;
        };
        media.volume = snapshot.volume;
        media.muted = snapshot.muted;
        self.snapshot = None;
        debug!(volume = snapshot.volume, muted = snapshot.muted, "restored audio state");
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }
}
