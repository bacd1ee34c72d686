//! Confidence classifier.
//!
//! No single page-structure signal is trustworthy: state markers persist
//! stale, overlays get reused by non-ad UI. Each pass recomputes a
//! weighted sum over independent signals from scratch and gates the
//! verdict on convergence of at least two medium-confidence signals.
//! Inspection failures contribute zero; classification never raises.

use serde::Serialize;
use tracing::{debug, trace};

use aw_page::pattern::{
    self, AD_INDICATOR_PATTERNS, AD_LABEL_PATTERN, AD_MARKER_PATTERNS, SKIP_CONTROL_PATTERNS,
};
use aw_page::{Page, PageError};

/// Minimum accumulated score for an ad-active verdict.
pub const SCORE_THRESHOLD: u32 = 4;

/// Sum of all signal weights.
pub const MAX_SCORE: u32 = 13;

/// The independent detection signals, in inspection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Player container carries the ad-state marker class.
    PlayerAdMarker,
    /// A dismissal-control candidate is visible.
    SkipControlVisible,
    /// An ad-overlay indicator is visible.
    AdOverlayVisible,
    /// The ad label is visible with non-empty text.
    AdLabelVisible,
    /// Ad markers are present in the timeline/scrubber.
    TimelineAdMarkers,
    /// Player container carries the content-interrupted marker class.
    PlayerInterrupting,
}

impl Signal {
    pub const ALL: [Signal; 6] = [
        Signal::PlayerAdMarker,
        Signal::SkipControlVisible,
        Signal::AdOverlayVisible,
        Signal::AdLabelVisible,
        Signal::TimelineAdMarkers,
        Signal::PlayerInterrupting,
    ];

    /// Fixed point value this signal contributes when present.
    pub const fn weight(self) -> u32 {
        match self {
            Signal::PlayerAdMarker => 3,
            Signal::SkipControlVisible => 2,
            Signal::AdOverlayVisible => 2,
            Signal::AdLabelVisible => 1,
            Signal::TimelineAdMarkers => 3,
            Signal::PlayerInterrupting => 2,
        }
    }
}

/// Result of one classification pass.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub score: u32,
    pub contributing: Vec<Signal>,
}

impl Classification {
    /// Ad-active verdict: true iff the score reaches the threshold.
    pub fn verdict(&self) -> bool {
        self.score >= SCORE_THRESHOLD
    }
}

/// Run one classification pass over the current page snapshot.
pub fn classify(page: &Page) -> Classification {
    let mut score = 0;
    let mut contributing = Vec::new();
    for signal in Signal::ALL {
        match probe(page, signal) {
            Ok(true) => {
                score += signal.weight();
                contributing.push(signal);
            }
            Ok(false) => {}
            Err(err) => {
                // Degrade silently to the best available score.
                debug!(?signal, error = %err, "signal inspection failed, contributes zero");
            }
        }
    }
    trace!(score, threshold = SCORE_THRESHOLD, "classification pass");
    Classification {
        score,
        contributing,
    }
}

fn probe(page: &Page, signal: Signal) -> Result<bool, PageError> {
    match signal {
        Signal::PlayerAdMarker => Ok(player_has_class(page, pattern::PLAYER_AD_CLASS)),
        Signal::SkipControlVisible => Ok(page
            .query_any(SKIP_CONTROL_PATTERNS)
            .into_iter()
            .any(|id| page.is_visible(id))),
        Signal::AdOverlayVisible => Ok(page
            .query_any(AD_INDICATOR_PATTERNS)
            .into_iter()
            .any(|id| page.is_visible(id))),
        Signal::AdLabelVisible => {
            for id in page.query(&AD_LABEL_PATTERN) {
                if !page.is_visible(id) {
                    continue;
                }
                let el = page.get(id).ok_or(PageError::NotFound(id))?;
                if !el.text.trim().is_empty() {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        // Presence suffices here; timeline markers are tiny and often
        // rendered with zero area while still meaningful.
        Signal::TimelineAdMarkers => Ok(!page.query_any(AD_MARKER_PATTERNS).is_empty()),
        Signal::PlayerInterrupting => {
            Ok(player_has_class(page, pattern::PLAYER_INTERRUPTING_CLASS))
        }
    }
}

fn player_has_class(page: &Page, class: &str) -> bool {
    page.player()
        .and_then(|id| page.get(id))
        .map(|el| el.has_class(class))
        .unwrap_or(false)
}
