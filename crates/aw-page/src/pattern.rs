//! Fixed structural match patterns.
//!
//! The lists are ordered (order sets scan priority) but not
//! user-configurable. Correctness never depends on order because every
//! consumer deduplicates candidates before use.

use crate::element::PageElement;

/// A single structural match rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Exact class token.
    Class(&'static str),
    /// Any class token containing the fragment (case-insensitive).
    ClassContains(&'static str),
    /// aria-label containing the fragment (case-insensitive).
    AriaLabelContains(&'static str),
    /// Element tag name.
    Tag(&'static str),
    /// Tag name with an exact class token.
    TagClass(&'static str, &'static str),
    /// Page-unique element id attribute.
    DomId(&'static str),
}

impl Pattern {
    pub fn matches(&self, el: &PageElement) -> bool {
        match self {
            Pattern::Class(class) => el.has_class(class),
            Pattern::ClassContains(fragment) => el.class_contains(fragment),
            Pattern::AriaLabelContains(fragment) => el
                .aria_label
                .as_deref()
                .map(|l| l.to_ascii_lowercase().contains(&fragment.to_ascii_lowercase()))
                .unwrap_or(false),
            Pattern::Tag(tag) => el.tag == *tag,
            Pattern::TagClass(tag, class) => el.tag == *tag && el.has_class(class),
            Pattern::DomId(dom_id) => el.dom_id.as_deref() == Some(*dom_id),
        }
    }
}

/// Candidate dismissal controls, highest-priority pattern first.
pub const SKIP_CONTROL_PATTERNS: &[Pattern] = &[
    Pattern::Class("ytp-skip-ad-button"),
    Pattern::Class("ytp-ad-skip-button"),
    Pattern::Class("ytp-ad-skip-button-modern"),
    Pattern::TagClass("button", "ytp-ad-skip-button-slot"),
    Pattern::ClassContains("skip"),
    Pattern::AriaLabelContains("skip"),
];

/// Ad-overlay indicators consumed by the classifier.
pub const AD_INDICATOR_PATTERNS: &[Pattern] = &[
    Pattern::Class("ytp-ad-player-overlay"),
    Pattern::Class("ytp-ad-module"),
    Pattern::Class("video-ads"),
    Pattern::Class("ytp-ad-text"),
    Pattern::Class("ytp-ad-preview-container"),
];

/// Overlays eligible for blurring (skip-control regions are excluded at
/// apply time, not here).
pub const AD_OVERLAY_PATTERNS: &[Pattern] = &[
    Pattern::Class("video-ads"),
    Pattern::Class("ytp-ad-image-overlay"),
    Pattern::Tag("ytd-display-ad-renderer"),
    Pattern::Tag("ytd-promoted-sparkles-web-renderer"),
];

/// Regions that must stay sharp and clickable during blur.
pub const SKIP_CONTAINER_PATTERNS: &[Pattern] = &[
    Pattern::Class("ytp-ad-skip-button-container"),
    Pattern::Class("ytp-ad-skip-button-slot"),
    Pattern::Class("ytp-ad-skip-button-modern"),
];

/// Timeline/scrubber ad markers.
pub const AD_MARKER_PATTERNS: &[Pattern] = &[
    Pattern::Class("ytp-ad-marker-container"),
    Pattern::Class("ytp-ad-marker"),
];

/// The ad-label text element.
pub const AD_LABEL_PATTERN: Pattern = Pattern::Class("ytp-ad-text");

/// The main media element.
pub const VIDEO_PLAYER_PATTERN: Pattern = Pattern::TagClass("video", "html5-main-video");

/// The player container carrying the ad-state markers.
pub const PLAYER_CONTAINER_PATTERN: Pattern = Pattern::DomId("movie_player");

/// Player-level "ad is showing" state marker.
pub const PLAYER_AD_CLASS: &str = "ad-showing";

/// Player-level "content interrupted by ad" marker.
pub const PLAYER_INTERRUPTING_CLASS: &str = "ad-interrupting";

/// Keyword a ready dismissal control must carry in text or label.
pub const DISMISS_KEYWORD: &str = "skip";

/// Class tokens that mark a control as a dismissal control even without
/// keyword text.
pub const DISMISS_CONTROL_CLASSES: &[&str] = &["ytp-skip-ad-button", "ytp-ad-skip-button"];
