//! Visual blurring of ad surfaces.
//!
//! Blurs the main video and known ad overlays through inline style
//! writes while keeping every dismissal region sharp and on top so the
//! automator (and the user) can still reach the skip control.

use std::collections::BTreeSet;

use tracing::debug;

use aw_page::pattern::{AD_OVERLAY_PATTERNS, SKIP_CONTAINER_PATTERNS, SKIP_CONTROL_PATTERNS};
use aw_page::{ElementId, Page};

pub const BLUR_FILTER: &str = "blur(30px)";
pub const BLUR_TRANSITION: &str = "filter 0.3s ease";

/// Inline z-index forced onto dismissal controls while blur is active.
pub const CONTROL_Z_INDEX: &str = "9999";

/// How many ancestors above each control get the sharpness override.
pub const CONTROL_ANCESTOR_DEPTH: usize = 3;

/// Applies and removes the blur treatment, tracking every element it
/// touched so removal never leaves residue.
#[derive(Debug, Default)]
pub struct BlurApplier {
    blurred: BTreeSet<ElementId>,
}

impl BlurApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blur ad surfaces currently in the page. Each pass starts from a
    /// clean slate: everything blurred earlier is stripped first, so an
    /// element that stopped qualifying loses its stale blur.
    pub fn apply(&mut self, page: &mut Page) {
        self.clear_tracked(page);

        let controls = page.query_any(SKIP_CONTROL_PATTERNS);

        for id in page.query_any(AD_OVERLAY_PATTERNS) {
            if !page.is_visible(id) {
                continue;
            }
            if self.is_dismissal_region(page, id, &controls) {
                continue;
            }
            self.blur_one(page, id);
        }
        if let Some(video) = page.video() {
            self.blur_one(page, video);
        }
        self.assert_control_priority(page, &controls);
        debug!(blurred = self.blurred.len(), "blur applied");
    }

    /// Strip the blur from everything previously touched.
    pub fn remove(&mut self, page: &mut Page) {
        self.clear_tracked(page);
        debug!("blur removed");
    }

    fn clear_tracked(&mut self, page: &mut Page) {
        for id in std::mem::take(&mut self.blurred) {
            page.clear_inline(id, "filter");
            page.clear_inline(id, "transition");
        }
    }

    pub fn blurred_count(&self) -> usize {
        self.blurred.len()
    }

    fn blur_one(&mut self, page: &mut Page, id: ElementId) {
        page.set_inline(id, "filter", BLUR_FILTER);
        page.set_inline(id, "transition", BLUR_TRANSITION);
        self.blurred.insert(id);
    }

    /// An overlay is a dismissal region when it is a skip container, sits
    /// inside one, or contains (or is contained by) a skip control.
    fn is_dismissal_region(&self, page: &Page, id: ElementId, controls: &[ElementId]) -> bool {
        if SKIP_CONTAINER_PATTERNS.iter().any(|p| page.matches(id, p)) {
            return true;
        }
        if page
            .ancestors(id)
            .iter()
            .any(|a| SKIP_CONTAINER_PATTERNS.iter().any(|p| page.matches(*a, p)))
        {
            return true;
        }
        controls
            .iter()
            .any(|c| page.contains(id, *c) || page.contains(*c, id) || *c == id)
    }

    /// Force dismissal controls (and a few ancestors) sharp, clickable
    /// and above the blurred surfaces.
    fn assert_control_priority(&self, page: &mut Page, controls: &[ElementId]) {
        for &control in controls {
            page.set_inline(control, "filter", "none");
            page.set_inline(control, "z-index", CONTROL_Z_INDEX);
            page.set_inline(control, "pointer-events", "auto");
            for ancestor in page
                .ancestors(control)
                .into_iter()
                .take(CONTROL_ANCESTOR_DEPTH)
            {
                page.set_inline(ancestor, "filter", "none");
                page.set_inline(ancestor, "z-index", CONTROL_Z_INDEX);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aw_page::{MediaState, PageElement, Rect};

    fn base_page() -> Page {
        let mut page = Page::new();
        page.insert(
            PageElement::new("video")
                .with_class("html5-main-video")
                .with_media(MediaState { volume: 0.7, muted: false })
                .with_rect(Rect::new(0.0, 0.0, 1280.0, 720.0)),
        );
        page
    }

    #[test]
    fn test_video_and_overlay_get_blurred() {
        let mut page = base_page();
        let overlay = page.insert(
            PageElement::new("div")
                .with_class("video-ads")
                .with_rect(Rect::new(0.0, 0.0, 1280.0, 720.0)),
        );
        let mut blur = BlurApplier::new();
        blur.apply(&mut page);

        let video = page.video().unwrap();
        assert_eq!(page.inline(video, "filter"), Some(BLUR_FILTER));
        assert_eq!(page.inline(overlay, "filter"), Some(BLUR_FILTER));
        assert_eq!(page.inline(overlay, "transition"), Some(BLUR_TRANSITION));
    }

    #[test]
    fn test_skip_container_overlay_stays_sharp() {
        let mut page = base_page();
        let container = page.insert(
            PageElement::new("div")
                .with_class("ytp-ad-skip-button-container")
                .with_rect(Rect::new(600.0, 400.0, 160.0, 60.0)),
        );
        // Overlay nested inside the skip container.
        let nested = page.insert(
            PageElement::new("div")
                .with_class("video-ads")
                .with_rect(Rect::new(600.0, 400.0, 160.0, 60.0))
                .with_parent(container),
        );
        let mut blur = BlurApplier::new();
        blur.apply(&mut page);
        assert_eq!(page.inline(nested, "filter"), None);
    }

    #[test]
    fn test_overlay_holding_skip_control_stays_sharp() {
        let mut page = base_page();
        let overlay = page.insert(
            PageElement::new("div")
                .with_class("video-ads")
                .with_rect(Rect::new(0.0, 0.0, 1280.0, 720.0)),
        );
        page.insert(
            PageElement::new("button")
                .with_class("ytp-ad-skip-button")
                .with_text("Skip Ad")
                .with_rect(Rect::new(600.0, 400.0, 120.0, 40.0))
                .with_parent(overlay),
        );
        let mut blur = BlurApplier::new();
        blur.apply(&mut page);
        // Never blurred, and as the control's parent it gets the
        // explicit sharpness override.
        assert_eq!(page.inline(overlay, "filter"), Some("none"));
    }

    #[test]
    fn test_reapply_clears_blur_from_disqualified_overlay() {
        let mut page = base_page();
        let overlay = page.insert(
            PageElement::new("div")
                .with_class("video-ads")
                .with_rect(Rect::new(0.0, 0.0, 1280.0, 720.0)),
        );
        let mut blur = BlurApplier::new();
        blur.apply(&mut page);
        assert_eq!(page.inline(overlay, "filter"), Some(BLUR_FILTER));

        // A skip control appears nested deeper than the ancestor
        // override reaches. The overlay now holds a control, so the
        // next pass must leave it sharp rather than keep the old blur.
        let mut parent = overlay;
        for _ in 0..CONTROL_ANCESTOR_DEPTH {
            parent = page.insert(PageElement::new("div").with_parent(parent));
        }
        page.insert(
            PageElement::new("button")
                .with_class("ytp-ad-skip-button")
                .with_text("Skip Ad")
                .with_rect(Rect::new(600.0, 400.0, 120.0, 40.0))
                .with_parent(parent),
        );
        blur.apply(&mut page);
        assert_eq!(page.inline(overlay, "filter"), None);
        assert_eq!(page.inline(overlay, "transition"), None);
    }

    #[test]
    fn test_controls_forced_sharp_and_on_top() {
        let mut page = base_page();
        let wrapper = page.insert(PageElement::new("div").with_class("ytp-ad-module"));
        let control = page.insert(
            PageElement::new("button")
                .with_class("ytp-ad-skip-button")
                .with_text("Skip Ad")
                .with_parent(wrapper),
        );
        let mut blur = BlurApplier::new();
        blur.apply(&mut page);

        assert_eq!(page.inline(control, "filter"), Some("none"));
        assert_eq!(page.inline(control, "z-index"), Some(CONTROL_Z_INDEX));
        assert_eq!(page.inline(control, "pointer-events"), Some("auto"));
        assert_eq!(page.inline(wrapper, "filter"), Some("none"));
    }

    #[test]
    fn test_remove_strips_every_touched_element() {
        let mut page = base_page();
        let overlay = page.insert(
            PageElement::new("div")
                .with_class("video-ads")
                .with_rect(Rect::new(0.0, 0.0, 1280.0, 720.0)),
        );
        let mut blur = BlurApplier::new();
        blur.apply(&mut page);
        blur.remove(&mut page);

        let video = page.video().unwrap();
        assert_eq!(page.inline(video, "filter"), None);
        assert_eq!(page.inline(overlay, "filter"), None);
        assert_eq!(page.inline(overlay, "transition"), None);
        assert_eq!(blur.blurred_count(), 0);
    }

    #[test]
    fn test_vanished_element_dropped_from_tracking() {
        let mut page = base_page();
        let overlay = page.insert(
            PageElement::new("div")
                .with_class("video-ads")
                .with_rect(Rect::new(0.0, 0.0, 1280.0, 720.0)),
        );
        let mut blur = BlurApplier::new();
        blur.apply(&mut page);
        assert_eq!(blur.blurred_count(), 2);

        page.remove(overlay);
        blur.apply(&mut page);
        assert_eq!(blur.blurred_count(), 1);
    }
}
