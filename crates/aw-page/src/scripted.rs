//! Scripted in-memory page host.
//!
//! Drives the engine in tests and in the replay binary: ad breaks are
//! started and ended by script, and (optionally) a click on the current
//! skip control ends the break the way the real page would.

use tracing::debug;

use crate::element::{ComputedStyle, ElementId, MediaState, PageElement, Rect};
use crate::host::{PageError, PageHost, PointerSignal};
use crate::page::Page;
use crate::pattern::{PLAYER_AD_CLASS, PLAYER_INTERRUPTING_CLASS};

/// An in-memory page with a player, a video element, and scriptable ad
/// breaks.
#[derive(Debug)]
pub struct ScriptedPage {
    page: Page,
    player: ElementId,
    video: ElementId,
    break_ids: Vec<ElementId>,
    skip_control: Option<ElementId>,
    skip_ends_break: bool,
    fail_interactions: Vec<ElementId>,
    touched: Vec<ElementId>,
    /// Every pointer signal delivered, in order.
    pub dispatch_log: Vec<(ElementId, PointerSignal)>,
    /// Every native activation delivered, in order.
    pub activation_log: Vec<ElementId>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        let mut page = Page::new();
        let player = page.insert(
            PageElement::new("div")
                .with_dom_id("movie_player")
                .with_class("html5-video-player")
                .with_rect(Rect::new(0.0, 0.0, 800.0, 450.0)),
        );
        let video = page.insert(
            PageElement::new("video")
                .with_class("html5-main-video")
                .with_rect(Rect::new(0.0, 0.0, 800.0, 450.0))
                .with_media(MediaState {
                    volume: 0.7,
                    muted: false,
                })
                .with_parent(player),
        );
        Self {
            page,
            player,
            video,
            break_ids: Vec::new(),
            skip_control: None,
            skip_ends_break: true,
            fail_interactions: Vec::new(),
            touched: Vec::new(),
            dispatch_log: Vec::new(),
            activation_log: Vec::new(),
        }
    }

    pub fn player(&self) -> ElementId {
        self.player
    }

    pub fn video(&self) -> ElementId {
        self.video
    }

    pub fn skip_control(&self) -> Option<ElementId> {
        self.skip_control
    }

    /// When false, clicking the skip control does nothing (unskippable ad).
    pub fn set_skip_ends_break(&mut self, ends: bool) {
        self.skip_ends_break = ends;
    }

    /// Make pointer/activation delivery fail for one element.
    pub fn fail_interactions_on(&mut self, id: ElementId) {
        self.fail_interactions.push(id);
    }

    /// Structural changes since the last drain, as the mutation queue
    /// would report them.
    pub fn drain_mutations(&mut self) -> Vec<ElementId> {
        std::mem::take(&mut self.touched)
    }

    /// Start an interstitial ad break: player ad markers, an overlay, and
    /// the ad label. The skip control appears separately via
    /// [`ScriptedPage::reveal_skip_control`].
    pub fn begin_ad_break(&mut self) {
        if !self.break_ids.is_empty() {
            return;
        }
        if let Some(player) = self.page.get_mut(self.player) {
            player.classes.push(PLAYER_AD_CLASS.to_string());
            player.classes.push(PLAYER_INTERRUPTING_CLASS.to_string());
        }
        let overlay = self.page.insert(
            PageElement::new("div")
                .with_class("ytp-ad-player-overlay")
                .with_rect(Rect::new(0.0, 0.0, 800.0, 450.0))
                .with_parent(self.player),
        );
        let label = self.page.insert(
            PageElement::new("span")
                .with_class("ytp-ad-text")
                .with_text("Ad · 1 of 2")
                .with_rect(Rect::new(16.0, 400.0, 80.0, 20.0))
                .with_parent(overlay),
        );
        self.break_ids = vec![overlay, label];
        self.touched.extend([self.player, overlay, label]);
        debug!(overlay = %overlay, "scripted ad break started");
    }

    /// Reveal a ready-to-click skip control inside the running break.
    pub fn reveal_skip_control(&mut self) -> ElementId {
        if let Some(existing) = self.skip_control {
            return existing;
        }
        let container = self.page.insert(
            PageElement::new("div")
                .with_class("ytp-ad-skip-button-container")
                .with_rect(Rect::new(620.0, 380.0, 140.0, 48.0))
                .with_style(ComputedStyle {
                    z_index: Some(60),
                    ..ComputedStyle::default()
                })
                .with_parent(self.player),
        );
        let button = self.page.insert(
            PageElement::new("button")
                .with_class("ytp-ad-skip-button")
                .with_text("Skip Ad")
                .with_aria_label("Skip ad")
                .with_rect(Rect::new(628.0, 386.0, 124.0, 36.0))
                .with_style(ComputedStyle {
                    z_index: Some(61),
                    ..ComputedStyle::default()
                })
                .with_parent(container),
        );
        self.break_ids.extend([container, button]);
        self.skip_control = Some(button);
        self.touched.extend([container, button]);
        button
    }

    /// End the break: drop ad scaffolding and player markers.
    pub fn end_ad_break(&mut self) {
        for id in std::mem::take(&mut self.break_ids) {
            self.page.remove(id);
        }
        self.skip_control = None;
        if let Some(player) = self.page.get_mut(self.player) {
            player
                .classes
                .retain(|c| c != PLAYER_AD_CLASS && c != PLAYER_INTERRUPTING_CLASS);
        }
        self.touched.push(self.player);
        debug!("scripted ad break ended");
    }

    pub fn ad_break_running(&self) -> bool {
        !self.break_ids.is_empty()
    }

    fn deliver(&mut self, target: ElementId) -> Result<(), PageError> {
        if self.fail_interactions.contains(&target) {
            return Err(PageError::Dispatch(format!(
                "interaction blocked on {target}"
            )));
        }
        if self.page.get(target).is_none() {
            return Err(PageError::NotFound(target));
        }
        if !self.page.is_connected(target) {
            return Err(PageError::Disconnected(target));
        }
        Ok(())
    }

    fn maybe_end_break(&mut self, target: ElementId) {
        if self.skip_ends_break && self.skip_control == Some(target) {
            self.end_ad_break();
        }
    }
}

impl Default for ScriptedPage {
    fn default() -> Self {
        Self::new()
    }
}

impl PageHost for ScriptedPage {
    fn page(&self) -> &Page {
        &self.page
    }

    fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    fn dispatch_pointer(
        &mut self,
        target: ElementId,
        signal: PointerSignal,
    ) -> Result<(), PageError> {
        self.deliver(target)?;
        self.dispatch_log.push((target, signal));
        if signal == PointerSignal::Click {
            self.maybe_end_break(target);
        }
        Ok(())
    }

    fn activate(&mut self, target: ElementId) -> Result<(), PageError> {
        self.deliver(target)?;
        self.activation_log.push(target);
        self.maybe_end_break(target);
        Ok(())
    }
}
