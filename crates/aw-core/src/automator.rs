//! Skip-control automator.
//!
//! Scans for dismissal-control candidates while a session is active,
//! gates each through a readiness check, and synthesizes a realistic
//! bounded-attempt interaction sequence via the delayed-task calendar.
//! Attempt records live in an explicit TTL map keyed by the control's
//! stable identity token; a replaced control is a new instance with a
//! fresh budget.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use aw_page::pattern::{DISMISS_CONTROL_CLASSES, DISMISS_KEYWORD, SKIP_CONTROL_PATTERNS};
use aw_page::{ElementId, Page, PointerSignal};
use uuid::Uuid;

use crate::clock::Scheduler;
use crate::events::DelayedTask;

/// Attempt bound per control instance.
pub const MAX_ATTEMPTS: u32 = 5;

/// Cooldown after which a control's attempt record is discarded.
pub const ATTEMPT_TTL_MS: u64 = 5_000;

/// Delay before the post-dispatch confirmation re-check.
pub const RECHECK_DELAY_MS: u64 = 300;

/// Spacing between synthesized pointer signals.
pub const SIGNAL_STEP_MS: u64 = 15;

/// Extra delay before the native-activation fallback.
pub const ACTIVATE_EXTRA_DELAY_MS: u64 = 50;

/// Minimum opacity for a control to count as interactable.
const MIN_READY_OPACITY: f64 = 0.1;

/// Why a candidate was skipped this pass. Never fatal; the budget is
/// consulted again next pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotReady {
    Disconnected,
    NotVisible,
    Transparent,
    Disabled,
    PointerEventsBlocked,
    NegativeZIndex,
    Covered,
    NoDismissKeyword,
    AttemptBudgetExhausted,
}

#[derive(Debug, Clone, Copy)]
struct AttemptRecord {
    attempts: u32,
    expires_at_ms: u64,
}

/// Explicit TTL map of per-control attempt counts.
#[derive(Debug, Default)]
pub struct AttemptLedger {
    records: HashMap<ElementId, AttemptRecord>,
}

impl AttemptLedger {
    /// Lazy eviction: drop expired and disconnected entries.
    fn evict_stale(&mut self, page: &Page, now_ms: u64) {
        self.records
            .retain(|id, record| record.expires_at_ms > now_ms && page.is_connected(*id));
    }

    fn attempts(&self, id: ElementId) -> u32 {
        self.records.get(&id).map(|r| r.attempts).unwrap_or(0)
    }

    fn note_attempt(&mut self, id: ElementId, now_ms: u64) -> u32 {
        let record = self.records.entry(id).or_insert(AttemptRecord {
            attempts: 0,
            expires_at_ms: 0,
        });
        record.attempts += 1;
        record.expires_at_ms = now_ms + ATTEMPT_TTL_MS;
        record.attempts
    }

    fn clear(&mut self) {
        self.records.clear();
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Outcome of one scan pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub candidates: usize,
    pub dispatched: Vec<ElementId>,
    pub skipped: Vec<(ElementId, NotReady)>,
}

/// The automator: candidate discovery plus the attempt ledger.
#[derive(Debug, Default)]
pub struct Automator {
    ledger: AttemptLedger,
}

impl Automator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan for dismissal controls and schedule interaction sequences for
    /// every ready candidate with remaining budget. Must only be called
    /// with an active session; `session` scopes the confirmation
    /// re-check.
    pub fn scan(
        &mut self,
        page: &Page,
        session: Uuid,
        now_ms: u64,
        scheduler: &mut Scheduler<DelayedTask>,
    ) -> ScanReport {
        self.ledger.evict_stale(page, now_ms);

        let candidates = page.query_any(SKIP_CONTROL_PATTERNS);
        let mut report = ScanReport {
            candidates: candidates.len(),
            ..ScanReport::default()
        };

        for id in candidates {
            if self.ledger.attempts(id) >= MAX_ATTEMPTS {
                debug!(control = %id, "attempt budget exhausted, ignoring control");
                report.skipped.push((id, NotReady::AttemptBudgetExhausted));
                continue;
            }
            match readiness(page, id) {
                Err(reason) => {
                    debug!(control = %id, ?reason, "control not ready");
                    report.skipped.push((id, reason));
                }
                Ok(()) => {
                    let attempt = self.ledger.note_attempt(id, now_ms);
                    debug!(control = %id, attempt, "dispatching interaction sequence");
                    for (i, signal) in PointerSignal::SEQUENCE.iter().enumerate() {
                        scheduler.schedule(
                            now_ms + i as u64 * SIGNAL_STEP_MS,
                            DelayedTask::Pointer {
                                target: id,
                                signal: *signal,
                            },
                        );
                    }
                    let activate_at = now_ms
                        + PointerSignal::SEQUENCE.len() as u64 * SIGNAL_STEP_MS
                        + ACTIVATE_EXTRA_DELAY_MS;
                    scheduler.schedule(activate_at, DelayedTask::Activate { target: id });
                    scheduler.schedule(
                        now_ms + RECHECK_DELAY_MS,
                        DelayedTask::SkipRecheck {
                            session,
                            target: id,
                        },
                    );
                    report.dispatched.push(id);
                }
            }
        }
        report
    }

    /// Current attempt count for a control.
    pub fn attempts(&self, id: ElementId) -> u32 {
        self.ledger.attempts(id)
    }

    pub fn tracked_controls(&self) -> usize {
        self.ledger.len()
    }

    /// Discard all attempt records (teardown, disable).
    pub fn clear(&mut self) {
        self.ledger.clear();
    }
}

/// Full readiness check for one candidate control.
pub fn readiness(page: &Page, id: ElementId) -> Result<(), NotReady> {
    let el = page.get(id).ok_or(NotReady::Disconnected)?;
    if !el.connected {
        return Err(NotReady::Disconnected);
    }
    if !page.is_visible(id) {
        return Err(NotReady::NotVisible);
    }
    if el.style.opacity <= MIN_READY_OPACITY {
        return Err(NotReady::Transparent);
    }
    if el.disabled || el.aria_disabled {
        return Err(NotReady::Disabled);
    }
    if el.style.pointer_events_none
        || el.inline.get("pointer-events").map(String::as_str) == Some("none")
    {
        return Err(NotReady::PointerEventsBlocked);
    }
    if el.effective_z_index() < 0 {
        return Err(NotReady::NegativeZIndex);
    }
    let (cx, cy) = el.rect.center();
    match page.element_from_point(cx, cy) {
        Some(top) if top == id || page.contains(id, top) => {}
        _ => return Err(NotReady::Covered),
    }
    let keyworded = el.label_contains(DISMISS_KEYWORD)
        || DISMISS_CONTROL_CLASSES.iter().any(|c| el.has_class(c));
    if !keyworded {
        return Err(NotReady::NoDismissKeyword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aw_page::{ComputedStyle, PageElement, Rect};

    fn skip_button() -> PageElement {
        PageElement::new("button")
            .with_class("ytp-ad-skip-button")
            .with_text("Skip Ad")
            .with_rect(Rect::new(600.0, 400.0, 120.0, 40.0))
            .with_style(ComputedStyle {
                z_index: Some(10),
                ..ComputedStyle::default()
            })
    }

    fn scan_once(
        automator: &mut Automator,
        page: &Page,
        now_ms: u64,
    ) -> (ScanReport, Scheduler<DelayedTask>) {
        let mut scheduler = Scheduler::new();
        let report = automator.scan(page, Uuid::new_v4(), now_ms, &mut scheduler);
        (report, scheduler)
    }

    #[test]
    fn test_ready_control_gets_full_sequence() {
        let mut page = Page::new();
        let button = page.insert(skip_button());
        let mut automator = Automator::new();

        let (report, scheduler) = scan_once(&mut automator, &page, 1_000);
        assert_eq!(report.dispatched, vec![button]);
        // Four pointer signals + native activation + re-check.
        assert_eq!(scheduler.len(), 6);
        assert_eq!(automator.attempts(button), 1);
    }

    #[test]
    fn test_attempts_stop_at_budget() {
        let mut page = Page::new();
        let button = page.insert(skip_button());
        let mut automator = Automator::new();

        for i in 0..MAX_ATTEMPTS {
            let (report, _) = scan_once(&mut automator, &page, 1_000 + i as u64 * 100);
            assert_eq!(report.dispatched, vec![button]);
        }
        assert_eq!(automator.attempts(button), MAX_ATTEMPTS);

        let (report, scheduler) = scan_once(&mut automator, &page, 2_000);
        assert!(report.dispatched.is_empty());
        assert_eq!(
            report.skipped,
            vec![(button, NotReady::AttemptBudgetExhausted)]
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_record_expires_after_cooldown() {
        let mut page = Page::new();
        let button = page.insert(skip_button());
        let mut automator = Automator::new();

        scan_once(&mut automator, &page, 1_000);
        assert_eq!(automator.attempts(button), 1);

        // Next scan after the TTL: the record is gone, count restarts.
        scan_once(&mut automator, &page, 1_000 + ATTEMPT_TTL_MS + 1);
        assert_eq!(automator.attempts(button), 1);
    }

    #[test]
    fn test_replaced_control_has_fresh_budget() {
        let mut page = Page::new();
        let first = page.insert(skip_button());
        let mut automator = Automator::new();
        for i in 0..MAX_ATTEMPTS {
            scan_once(&mut automator, &page, 1_000 + i as u64 * 10);
        }
        assert_eq!(automator.attempts(first), MAX_ATTEMPTS);

        page.remove(first);
        let second = page.insert(skip_button());
        let (report, _) = scan_once(&mut automator, &page, 1_200);
        assert_eq!(report.dispatched, vec![second]);
    }

    #[test]
    fn test_not_ready_skips_without_consuming_budget() {
        let mut page = Page::new();
        let button = page.insert(skip_button().with_disabled(true));
        let mut automator = Automator::new();

        let (report, _) = scan_once(&mut automator, &page, 1_000);
        assert_eq!(report.skipped, vec![(button, NotReady::Disabled)]);
        assert_eq!(automator.attempts(button), 0);
    }

    #[test]
    fn test_readiness_rejects_covered_control() {
        let mut page = Page::new();
        let button = page.insert(skip_button());
        page.insert(
            PageElement::new("div")
                .with_rect(Rect::new(580.0, 380.0, 200.0, 100.0))
                .with_style(ComputedStyle {
                    z_index: Some(100),
                    ..ComputedStyle::default()
                }),
        );
        assert_eq!(readiness(&page, button), Err(NotReady::Covered));
    }

    #[test]
    fn test_readiness_accepts_topmost_descendant() {
        let mut page = Page::new();
        let button = page.insert(skip_button());
        // Icon inside the button sits on top at its center.
        page.insert(
            PageElement::new("span")
                .with_rect(Rect::new(640.0, 410.0, 60.0, 20.0))
                .with_style(ComputedStyle {
                    z_index: Some(11),
                    ..ComputedStyle::default()
                })
                .with_parent(button),
        );
        assert_eq!(readiness(&page, button), Ok(()));
    }

    #[test]
    fn test_readiness_requires_dismiss_keyword() {
        let mut page = Page::new();
        // Matches the generic "skip" class fragment but carries no
        // keyword text and no known dismissal class.
        let vague = page.insert(
            PageElement::new("button")
                .with_class("intro-skipper-disabled")
                .with_text("Next")
                .with_rect(Rect::new(0.0, 0.0, 80.0, 30.0)),
        );
        assert_eq!(readiness(&page, vague), Err(NotReady::NoDismissKeyword));
    }

    #[test]
    fn test_readiness_rejects_faint_control() {
        let mut page = Page::new();
        let faint = page.insert(skip_button().with_style(ComputedStyle {
            opacity: 0.05,
            ..ComputedStyle::default()
        }));
        assert_eq!(readiness(&page, faint), Err(NotReady::Transparent));
    }

    #[test]
    fn test_inline_pointer_events_none_blocks() {
        let mut page = Page::new();
        let button = page.insert(skip_button());
        page.set_inline(button, "pointer-events", "none");
        assert_eq!(readiness(&page, button), Err(NotReady::PointerEventsBlocked));
    }
}
