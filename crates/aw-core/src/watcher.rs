//! The in-page watcher engine.
//!
//! Single cooperative dispatcher over the event queues, the delayed-task
//! calendar, and the fixed tick. Every processing step classifies the
//! page before any automation runs; the lifecycle machine is the only
//! writer of session state.

use tracing::{debug, info, warn};

use aw_page::{ElementId, PageHost};
use aw_common::settings::WatcherSettings;
use aw_store::{SettingsChange, SettingsStore};

use crate::automator::Automator;
use crate::classify::classify;
use crate::clock::{Clock, Scheduler};
use crate::counter::{ClaimDecision, CounterDebouncer};
use crate::events::{ControlSignal, DelayedTask, EventQueues, TICK_PERIOD_MS};
use crate::features::{BlurApplier, MuteApplier};
use crate::guard::{ContextGuard, FailureDisposition};
use crate::lifecycle::{Lifecycle, Transition};

/// The watcher: owns every engine component and dispatches all events.
pub struct Watcher {
    settings: WatcherSettings,
    store: SettingsStore,
    clock: Box<dyn Clock>,
    queues: EventQueues,
    scheduler: Scheduler<DelayedTask>,
    lifecycle: Lifecycle,
    automator: Automator,
    mute: MuteApplier,
    blur: BlurApplier,
    counter: CounterDebouncer,
    guard: ContextGuard,
    watching: bool,
    torn_down: bool,
    next_tick_ms: Option<u64>,
}

impl Watcher {
    pub fn new(store: SettingsStore, clock: Box<dyn Clock>) -> Self {
        Self {
            settings: WatcherSettings::default(),
            store,
            clock,
            queues: EventQueues::new(),
            scheduler: Scheduler::new(),
            lifecycle: Lifecycle::new(),
            automator: Automator::new(),
            mute: MuteApplier::new(),
            blur: BlurApplier::new(),
            counter: CounterDebouncer::new(),
            guard: ContextGuard::new(),
            watching: false,
            torn_down: false,
            next_tick_ms: None,
        }
    }

    /// Read persisted settings and start watching if enabled. Storage
    /// failures here degrade to defaults, except context invalidation
    /// which tears the engine down before it ever starts.
    pub fn bootstrap(&mut self, host: &mut dyn PageHost) {
        match self.store.read_settings() {
            Ok(settings) => self.settings = settings,
            Err(err) => {
                if self.guard.classify(&err) == FailureDisposition::Teardown {
                    self.teardown(host);
                    return;
                }
                self.settings = WatcherSettings::default();
            }
        }
        // Changes raised by our own reads or by default seeding are not
        // toggle flips; drop the baseline.
        let _ = self.store.drain_changes();
        if self.settings.enabled {
            self.start(host);
        }
        info!(
            enabled = self.settings.enabled,
            mute = self.settings.mute_ad_sound,
            blur = self.settings.blur_ads,
            "watcher bootstrapped"
        );
    }

    pub fn settings(&self) -> &WatcherSettings {
        &self.settings
    }

    pub fn is_watching(&self) -> bool {
        self.watching
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn is_ad_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Queue a structural page mutation for the next pump.
    pub fn notify_mutation(&mut self, target: ElementId) {
        if !self.torn_down {
            self.queues.push_mutation(target);
        }
    }

    pub fn notify_navigated(&mut self) {
        if !self.torn_down {
            self.queues.push_signal(ControlSignal::Navigated);
        }
    }

    pub fn notify_unload(&mut self) {
        if !self.torn_down {
            self.queues.push_signal(ControlSignal::Unload);
        }
    }

    /// Drain everything currently runnable: settings changes, control
    /// signals, queued mutations, then due calendar tasks and ticks in
    /// timestamp order.
    pub fn pump(&mut self, host: &mut dyn PageHost) {
        if self.torn_down {
            return;
        }
        for change in self.store.drain_changes() {
            self.apply_settings_change(change, host);
            if self.torn_down {
                return;
            }
        }
        while let Some(signal) = self.queues.pop_signal() {
            self.handle_signal(signal, host);
            if self.torn_down {
                return;
            }
        }
        // A mutation batch triggers at most one step: classification is
        // a pure function of the current snapshot.
        let mut relevant = false;
        while let Some(target) = self.queues.pop_mutation() {
            if self.lifecycle.is_active()
                || host.page().is_ad_related(target)
                || !host.page().is_connected(target)
            {
                relevant = true;
            }
        }
        if relevant && self.watching {
            self.step(host);
        }

        let now = self.clock.now_ms();
        loop {
            if self.torn_down {
                return;
            }
            let task_due = self.scheduler.next_due().filter(|due| *due <= now);
            let tick_due = self
                .next_tick_ms
                .filter(|at| *at <= now && self.watching);
            match (task_due, tick_due) {
                (Some(task_at), Some(tick_at)) if tick_at <= task_at => self.run_tick(tick_at, host),
                (Some(_), _) => {
                    if let Some(task) = self.scheduler.pop_due(now) {
                        self.run_task(task, host);
                    }
                }
                (None, Some(tick_at)) => self.run_tick(tick_at, host),
                (None, None) => break,
            }
        }
    }

    fn run_tick(&mut self, tick_at: u64, host: &mut dyn PageHost) {
        let now = self.clock.now_ms();
        let mut next = tick_at + TICK_PERIOD_MS;
        // Catch up after a long gap instead of replaying every period.
        while next <= now {
            next += TICK_PERIOD_MS;
        }
        self.next_tick_ms = Some(next);
        self.step(host);
    }

    /// One processing step: classify, drive the lifecycle, apply or
    /// withdraw mitigations on the edges, then (and only then) automate.
    fn step(&mut self, host: &mut dyn PageHost) {
        if !self.watching {
            return;
        }
        let classification = classify(host.page());
        match self.lifecycle.observe(classification.verdict()) {
            Transition::AdStarted => {
                if self.settings.mute_ad_sound {
                    self.mute.apply(host.page_mut(), true);
                }
                // Blur is handled below with the rest of the active-state
                // work; it re-runs every step to catch late overlays.
            }
            Transition::AdEnded => {
                self.mute.restore(host.page_mut());
                self.blur.remove(host.page_mut());
            }
            Transition::None => {}
        }
        if self.lifecycle.is_active() {
            if self.settings.blur_ads {
                // Overlays and controls added since the start edge.
                self.blur.apply(host.page_mut());
            }
            let now = self.clock.now_ms();
            let session = self.lifecycle.session().id;
            self.automator.scan(host.page(), session, now, &mut self.scheduler);
        }
    }

    fn run_task(&mut self, task: DelayedTask, host: &mut dyn PageHost) {
        match task {
            DelayedTask::Pointer { target, signal } => {
                if let Err(err) = host.dispatch_pointer(target, signal) {
                    debug!(control = %target, ?signal, error = %err, "pointer dispatch failed");
                }
            }
            DelayedTask::Activate { target } => {
                if let Err(err) = host.activate(target) {
                    debug!(control = %target, error = %err, "activation failed");
                }
            }
            DelayedTask::SkipRecheck { session, target } => {
                // Re-observe before judging: the click's fallout may not
                // have been pumped through a step yet.
                self.step(host);
                if self.lifecycle.try_claim(session) {
                    info!(control = %target, "skip confirmed");
                    self.claim_counter(host);
                } else {
                    debug!(control = %target, "re-check found no confirmed skip");
                }
            }
            DelayedTask::CounterRelease => self.counter.release(),
            DelayedTask::CounterRetry => {
                self.counter.begin_retry();
                self.write_counter(host);
            }
        }
    }

    fn handle_signal(&mut self, signal: ControlSignal, host: &mut dyn PageHost) {
        match signal {
            ControlSignal::Navigated => {
                info!("navigation observed, resetting ad state");
                self.mute.restore(host.page_mut());
                self.blur.remove(host.page_mut());
                self.automator.clear();
                self.lifecycle.reset();
                if self.watching {
                    self.step(host);
                }
            }
            ControlSignal::Unload => self.teardown(host),
        }
    }

    fn apply_settings_change(&mut self, change: SettingsChange, host: &mut dyn PageHost) {
        match change {
            SettingsChange::Enabled(true) => {
                if !self.watching {
                    self.start(host);
                }
            }
            SettingsChange::Enabled(false) => {
                if self.watching {
                    self.stop(host);
                }
            }
            SettingsChange::MuteAdSound(on) => {
                self.settings.mute_ad_sound = on;
                if on {
                    self.mute.apply(host.page_mut(), self.lifecycle.is_active());
                } else {
                    self.mute.restore(host.page_mut());
                }
            }
            SettingsChange::BlurAds(on) => {
                self.settings.blur_ads = on;
                if on && self.lifecycle.is_active() {
                    self.blur.apply(host.page_mut());
                } else if !on {
                    // Removal runs even while idle so stale residue from
                    // an interrupted session gets cleaned up.
                    self.blur.remove(host.page_mut());
                }
            }
            SettingsChange::AdsSkipped(total) => {
                debug!(total, "counter changed externally");
            }
        }
    }

    fn start(&mut self, host: &mut dyn PageHost) {
        self.settings.enabled = true;
        self.watching = true;
        self.next_tick_ms = Some(self.clock.now_ms() + TICK_PERIOD_MS);
        info!("watching started");
        self.step(host);
    }

    /// Disable while keeping the engine restartable.
    fn stop(&mut self, host: &mut dyn PageHost) {
        self.settings.enabled = false;
        self.watching = false;
        self.next_tick_ms = None;
        self.queues.clear();
        self.scheduler.clear();
        self.automator.clear();
        self.mute.restore(host.page_mut());
        self.blur.remove(host.page_mut());
        self.lifecycle.reset();
        info!("watching stopped");
    }

    fn claim_counter(&mut self, host: &mut dyn PageHost) {
        let now = self.clock.now_ms();
        match self.counter.claim(now) {
            ClaimDecision::WriteNow => self.write_counter(host),
            ClaimDecision::Absorbed { until_ms } => {
                self.scheduler.schedule(until_ms, DelayedTask::CounterRelease);
            }
            ClaimDecision::Ignored => {}
        }
    }

    fn write_counter(&mut self, host: &mut dyn PageHost) {
        let now = self.clock.now_ms();
        match self.store.increment_counter() {
            Ok(total) => {
                self.counter.on_write_ok(now);
                info!(total, "skip counter persisted");
            }
            Err(err) => match self.guard.classify(&err) {
                FailureDisposition::Teardown => self.teardown(host),
                FailureDisposition::RetryLater => {
                    let retry_at = self.counter.on_quota_exceeded(now);
                    self.scheduler.schedule(retry_at, DelayedTask::CounterRetry);
                }
                FailureDisposition::Degrade | FailureDisposition::Abandon => {
                    self.counter.on_write_failed();
                    warn!("skip counter write abandoned");
                }
            },
        }
    }

    /// Permanent shutdown: silence every event source first, then undo
    /// page effects, then latch.
    pub fn teardown(&mut self, host: &mut dyn PageHost) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.watching = false;
        self.next_tick_ms = None;
        self.queues.clear();
        self.scheduler.clear();
        self.automator.clear();
        self.mute.restore(host.page_mut());
        self.blur.remove(host.page_mut());
        self.lifecycle.reset();
        info!("watcher torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use aw_common::keys;
    use aw_page::{PageElement, Rect, ScriptedPage};
    use aw_store::{InjectedFault, MemoryBackend};

    use crate::clock::ManualClock;

    struct Fixture {
        watcher: Watcher,
        host: ScriptedPage,
        clock: ManualClock,
        backend: Rc<RefCell<MemoryBackend>>,
        store: SettingsStore,
    }

    fn fixture(enabled: bool) -> Fixture {
        let backend = Rc::new(RefCell::new(MemoryBackend::new()));
        let store = SettingsStore::new(backend.clone());
        store
            .write_entries(vec![(keys::WATCHER_ENABLED.to_string(), json!(enabled))])
            .unwrap();
        let clock = ManualClock::new();
        let mut watcher = Watcher::new(store.clone(), Box::new(clock.clone()));
        let mut host = ScriptedPage::new();
        watcher.bootstrap(&mut host);
        Fixture {
            watcher,
            host,
            clock,
            backend,
            store,
        }
    }

    /// Advance in automator-step-sized increments, forwarding the
    /// scripted page's mutations the way a real observer would.
    fn run_for(fx: &mut Fixture, ms: u64) {
        let end = fx.clock.now_ms() + ms;
        while fx.clock.now_ms() < end {
            fx.clock.advance(5.min(end - fx.clock.now_ms()));
            for target in fx.host.drain_mutations() {
                fx.watcher.notify_mutation(target);
            }
            fx.watcher.pump(&mut fx.host);
        }
    }

    #[test]
    fn test_disabled_watcher_ignores_ad_break() {
        let mut fx = fixture(false);
        assert!(!fx.watcher.is_watching());

        fx.host.begin_ad_break();
        fx.host.reveal_skip_control();
        run_for(&mut fx, 2_000);
        assert!(fx.host.ad_break_running());
        assert!(fx.host.dispatch_log.is_empty());
    }

    #[test]
    fn test_end_to_end_skip_increments_counter() {
        let mut fx = fixture(true);
        assert!(fx.watcher.is_watching());

        fx.host.begin_ad_break();
        fx.host.reveal_skip_control();
        run_for(&mut fx, 1_000);

        assert!(!fx.host.ad_break_running());
        assert!(!fx.watcher.is_ad_active());
        assert!(fx
            .host
            .dispatch_log
            .iter()
            .any(|(_, s)| *s == aw_page::PointerSignal::Click));
        assert_eq!(fx.store.read_counter().unwrap(), 1);
    }

    #[test]
    fn test_enable_toggle_starts_and_disable_cleans_up() {
        let mut fx = fixture(false);
        fx.host.begin_ad_break();

        fx.store.write_enabled(true).unwrap();
        run_for(&mut fx, 600);
        assert!(fx.watcher.is_watching());
        assert!(fx.watcher.is_ad_active());

        fx.store.write_enabled(false).unwrap();
        run_for(&mut fx, 100);
        assert!(!fx.watcher.is_watching());
        assert!(!fx.watcher.is_ad_active());
        // Restartable, not torn down.
        assert!(!fx.watcher.is_torn_down());
    }

    #[test]
    fn test_unload_teardown_latches_and_restores_audio() {
        let mut fx = fixture(true);
        fx.store
            .write_entries(vec![(keys::MUTE_AD_SOUND.to_string(), json!(true))])
            .unwrap();
        fx.host.begin_ad_break();
        run_for(&mut fx, 600);

        let video = fx.host.video();
        assert!(fx.host.page().get(video).unwrap().media.unwrap().muted);

        fx.watcher.notify_unload();
        fx.watcher.pump(&mut fx.host);
        assert!(fx.watcher.is_torn_down());
        let media = fx.host.page().get(video).unwrap().media.unwrap();
        assert!(!media.muted);
        assert_eq!(media.volume, 0.7);

        // Latched: a later enable flip is ignored.
        fx.store.write_enabled(true).unwrap();
        fx.watcher.pump(&mut fx.host);
        assert!(!fx.watcher.is_watching());
    }

    #[test]
    fn test_context_invalidation_on_counter_write_tears_down() {
        let mut fx = fixture(true);
        fx.host.begin_ad_break();
        fx.host.reveal_skip_control();
        fx.backend
            .borrow_mut()
            .inject_set_fault(InjectedFault::ContextInvalidated);
        run_for(&mut fx, 1_000);

        assert!(fx.watcher.is_torn_down());
        assert_eq!(fx.store.read_counter().unwrap(), 0);
    }

    #[test]
    fn test_navigation_resets_session_and_drops_pending_claim() {
        let mut fx = fixture(true);
        fx.host.set_skip_ends_break(false);
        fx.host.begin_ad_break();
        fx.host.reveal_skip_control();
        // Get an attempt in flight, then navigate before the re-check.
        run_for(&mut fx, 100);
        assert!(fx.watcher.is_ad_active());

        fx.host.end_ad_break();
        fx.watcher.notify_navigated();
        run_for(&mut fx, 1_000);

        assert!(!fx.watcher.is_ad_active());
        // The re-check's session died with the reset; no counter claim.
        assert_eq!(fx.store.read_counter().unwrap(), 0);
    }

    #[test]
    fn test_mute_toggle_mid_session() {
        let mut fx = fixture(true);
        // Muting defaults on; start the session with it off so each
        // toggle below flips the media state.
        fx.store
            .write_entries(vec![(keys::MUTE_AD_SOUND.to_string(), json!(false))])
            .unwrap();
        fx.host.set_skip_ends_break(false);
        fx.host.begin_ad_break();
        run_for(&mut fx, 600);
        let video = fx.host.video();
        assert!(!fx.host.page().get(video).unwrap().media.unwrap().muted);

        fx.store
            .write_entries(vec![(keys::MUTE_AD_SOUND.to_string(), json!(true))])
            .unwrap();
        run_for(&mut fx, 100);
        assert!(fx.host.page().get(video).unwrap().media.unwrap().muted);

        fx.store
            .write_entries(vec![(keys::MUTE_AD_SOUND.to_string(), json!(false))])
            .unwrap();
        run_for(&mut fx, 100);
        assert!(!fx.host.page().get(video).unwrap().media.unwrap().muted);
    }

    #[test]
    fn test_unrelated_mutation_does_not_trigger_a_step() {
        let mut fx = fixture(true);
        fx.host.begin_ad_break();
        fx.host.reveal_skip_control();
        // Drop the ad mutations; only the unrelated one gets reported.
        fx.host.drain_mutations();

        let comments = fx.host.page_mut().insert(
            PageElement::new("div")
                .with_class("comments")
                .with_rect(Rect::new(0.0, 800.0, 600.0, 400.0)),
        );
        fx.watcher.notify_mutation(comments);
        fx.clock.advance(5);
        fx.watcher.pump(&mut fx.host);

        // No step ran: the break on the page was not classified, so the
        // session never started and nothing was dispatched or muted.
        let video = fx.host.video();
        assert!(fx.host.dispatch_log.is_empty());
        assert!(!fx.host.page().get(video).unwrap().media.unwrap().muted);

        // The periodic tick still picks the break up.
        fx.clock.advance(TICK_PERIOD_MS);
        fx.watcher.pump(&mut fx.host);
        assert!(fx.host.page().get(video).unwrap().media.unwrap().muted);
    }
}
