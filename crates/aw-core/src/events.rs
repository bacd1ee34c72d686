//! Event sources feeding the dispatcher.
//!
//! Two named producer queues — structural mutation notifications and page
//! control signals — plus the fixed-period timer and the delayed-task
//! calendar. One dispatcher ([`crate::watcher::Watcher::pump`]) consumes
//! them strictly one event at a time; within any processing step,
//! classification resolves before automation. That ordering is an
//! explicit invariant, not an accident of scheduling.

use std::collections::VecDeque;

use uuid::Uuid;

use aw_page::{ElementId, PointerSignal};

/// Fixed polling period for the timer queue.
pub const TICK_PERIOD_MS: u64 = 500;

/// Non-mutation page signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// In-page navigation on the target view: reset ad state, re-check.
    Navigated,
    /// The page (and with it the watcher's context) is going away.
    Unload,
}

/// Work items placed on the delayed-effect calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayedTask {
    /// One step of the synthesized pointer sequence.
    Pointer {
        target: ElementId,
        signal: PointerSignal,
    },
    /// Native activation fallback after the pointer sequence.
    Activate { target: ElementId },
    /// Post-dispatch confirmation: did the session end after we clicked?
    SkipRecheck { session: Uuid, target: ElementId },
    /// Close the debouncer's absorb window without writing.
    CounterRelease,
    /// Retry a counter write that previously hit the quota.
    CounterRetry,
}

/// The two named event queues.
#[derive(Debug, Default)]
pub struct EventQueues {
    mutations: VecDeque<ElementId>,
    signals: VecDeque<ControlSignal>,
}

impl EventQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_mutation(&mut self, target: ElementId) {
        self.mutations.push_back(target);
    }

    pub fn pop_mutation(&mut self) -> Option<ElementId> {
        self.mutations.pop_front()
    }

    pub fn push_signal(&mut self, signal: ControlSignal) {
        self.signals.push_back(signal);
    }

    pub fn pop_signal(&mut self) -> Option<ControlSignal> {
        self.signals.pop_front()
    }

    pub fn clear(&mut self) {
        self.mutations.clear();
        self.signals.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty() && self.signals.is_empty()
    }
}
