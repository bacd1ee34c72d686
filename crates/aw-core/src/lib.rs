//! adwatch core engine.
//!
//! The in-page watcher: a confidence classifier over page-structure
//! signals, an ad lifecycle state machine driven solely by its verdict, a
//! bounded-retry skip-control automator, idempotent mute/blur appliers, a
//! debounced counter protocol, and the context guard that forces teardown
//! on unrecoverable persistence failures. Everything runs on one
//! cooperative dispatcher; see [`watcher::Watcher::pump`] for the
//! ordering invariant.

pub mod automator;
pub mod classify;
pub mod clock;
pub mod coordinator;
pub mod counter;
pub mod events;
pub mod features;
pub mod guard;
pub mod lifecycle;
pub mod replay;
pub mod watcher;

pub use automator::{Automator, NotReady, ScanReport, MAX_ATTEMPTS};
pub use classify::{classify, Classification, Signal, SCORE_THRESHOLD};
pub use clock::{Clock, ManualClock, Scheduler, SystemClock};
pub use coordinator::{Coordinator, Request, Response};
pub use counter::{ClaimDecision, CounterDebouncer, MIN_WRITE_INTERVAL_MS};
pub use events::{ControlSignal, DelayedTask, EventQueues, TICK_PERIOD_MS};
pub use features::{BlurApplier, MuteApplier, RestoreSnapshot};
pub use guard::{ContextGuard, FailureDisposition};
pub use lifecycle::{AdSession, Lifecycle, Transition};
pub use replay::{ReplayReport, Scenario};
pub use watcher::Watcher;
