//! Ad lifecycle state machine.
//!
//! Two states, Idle and AdActive, driven solely by the classifier's
//! verdict. Clicking a control never closes a session; only the next
//! classification pass observing the absence of ad signals does.

use tracing::info;
use uuid::Uuid;

/// Per-session state. Owned exclusively by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdSession {
    pub id: Uuid,
    pub active: bool,
    /// At most one counter increment is claimed per session.
    pub counter_claimed: bool,
}

impl AdSession {
    fn idle() -> Self {
        Self {
            id: Uuid::new_v4(),
            active: false,
            counter_claimed: false,
        }
    }

    fn open() -> Self {
        Self {
            id: Uuid::new_v4(),
            active: true,
            counter_claimed: false,
        }
    }
}

/// Edge produced by one verdict observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    AdStarted,
    AdEnded,
}

/// The Idle/AdActive machine.
#[derive(Debug)]
pub struct Lifecycle {
    session: AdSession,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            session: AdSession::idle(),
        }
    }

    pub fn session(&self) -> &AdSession {
        &self.session
    }

    pub fn is_active(&self) -> bool {
        self.session.active
    }

    /// Feed one verdict; self-transitions are no-ops.
    pub fn observe(&mut self, verdict: bool) -> Transition {
        if verdict && !self.session.active {
            self.session = AdSession::open();
            info!(session = %self.session.id, "ad session started");
            Transition::AdStarted
        } else if !verdict && self.session.active {
            // The claim guard is left alone here: it can only flip to
            // true after this edge, via the post-dispatch re-check, and a
            // new session always opens with a cleared guard.
            self.session.active = false;
            info!(session = %self.session.id, "ad session ended");
            Transition::AdEnded
        } else {
            Transition::None
        }
    }

    /// Claim the counter for a session observed at dispatch time.
    /// Succeeds only if that same session has since gone inactive and is
    /// unclaimed; at most once per session.
    pub fn try_claim(&mut self, session: Uuid) -> bool {
        if self.session.id == session && !self.session.active && !self.session.counter_claimed {
            self.session.counter_claimed = true;
            true
        } else {
            false
        }
    }

    /// Forced reset (navigation, disable, teardown): back to a fresh
    /// idle session. Pending re-checks against the old id can no longer
    /// claim.
    pub fn reset(&mut self) {
        self.session = AdSession::idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let lifecycle = Lifecycle::new();
        assert!(!lifecycle.is_active());
        assert!(!lifecycle.session().counter_claimed);
    }

    #[test]
    fn test_edges_fire_only_on_verdict_flips() {
        let mut lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.observe(false), Transition::None);
        assert_eq!(lifecycle.observe(true), Transition::AdStarted);
        assert_eq!(lifecycle.observe(true), Transition::None);
        assert_eq!(lifecycle.observe(false), Transition::AdEnded);
        assert_eq!(lifecycle.observe(false), Transition::None);
    }

    #[test]
    fn test_no_two_consecutive_starts() {
        let mut lifecycle = Lifecycle::new();
        let mut transitions = Vec::new();
        for verdict in [true, true, false, true, false, false, true] {
            transitions.push(lifecycle.observe(verdict));
        }
        let mut last_edge = None;
        for t in transitions.into_iter().filter(|t| *t != Transition::None) {
            if t == Transition::AdStarted {
                assert_ne!(last_edge, Some(Transition::AdStarted));
            }
            last_edge = Some(t);
        }
    }

    #[test]
    fn test_claim_requires_ended_session_and_fires_once() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.observe(true);
        let session = lifecycle.session().id;

        // Still active: dismissal not confirmed yet.
        assert!(!lifecycle.try_claim(session));

        lifecycle.observe(false);
        assert!(lifecycle.try_claim(session));
        assert!(!lifecycle.try_claim(session), "second claim must be refused");
    }

    #[test]
    fn test_claim_against_stale_session_id_is_refused() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.observe(true);
        let old = lifecycle.session().id;
        lifecycle.observe(false);
        lifecycle.observe(true); // new session opened before the re-check fired
        assert!(!lifecycle.try_claim(old));
    }

    #[test]
    fn test_new_session_clears_claim_guard() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.observe(true);
        let first = lifecycle.session().id;
        lifecycle.observe(false);
        assert!(lifecycle.try_claim(first));

        lifecycle.observe(true);
        assert!(!lifecycle.session().counter_claimed);
        let second = lifecycle.session().id;
        lifecycle.observe(false);
        assert!(lifecycle.try_claim(second));
    }

    #[test]
    fn test_reset_blocks_pending_claims() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.observe(true);
        let session = lifecycle.session().id;
        lifecycle.reset();
        assert!(!lifecycle.is_active());
        assert!(!lifecycle.try_claim(session));
    }
}
