//! Observation Hub
//!
//! Decouples the engine from its consumers (broadcast server, dashboard
//! feed). Observers register callbacks for "round finalized" and "crash
//! occurred"; registration hands back a token so long-running processes
//! can deregister instead of growing the observer tables forever.
//! Callbacks run synchronously on the event path and are expected to
//! return promptly or hand off internally.

use tracing::warn;
use uuid::Uuid;

use crate::engine::round::Round;

/// An observer callback. Errors are logged and isolated - a failing
/// observer never affects other observers, persistence, or future event
/// processing.
pub type RoundCallback = Box<dyn Fn(&Round) -> anyhow::Result<()> + Send + Sync>;

/// Which observer list a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObserverKind {
    Finalized,
    Crash,
}

/// Capability returned by registration; pass to
/// [`ObservationHub::deregister`] to remove the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverToken {
    kind: ObserverKind,
    id: Uuid,
}

struct Slot {
    id: Uuid,
    callback: RoundCallback,
}

/// Observer registry for round lifecycle notifications.
#[derive(Default)]
pub struct ObservationHub {
    finalized: Vec<Slot>,
    crash: Vec<Slot>,
}

impl ObservationHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer invoked with every finalized round, complete
    /// or not.
    pub fn on_finalized<F>(&mut self, callback: F) -> ObserverToken
    where
        F: Fn(&Round) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.finalized.push(Slot {
            id,
            callback: Box::new(callback),
        });
        ObserverToken {
            kind: ObserverKind::Finalized,
            id,
        }
    }

    /// Register an observer invoked only when a round finalizes with its
    /// crash multiplier set - the common "a crash happened" path.
    pub fn on_crash<F>(&mut self, callback: F) -> ObserverToken
    where
        F: Fn(&Round) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.crash.push(Slot {
            id,
            callback: Box::new(callback),
        });
        ObserverToken {
            kind: ObserverKind::Crash,
            id,
        }
    }

    /// Remove a previously registered observer. Returns `false` when the
    /// token no longer matches anything (already deregistered).
    pub fn deregister(&mut self, token: &ObserverToken) -> bool {
        let list = match token.kind {
            ObserverKind::Finalized => &mut self.finalized,
            ObserverKind::Crash => &mut self.crash,
        };
        let before = list.len();
        list.retain(|slot| slot.id != token.id);
        list.len() < before
    }

    /// Number of registered observers across both lists.
    pub fn observer_count(&self) -> usize {
        self.finalized.len() + self.crash.len()
    }

    /// Notify observers of a finalized round.
    ///
    /// Every finalized-observer fires; crash-observers additionally fire
    /// when the round carries an outcome. Failures are logged per
    /// observer and swallowed.
    pub fn notify(&self, round: &Round) {
        for slot in &self.finalized {
            if let Err(e) = (slot.callback)(round) {
                warn!(
                    round_id = round.round_id,
                    observer = %slot.id,
                    "finalized observer failed: {:#}",
                    e
                );
            }
        }

        if round.is_complete() {
            for slot in &self.crash {
                if let Err(e) = (slot.callback)(round) {
                    warn!(
                        round_id = round.round_id,
                        observer = %slot.id,
                        "crash observer failed: {:#}",
                        e
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::StageArgs;
    use chrono::Utc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn round(complete: bool) -> Round {
        let mut r = Round::staged(
            &StageArgs {
                round_id: 1,
                next_round_id: None,
                ts: None,
            },
            Utc::now(),
        );
        if complete {
            r.crash_multiplier = Some(2.0);
        }
        r
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Round) -> anyhow::Result<()>) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move |_: &Round| {
            inner.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_finalized_fires_for_incomplete_rounds() {
        let mut hub = ObservationHub::new();
        let (finalized, cb_f) = counter();
        let (crashed, cb_c) = counter();
        hub.on_finalized(cb_f);
        hub.on_crash(cb_c);

        hub.notify(&round(false));
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
        assert_eq!(crashed.load(Ordering::SeqCst), 0);

        hub.notify(&round(true));
        assert_eq!(finalized.load(Ordering::SeqCst), 2);
        assert_eq!(crashed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_multiple_observers_are_independent_slots() {
        let mut hub = ObservationHub::new();
        let (a, cb_a) = counter();
        let (b, cb_b) = counter();
        hub.on_finalized(cb_a);
        hub.on_finalized(cb_b);

        hub.notify(&round(true));
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_observer_is_isolated() {
        let mut hub = ObservationHub::new();
        let (count, cb) = counter();
        hub.on_finalized(|_| anyhow::bail!("observer exploded"));
        hub.on_finalized(cb);
        hub.on_crash(|_| anyhow::bail!("crash observer exploded"));

        // Neither failure propagates, and the healthy observer still runs.
        hub.notify(&round(true));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deregister() {
        let mut hub = ObservationHub::new();
        let (count, cb) = counter();
        let token = hub.on_finalized(cb);
        assert_eq!(hub.observer_count(), 1);

        assert!(hub.deregister(&token));
        assert_eq!(hub.observer_count(), 0);
        // Second deregistration is a no-op.
        assert!(!hub.deregister(&token));

        hub.notify(&round(true));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
