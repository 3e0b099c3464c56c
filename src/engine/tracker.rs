//! Round Lifecycle Tracking
//!
//! Owns the single in-flight round and applies typed protocol events to
//! it. The wire is loosely documented and events can be dropped, repeated
//! across reconnects, or refer to rounds other than the current one, so
//! every round-scoped transition is guarded by a round-id match: an event
//! for a foreign round is a no-op, never misattributed.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::engine::metrics::derive_metrics;
use crate::engine::round::{CashoutSnapshot, Cashout, ProfitSnapshot, Profit, Round};
use crate::network::protocol::{
    ProtocolEvent, RoundId, BettingArgs, BetsArgs, StartArgs,
    CashoutsArgs, ProfitsArgs, CrashArgs,
};

// =============================================================================
// PHASES & OUTCOMES
// =============================================================================

/// Lifecycle phase of the in-flight round.
///
/// `Idle` is implicit: it is the tracker's slot being empty, both before
/// the first round and after every finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Announced by the server, betting not yet open.
    Staged,
    /// Betting window open.
    Betting,
    /// Multiplier running; snapshots accumulate.
    Started,
}

/// Why an event was dropped without touching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Event's round id does not match the in-flight round.
    ForeignRound {
        /// Round id the event carried.
        event_round: RoundId,
    },
    /// Round-scoped event arrived while no round was in flight.
    NoRoundInFlight,
    /// Historical backfill; informational, never applied to live state.
    Backfill,
}

/// Result of applying one event.
#[derive(Debug)]
pub enum TrackerOutcome {
    /// Event dropped; state untouched.
    Ignored(IgnoreReason),
    /// A fresh round was staged; nothing was in flight.
    Staged,
    /// A fresh round was staged, superseding an unfinished one. The
    /// superseded round is finalized *without* an outcome and without
    /// derived metrics.
    Superseded {
        /// The round that never reached its crash event.
        incomplete: Round,
    },
    /// The in-flight round mutated.
    Updated,
    /// Crash observed: outcome set, metrics derived, slot cleared.
    Finalized {
        /// The completed round, ready for persistence and notification.
        round: Round,
    },
}

// =============================================================================
// TRACKER
// =============================================================================

/// A round under reconstruction plus its lifecycle phase.
#[derive(Debug)]
struct LiveRound {
    round: Round,
    phase: RoundPhase,
}

/// The round state machine: at most one round in flight at any time.
///
/// Not a process-wide global - callers hold the instance and feed it one
/// event at a time, in receipt order.
#[derive(Debug, Default)]
pub struct RoundTracker {
    current: Option<LiveRound>,
}

impl RoundTracker {
    /// Create an idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the in-flight round, if any.
    pub fn current_round_id(&self) -> Option<RoundId> {
        self.current.as_ref().map(|live| live.round.round_id)
    }

    /// Phase of the in-flight round, if any.
    pub fn current_phase(&self) -> Option<RoundPhase> {
        self.current.as_ref().map(|live| live.phase)
    }

    /// Whether a round is currently being reconstructed.
    pub fn in_flight(&self) -> bool {
        self.current.is_some()
    }

    /// Apply one decoded event received at `recv`.
    pub fn apply(&mut self, event: &ProtocolEvent, recv: DateTime<Utc>) -> TrackerOutcome {
        match event {
            ProtocolEvent::Stage(args) => {
                let superseded = self.current.take();
                let round = Round::staged(args, recv);
                info!(round_id = round.round_id, "round staged");
                self.current = Some(LiveRound {
                    round,
                    phase: RoundPhase::Staged,
                });

                match superseded {
                    Some(live) => {
                        info!(
                            round_id = live.round.round_id,
                            "superseded before crash; finalizing incomplete"
                        );
                        TrackerOutcome::Superseded {
                            incomplete: live.round,
                        }
                    }
                    None => TrackerOutcome::Staged,
                }
            }

            ProtocolEvent::Betting(args) => self.with_current(args.round_id, |live| {
                apply_betting(live, args);
            }),

            ProtocolEvent::Bets(args) => self.with_current(args.round_id, |live| {
                apply_bets(live, args);
            }),

            ProtocolEvent::Start(args) => self.with_current(args.round_id, |live| {
                apply_start(live, args, recv);
            }),

            ProtocolEvent::Cashouts(args) => self.with_current(args.round_id, |live| {
                apply_cashouts(live, args);
            }),

            ProtocolEvent::Profits(args) => self.with_current(args.round_id, |live| {
                apply_profits(live, args);
            }),

            ProtocolEvent::Crash(args) => self.apply_crash(args, recv),

            ProtocolEvent::Registration(args) => {
                debug!(rounds = args.rounds.len(), "historical backfill noted");
                TrackerOutcome::Ignored(IgnoreReason::Backfill)
            }
        }
    }

    /// Run a mutation against the in-flight round iff the id matches.
    fn with_current<F>(&mut self, event_round: RoundId, mutate: F) -> TrackerOutcome
    where
        F: FnOnce(&mut LiveRound),
    {
        match self.current.as_mut() {
            None => {
                debug!(event_round, "dropping event: no round in flight");
                TrackerOutcome::Ignored(IgnoreReason::NoRoundInFlight)
            }
            Some(live) if live.round.round_id != event_round => {
                debug!(
                    event_round,
                    current = live.round.round_id,
                    "dropping event: foreign round id"
                );
                TrackerOutcome::Ignored(IgnoreReason::ForeignRound { event_round })
            }
            Some(live) => {
                mutate(live);
                TrackerOutcome::Updated
            }
        }
    }

    fn apply_crash(&mut self, args: &CrashArgs, recv: DateTime<Utc>) -> TrackerOutcome {
        match self.current.take() {
            None => {
                debug!(event_round = args.round_id, "crash with no round in flight");
                TrackerOutcome::Ignored(IgnoreReason::NoRoundInFlight)
            }
            Some(live) if live.round.round_id != args.round_id => {
                debug!(
                    event_round = args.round_id,
                    current = live.round.round_id,
                    "dropping crash: foreign round id"
                );
                self.current = Some(live);
                TrackerOutcome::Ignored(IgnoreReason::ForeignRound {
                    event_round: args.round_id,
                })
            }
            Some(live) => {
                // The multiplier is set exactly once; the round is
                // immutable from here on and leaves the slot.
                let mut round = live.round;
                round.crash_ts = args.ts;
                round.crash_recv = Some(recv);
                round.crash_multiplier = Some(args.multiplier);
                derive_metrics(&mut round);

                info!(
                    round_id = round.round_id,
                    multiplier = args.multiplier,
                    "round crashed"
                );
                TrackerOutcome::Finalized { round }
            }
        }
    }
}

// =============================================================================
// TRANSITIONS
// =============================================================================

fn apply_betting(live: &mut LiveRound, args: &BettingArgs) {
    live.round.betting_ts = args.ts;
    live.round.betting_duration_ms = args.duration_ms;
    live.phase = RoundPhase::Betting;
}

fn apply_bets(live: &mut LiveRound, args: &BetsArgs) {
    // Running totals: replace, never accumulate.
    live.round.total_bets = Some(args.count);
    live.round.total_wagered = Some(args.total);
}

fn apply_start(live: &mut LiveRound, args: &StartArgs, recv: DateTime<Utc>) {
    live.round.start_ts = args.ts;
    live.round.start_recv = Some(recv);
    live.phase = RoundPhase::Started;
}

fn apply_cashouts(live: &mut LiveRound, args: &CashoutsArgs) {
    let pct_remaining = if args.total > 0 {
        Some(f64::from(args.remaining) / f64::from(args.total) * 100.0)
    } else {
        None
    };

    live.round.cashout_snapshots.push(CashoutSnapshot {
        elapsed_ms: args.elapsed_ms,
        remaining: args.remaining,
        settled: args.total.saturating_sub(args.remaining),
        pct_remaining,
        entries: args
            .entries
            .iter()
            .map(|e| Cashout {
                player: e.player.clone(),
                payout: e.payout,
                multiplier: e.multiplier,
            })
            .collect(),
    });
}

fn apply_profits(live: &mut LiveRound, args: &ProfitsArgs) {
    live.round.profit_snapshots.push(ProfitSnapshot {
        elapsed_ms: args.elapsed_ms,
        entries: args
            .entries
            .iter()
            .map(|e| Profit {
                player: e.player.clone(),
                profit: e.profit,
            })
            .collect(),
    });
}
