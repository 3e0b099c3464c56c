//! Round Records
//!
//! The central entity reconstructed from the wire: one play of the game,
//! from stage to crash. Every best-effort field is an explicit `Option` -
//! a field is present exactly when its basis was observed, never a
//! sentinel value. Server timestamps and local receipt times are both
//! retained because clock skew and delivery latency are themselves
//! tracked metrics.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::network::protocol::{RoundId, StageArgs};

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// One participant's cashout inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cashout {
    /// Participant identifier as reported by the server.
    pub player: String,
    /// Payout in currency units.
    pub payout: f64,
    /// Multiplier at which the participant exited.
    pub multiplier: f64,
}

/// Point-in-time sample of cashout progress for the running round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashoutSnapshot {
    /// Elapsed time since the run started, in milliseconds.
    pub elapsed_ms: u64,
    /// Bets not yet settled at sample time.
    pub remaining: u32,
    /// Bets settled by sample time.
    pub settled: u32,
    /// `remaining / total * 100`; absent when the sample's total was zero.
    pub pct_remaining: Option<f64>,
    /// Participants that cashed out since the previous sample.
    pub entries: Vec<Cashout>,
}

/// One participant's profit inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profit {
    /// Participant identifier as reported by the server.
    pub player: String,
    /// Profit (may be negative) in currency units.
    pub profit: f64,
}

/// Point-in-time sample of per-participant profits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitSnapshot {
    /// Elapsed time since the run started, in milliseconds.
    pub elapsed_ms: u64,
    /// Per-participant profit values at sample time.
    pub entries: Vec<Profit>,
}

// =============================================================================
// ROUND
// =============================================================================

/// A reconstructed round, persisted as one JSON line once finalized.
///
/// Snapshot ordering reflects *receipt* order - server-reported timestamps
/// inside snapshots can be noisy and are never used to reorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Server-assigned round identifier.
    pub round_id: RoundId,
    /// Server's hint at the next round id. Best-effort.
    pub next_round_id: Option<RoundId>,

    /// Server-reported staging timestamp (epoch milliseconds).
    pub stage_ts: Option<i64>,
    /// Local receipt time of the stage event.
    pub stage_recv: Option<DateTime<Utc>>,

    /// Server-reported betting-window-open timestamp (epoch milliseconds).
    pub betting_ts: Option<i64>,
    /// Announced betting window length in milliseconds.
    pub betting_duration_ms: Option<i64>,

    /// Server-reported start timestamp (epoch milliseconds).
    pub start_ts: Option<i64>,
    /// Local receipt time of the start event.
    pub start_recv: Option<DateTime<Utc>>,

    /// Server-reported crash timestamp (epoch milliseconds).
    pub crash_ts: Option<i64>,
    /// Local receipt time of the crash event.
    pub crash_recv: Option<DateTime<Utc>>,
    /// Terminal payout multiplier. `None` marks a round that never reached
    /// its crash event (superseded, best-effort capture).
    pub crash_multiplier: Option<f64>,

    /// Number of bets placed (running total from the last `bets` message).
    pub total_bets: Option<u32>,
    /// Total wagered in currency units (running total, same source).
    pub total_wagered: Option<f64>,

    /// Cashout samples in receipt order.
    pub cashout_snapshots: Vec<CashoutSnapshot>,
    /// Profit samples in receipt order.
    pub profit_snapshots: Vec<ProfitSnapshot>,

    /// `crash_ts - start_ts`. Derived at finalization; absent unless both
    /// endpoints were observed.
    pub duration_ms: Option<i64>,
    /// `crash_recv - crash_ts`. Derived at finalization.
    pub latency_ms: Option<i64>,
    /// `remaining` of the last cashout snapshot. Derived at finalization.
    pub final_remaining: Option<u32>,
    /// `pct_remaining` of the last cashout snapshot. Derived at finalization.
    pub final_pct_remaining: Option<f64>,
}

impl Round {
    /// Allocate a fresh round from its staging event.
    pub fn staged(args: &StageArgs, recv: DateTime<Utc>) -> Self {
        Self {
            round_id: args.round_id,
            next_round_id: args.next_round_id,
            stage_ts: args.ts,
            stage_recv: Some(recv),
            betting_ts: None,
            betting_duration_ms: None,
            start_ts: None,
            start_recv: None,
            crash_ts: None,
            crash_recv: None,
            crash_multiplier: None,
            total_bets: None,
            total_wagered: None,
            cashout_snapshots: Vec::new(),
            profit_snapshots: Vec::new(),
            duration_ms: None,
            latency_ms: None,
            final_remaining: None,
            final_pct_remaining: None,
        }
    }

    /// Whether the round reached its terminal crash event.
    pub fn is_complete(&self) -> bool {
        self.crash_multiplier.is_some()
    }

    /// Last cashout sample, if any were observed.
    pub fn last_cashout(&self) -> Option<&CashoutSnapshot> {
        self.cashout_snapshots.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_args(id: RoundId) -> StageArgs {
        StageArgs {
            round_id: id,
            next_round_id: Some(id + 1),
            ts: Some(1_700_000_000_000),
        }
    }

    #[test]
    fn test_staged_round_is_incomplete() {
        let round = Round::staged(&stage_args(5), Utc::now());
        assert_eq!(round.round_id, 5);
        assert_eq!(round.next_round_id, Some(6));
        assert!(!round.is_complete());
        assert!(round.stage_recv.is_some());
        assert!(round.cashout_snapshots.is_empty());
    }

    #[test]
    fn test_round_json_roundtrip() {
        let mut round = Round::staged(&stage_args(5), Utc::now());
        round.crash_multiplier = Some(3.25);
        round.cashout_snapshots.push(CashoutSnapshot {
            elapsed_ms: 4_000,
            remaining: 2,
            settled: 8,
            pct_remaining: Some(20.0),
            entries: vec![Cashout {
                player: "p9".to_string(),
                payout: 42.0,
                multiplier: 2.1,
            }],
        });

        let json = serde_json::to_string(&round).unwrap();
        let parsed: Round = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, round);
    }

    #[test]
    fn test_absent_fields_stay_absent_through_serde() {
        let round = Round::staged(&stage_args(1), Utc::now());
        let json = serde_json::to_string(&round).unwrap();
        let parsed: Round = serde_json::from_str(&json).unwrap();
        assert!(parsed.duration_ms.is_none());
        assert!(parsed.crash_multiplier.is_none());
        assert!(parsed.total_bets.is_none());
    }
}
