//! Derived Metrics
//!
//! Finalization-time derivation of round-level fields. Pure: reads and
//! writes only the round passed in. A derived field is populated exactly
//! when its full basis was observed - never computed from a partial basis.

use crate::engine::round::Round;

/// Populate the derived fields of a round whose outcome is settled.
///
/// - `duration_ms = crash_ts - start_ts`, requires both endpoints.
/// - `latency_ms = crash_recv - crash_ts`; receipt time is locally
///   authoritative, so this only needs the server's crash timestamp.
/// - `final_remaining` / `final_pct_remaining` copy the last cashout
///   snapshot when the series is non-empty.
pub fn derive_metrics(round: &mut Round) {
    round.duration_ms = match (round.start_ts, round.crash_ts) {
        (Some(start), Some(crash)) => Some(crash - start),
        _ => None,
    };

    round.latency_ms = match (round.crash_ts, round.crash_recv) {
        (Some(crash), Some(recv)) => Some(recv.timestamp_millis() - crash),
        _ => None,
    };

    if let Some(last) = round.cashout_snapshots.last() {
        round.final_remaining = Some(last.remaining);
        round.final_pct_remaining = last.pct_remaining;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::round::CashoutSnapshot;
    use crate::network::protocol::StageArgs;
    use chrono::{TimeZone, Utc};

    fn base_round() -> Round {
        Round::staged(
            &StageArgs {
                round_id: 1,
                next_round_id: None,
                ts: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_duration_needs_both_endpoints() {
        let mut round = base_round();
        round.crash_ts = Some(10_000);
        derive_metrics(&mut round);
        assert!(round.duration_ms.is_none());

        round.start_ts = Some(4_000);
        derive_metrics(&mut round);
        assert_eq!(round.duration_ms, Some(6_000));
    }

    #[test]
    fn test_latency_from_receipt_time() {
        let mut round = base_round();
        round.crash_ts = Some(1_700_000_000_000);
        round.crash_recv = Some(Utc.timestamp_millis_opt(1_700_000_000_250).unwrap());
        derive_metrics(&mut round);
        assert_eq!(round.latency_ms, Some(250));
    }

    #[test]
    fn test_latency_absent_without_server_ts() {
        let mut round = base_round();
        round.crash_recv = Some(Utc::now());
        derive_metrics(&mut round);
        assert!(round.latency_ms.is_none());
    }

    #[test]
    fn test_final_counts_copy_last_snapshot() {
        let mut round = base_round();
        round.cashout_snapshots.push(CashoutSnapshot {
            elapsed_ms: 1_000,
            remaining: 9,
            settled: 1,
            pct_remaining: Some(90.0),
            entries: vec![],
        });
        round.cashout_snapshots.push(CashoutSnapshot {
            elapsed_ms: 5_000,
            remaining: 3,
            settled: 7,
            pct_remaining: Some(30.0),
            entries: vec![],
        });
        derive_metrics(&mut round);
        assert_eq!(round.final_remaining, Some(3));
        assert_eq!(round.final_pct_remaining, Some(30.0));
    }

    #[test]
    fn test_no_snapshots_leaves_finals_absent() {
        let mut round = base_round();
        derive_metrics(&mut round);
        assert!(round.final_remaining.is_none());
        assert!(round.final_pct_remaining.is_none());
    }
}
