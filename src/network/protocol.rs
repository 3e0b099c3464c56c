//! Protocol Messages
//!
//! Typed view of the observed wire protocol. The remote game server pushes
//! hub invocations as JSON envelopes whose `target` names one of the round
//! lifecycle messages below; the `arguments` payload shapes are
//! externally-defined and loosely documented, so every best-effort field is
//! optional. Wire field names are camelCase.

use serde::{Serialize, Deserialize};

/// Round identifier assigned by the remote server.
///
/// Opaque: never interpreted beyond equality checks against the in-flight
/// round.
pub type RoundId = u64;

// =============================================================================
// OBSERVED MESSAGES
// =============================================================================

/// A decoded protocol event, one per inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    /// A new round has been staged on the server.
    Stage(StageArgs),

    /// The betting window for the staged round opened.
    Betting(BettingArgs),

    /// Running bet totals for the current round.
    Bets(BetsArgs),

    /// The multiplier run started.
    Start(StartArgs),

    /// Point-in-time cashout sample for the running round.
    Cashouts(CashoutsArgs),

    /// Point-in-time per-participant profit sample.
    Profits(ProfitsArgs),

    /// The round crashed; terminal event.
    Crash(CrashArgs),

    /// Historical backfill pushed on (re)connection. Informational only.
    Registration(RegistrationArgs),
}

impl ProtocolEvent {
    /// Wire target name for this event.
    pub fn target(&self) -> &'static str {
        match self {
            ProtocolEvent::Stage(_) => "stage",
            ProtocolEvent::Betting(_) => "betting",
            ProtocolEvent::Bets(_) => "bets",
            ProtocolEvent::Start(_) => "start",
            ProtocolEvent::Cashouts(_) => "cashouts",
            ProtocolEvent::Profits(_) => "profits",
            ProtocolEvent::Crash(_) => "crash",
            ProtocolEvent::Registration(_) => "registration",
        }
    }

    /// Round the event refers to, when it carries one.
    pub fn round_id(&self) -> Option<RoundId> {
        match self {
            ProtocolEvent::Stage(args) => Some(args.round_id),
            ProtocolEvent::Betting(args) => Some(args.round_id),
            ProtocolEvent::Bets(args) => Some(args.round_id),
            ProtocolEvent::Start(args) => Some(args.round_id),
            ProtocolEvent::Cashouts(args) => Some(args.round_id),
            ProtocolEvent::Profits(args) => Some(args.round_id),
            ProtocolEvent::Crash(args) => Some(args.round_id),
            ProtocolEvent::Registration(_) => None,
        }
    }
}

// =============================================================================
// ARGUMENT SHAPES
// =============================================================================

/// Arguments of a `stage` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageArgs {
    /// Identifier of the newly staged round.
    pub round_id: RoundId,
    /// Forward-looking hint at the next round's id. Best-effort.
    #[serde(default)]
    pub next_round_id: Option<RoundId>,
    /// Server-reported staging timestamp (epoch milliseconds).
    #[serde(default)]
    pub ts: Option<i64>,
}

/// Arguments of a `betting` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BettingArgs {
    /// Round the betting window belongs to.
    pub round_id: RoundId,
    /// Server-reported window-open timestamp (epoch milliseconds).
    #[serde(default)]
    pub ts: Option<i64>,
    /// Announced window length in milliseconds.
    #[serde(default)]
    pub duration_ms: Option<i64>,
}

/// Arguments of a `bets` invocation.
///
/// Each message carries the *running* totals, not a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetsArgs {
    /// Round the totals belong to.
    pub round_id: RoundId,
    /// Number of bets placed so far.
    pub count: u32,
    /// Total wagered so far, in currency units.
    pub total: f64,
}

/// Arguments of a `start` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartArgs {
    /// Round that started.
    pub round_id: RoundId,
    /// Server-reported start timestamp (epoch milliseconds).
    #[serde(default)]
    pub ts: Option<i64>,
}

/// Arguments of a `cashouts` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashoutsArgs {
    /// Round being sampled.
    pub round_id: RoundId,
    /// Elapsed time since the run started, in milliseconds.
    pub elapsed_ms: u64,
    /// Bets not yet settled at sample time.
    pub remaining: u32,
    /// Total bets the percentages are computed against.
    pub total: u32,
    /// Participants that cashed out since the previous sample.
    #[serde(default)]
    pub entries: Vec<CashoutEntry>,
}

/// One participant's cashout within a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashoutEntry {
    /// Participant identifier as reported by the server.
    pub player: String,
    /// Payout in currency units.
    pub payout: f64,
    /// Multiplier at which the participant exited.
    pub multiplier: f64,
}

/// Arguments of a `profits` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitsArgs {
    /// Round being sampled.
    pub round_id: RoundId,
    /// Elapsed time since the run started, in milliseconds.
    pub elapsed_ms: u64,
    /// Per-participant profit values at sample time.
    #[serde(default)]
    pub entries: Vec<ProfitEntry>,
}

/// One participant's profit within a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitEntry {
    /// Participant identifier as reported by the server.
    pub player: String,
    /// Profit (may be negative) in currency units.
    pub profit: f64,
}

/// Arguments of a `crash` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashArgs {
    /// Round that crashed.
    pub round_id: RoundId,
    /// Server-reported crash timestamp (epoch milliseconds).
    #[serde(default)]
    pub ts: Option<i64>,
    /// Terminal payout multiplier.
    pub multiplier: f64,
}

/// Arguments of a `registration` invocation (historical backfill).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationArgs {
    /// Previously completed rounds the server replays on connect.
    #[serde(default)]
    pub rounds: Vec<RegisteredRound>,
}

/// A backfilled round summary inside a `registration` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredRound {
    /// Identifier of the historical round.
    pub round_id: RoundId,
    /// Its terminal multiplier, when the server includes one.
    #[serde(default)]
    pub multiplier: Option<f64>,
}
