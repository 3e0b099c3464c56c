//! Frame Decoding
//!
//! Turns one raw transport payload into a typed [`ProtocolEvent`].
//! The hub protocol terminates every frame with an ASCII record separator
//! and occasionally interleaves control frames (pings, handshake acks) that
//! carry no invocation; both are handled here so the caller can skip bad
//! frames and keep reading. Decoding is pure and stateless.

use serde::Deserialize;

use crate::network::protocol::{
    ProtocolEvent, StageArgs, BettingArgs, BetsArgs, StartArgs,
    CashoutsArgs, ProfitsArgs, CrashArgs, RegistrationArgs,
};

/// Record separator the hub protocol appends to every frame.
pub const FRAME_TERMINATOR: char = '\u{1e}';

/// Frame decode failures.
///
/// All variants are recoverable: the payload is dropped and the stream
/// continues. None of them mutate engine state.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload was empty after stripping terminators.
    #[error("empty frame")]
    Empty,

    /// Payload was not valid JSON.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Valid JSON but no `target` field (control frame).
    #[error("frame carries no target")]
    MissingTarget,

    /// Invocation without an arguments payload.
    #[error("target `{0}` carries no arguments")]
    MissingArguments(String),

    /// Target name outside the observed taxonomy.
    #[error("unrecognized target `{0}`")]
    UnknownTarget(String),

    /// Known target whose arguments did not match the expected shape.
    #[error("bad arguments for `{target}`: {source}")]
    BadArguments {
        /// Target whose arguments failed to deserialize.
        target: &'static str,
        /// Underlying deserialization error.
        source: serde_json::Error,
    },
}

/// Raw hub envelope: `{"target": "...", "arguments": [ ... ]}`.
///
/// The `type` discriminator some hub implementations include is ignored;
/// only the invocation shape matters to the observer.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<serde_json::Value>,
}

/// Decode one raw transport payload into a typed event.
///
/// Strips trailing record separators and whitespace, parses the JSON
/// envelope, and deserializes the first argument into the target-specific
/// shape. Returns a [`DecodeError`] rather than panicking on anything
/// unexpected.
pub fn decode_frame(payload: &str) -> Result<ProtocolEvent, DecodeError> {
    let trimmed = payload
        .trim_matches(|c: char| c == FRAME_TERMINATOR || c.is_whitespace());
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    let envelope: Envelope = serde_json::from_str(trimmed)?;
    let target = match envelope.target {
        Some(t) if !t.is_empty() => t,
        _ => return Err(DecodeError::MissingTarget),
    };

    let args = envelope
        .arguments
        .into_iter()
        .next()
        .ok_or_else(|| DecodeError::MissingArguments(target.clone()))?;

    match target.as_str() {
        "stage" => decode_args::<StageArgs>("stage", args).map(ProtocolEvent::Stage),
        "betting" => decode_args::<BettingArgs>("betting", args).map(ProtocolEvent::Betting),
        "bets" => decode_args::<BetsArgs>("bets", args).map(ProtocolEvent::Bets),
        "start" => decode_args::<StartArgs>("start", args).map(ProtocolEvent::Start),
        "cashouts" => decode_args::<CashoutsArgs>("cashouts", args).map(ProtocolEvent::Cashouts),
        "profits" => decode_args::<ProfitsArgs>("profits", args).map(ProtocolEvent::Profits),
        "crash" => decode_args::<CrashArgs>("crash", args).map(ProtocolEvent::Crash),
        "registration" => {
            decode_args::<RegistrationArgs>("registration", args).map(ProtocolEvent::Registration)
        }
        _ => Err(DecodeError::UnknownTarget(target)),
    }
}

fn decode_args<T: serde::de::DeserializeOwned>(
    target: &'static str,
    args: serde_json::Value,
) -> Result<T, DecodeError> {
    serde_json::from_value(args).map_err(|source| DecodeError::BadArguments { target, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_crash_frame() {
        let payload = "{\"type\":1,\"target\":\"crash\",\
            \"arguments\":[{\"roundId\":7,\"ts\":1700000005000,\"multiplier\":2.5}]}\u{1e}";
        let event = decode_frame(payload).unwrap();
        match event {
            ProtocolEvent::Crash(args) => {
                assert_eq!(args.round_id, 7);
                assert_eq!(args.multiplier, 2.5);
            }
            other => panic!("wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_terminator_stripped() {
        let payload =
            "{\"target\":\"start\",\"arguments\":[{\"roundId\":1}]}\u{1e}\u{1e}\n";
        let event = decode_frame(payload).unwrap();
        assert_eq!(event.target(), "start");
    }

    #[test]
    fn test_empty_frame() {
        assert!(matches!(decode_frame("\u{1e}"), Err(DecodeError::Empty)));
        assert!(matches!(decode_frame("  "), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_malformed_json() {
        let result = decode_frame("not json at all\u{1e}");
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_control_frame_has_no_target() {
        // Hub keepalive ping: valid JSON, not an invocation.
        let result = decode_frame("{\"type\":6}\u{1e}");
        assert!(matches!(result, Err(DecodeError::MissingTarget)));
    }

    #[test]
    fn test_unknown_target_ignored() {
        let payload = "{\"target\":\"leaderboard\",\"arguments\":[{}]}\u{1e}";
        match decode_frame(payload) {
            Err(DecodeError::UnknownTarget(t)) => assert_eq!(t, "leaderboard"),
            other => panic!("expected unknown target, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_arguments() {
        let payload = "{\"target\":\"crash\",\"arguments\":[]}";
        assert!(matches!(
            decode_frame(payload),
            Err(DecodeError::MissingArguments(_))
        ));
    }

    #[test]
    fn test_bad_argument_shape() {
        // `multiplier` is mandatory on crash frames.
        let payload = "{\"target\":\"crash\",\"arguments\":[{\"roundId\":7}]}";
        match decode_frame(payload) {
            Err(DecodeError::BadArguments { target, .. }) => assert_eq!(target, "crash"),
            other => panic!("expected bad arguments, got {:?}", other),
        }
    }

    #[test]
    fn test_registration_backfill() {
        let payload = "{\"target\":\"registration\",\"arguments\":[{\
            \"rounds\":[{\"roundId\":1,\"multiplier\":1.73},{\"roundId\":2}]}]}\u{1e}";
        match decode_frame(payload).unwrap() {
            ProtocolEvent::Registration(args) => {
                assert_eq!(args.rounds.len(), 2);
                assert_eq!(args.rounds[0].multiplier, Some(1.73));
                assert_eq!(args.rounds[1].multiplier, None);
            }
            other => panic!("wrong event: {:?}", other),
        }
    }
}
