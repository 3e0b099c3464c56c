//! Network Layer
//!
//! Everything that touches the wire: the typed protocol taxonomy, the frame
//! decoder, and the WebSocket tap that feeds raw payloads into the engine.
//! The engine itself never sees a socket - only [`RawFrame`] values.

use chrono::{DateTime, Utc};

pub mod frame;
pub mod protocol;
pub mod tap;

pub use frame::{decode_frame, DecodeError, FRAME_TERMINATOR};
pub use protocol::{ProtocolEvent, RoundId};
pub use tap::{run_tap, TapConfig, TapError};

/// One raw transport payload, tagged with its local receipt time.
///
/// Receipt time is captured as close to the socket read as possible; it is
/// the locally authoritative half of every (server ts, local recv) timing
/// pair the engine records.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Opaque transport-layer text payload.
    pub payload: String,
    /// Local receipt timestamp.
    pub received_at: DateTime<Utc>,
}

impl RawFrame {
    /// Tag a payload with the current time.
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }

    /// Tag a payload with an explicit receipt time (replays, tests).
    pub fn at(payload: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            payload: payload.into(),
            received_at,
        }
    }
}
