//! # Crashtap
//!
//! Passive observer for a remote multiplayer "crash" wagering game.
//! Taps the game's live push channel and reconstructs structured round
//! records from a stream of low-level protocol messages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         CRASHTAP                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  network/        - Wire boundary (non-deterministic input)   │
//! │  ├── protocol.rs - Typed event taxonomy (stage..crash)       │
//! │  ├── frame.rs    - Frame decoder, terminator handling        │
//! │  └── tap.rs      - WebSocket reader, receipt timestamping    │
//! │                                                              │
//! │  engine/         - Round reconstruction                      │
//! │  ├── round.rs    - The round record and its snapshots        │
//! │  ├── tracker.rs  - Single-slot lifecycle state machine       │
//! │  └── metrics.rs  - Finalization-time derived fields          │
//! │                                                              │
//! │  store.rs        - Append-only JSON-lines round log          │
//! │  hub.rs          - Observer callbacks (finalized / crash)    │
//! │  config.rs       - Engine configuration                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reconstruction Guarantees
//!
//! The wire protocol is externally defined and loosely documented, so the
//! engine is built around tolerance:
//! - Malformed or unknown frames are dropped, never fatal.
//! - Events for a round other than the in-flight one are discarded,
//!   never misattributed.
//! - A round superseded before its crash event is captured best-effort
//!   with a null outcome, distinguishable downstream.
//! - Every finalized round is appended to the log exactly once per
//!   finalize (the log itself does not deduplicate).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod hub;
pub mod network;
pub mod store;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::{Engine, EngineError, IngestOutcome, Round, RoundTracker, TrackerOutcome};
pub use hub::{ObservationHub, ObserverToken};
pub use network::{RawFrame, RoundId, decode_frame, DecodeError};
pub use store::{RoundLog, StoreError, HistorySummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
