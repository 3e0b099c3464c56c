//! Round Reconstruction Engine
//!
//! The orchestrator behind the observer: one [`Engine::ingest`] call per
//! raw frame runs decode -> track -> (on finalize) persist + notify.
//! Events are processed one at a time in receipt order on a single
//! execution context, so the in-flight round needs no locking.
//!
//! ## Module Structure
//!
//! - `round`: the reconstructed round record and its snapshots
//! - `tracker`: the single-slot round lifecycle state machine
//! - `metrics`: finalization-time derivation of timing/participation fields

pub mod round;
pub mod tracker;
pub mod metrics;

pub use round::{Round, CashoutSnapshot, ProfitSnapshot};
pub use tracker::{RoundTracker, RoundPhase, TrackerOutcome, IgnoreReason};
pub use metrics::derive_metrics;

use tracing::{debug, error};

use crate::config::EngineConfig;
use crate::hub::ObservationHub;
use crate::network::RawFrame;
use crate::network::frame::decode_frame;
use crate::store::{RoundLog, StoreError};

/// Engine errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The round store failed; on the ingest path this means a finalized
    /// round may not have been persisted.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// What one ingested frame did to the engine.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Frame dropped: undecodable payload, unknown target, foreign round
    /// id, or backfill. Engine state is untouched.
    Skipped,
    /// The in-flight round was created or mutated.
    Applied,
    /// A round left the pipeline - complete (crash observed) or
    /// incomplete (superseded by a new stage). Check
    /// [`Round::is_complete`] to tell the two apart.
    Finalized {
        /// The round that was handed to the store and the hub.
        round: Box<Round>,
    },
}

/// The round-reconstruction engine.
///
/// Owns the tracker, the store, and the hub. Callers hold the instance
/// and feed it frames; there are no process-wide globals.
pub struct Engine {
    config: EngineConfig,
    tracker: RoundTracker,
    store: RoundLog,
    hub: ObservationHub,
}

impl Engine {
    /// Build an engine from configuration.
    ///
    /// Opening the store is the only fatal step: without a writable round
    /// log the observer has no reason to run.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let store = RoundLog::open(&config.data_dir, &config.log_file)?;
        Ok(Self {
            config,
            tracker: RoundTracker::new(),
            store,
            hub: ObservationHub::new(),
        })
    }

    /// Ingest one raw frame.
    ///
    /// Per-frame problems (decode failures, stale round ids) are local:
    /// they log, skip, and return `Ok`. A store failure on the finalize
    /// path is returned as an error *after* observers were notified; the
    /// round is not re-queued, so the caller should log loudly - that one
    /// record may be lost. The engine stays usable either way.
    pub fn ingest(&mut self, frame: &RawFrame) -> Result<IngestOutcome, EngineError> {
        let event = match decode_frame(&frame.payload) {
            Ok(event) => event,
            Err(e) => {
                debug!("dropping frame: {}", e);
                return Ok(IngestOutcome::Skipped);
            }
        };

        match self.tracker.apply(&event, frame.received_at) {
            TrackerOutcome::Ignored(_) => Ok(IngestOutcome::Skipped),
            TrackerOutcome::Staged | TrackerOutcome::Updated => Ok(IngestOutcome::Applied),
            TrackerOutcome::Superseded { incomplete } => self.finalize(incomplete),
            TrackerOutcome::Finalized { round } => self.finalize(round),
        }
    }

    /// Persist and broadcast a round leaving the pipeline.
    fn finalize(&mut self, round: Round) -> Result<IngestOutcome, EngineError> {
        let persist = round.is_complete() || self.config.persist_incomplete;
        let append_err = if persist {
            self.store.append(&round).err()
        } else {
            debug!(round_id = round.round_id, "incomplete round not persisted");
            None
        };

        // Observers run regardless of the append result; a storage
        // problem must not silence the live feed.
        self.hub.notify(&round);

        if let Some(e) = append_err {
            error!(
                round_id = round.round_id,
                "failed to persist round, record may be lost: {}", e
            );
            return Err(EngineError::Store(e));
        }

        Ok(IngestOutcome::Finalized {
            round: Box::new(round),
        })
    }

    /// The observer registry, for registering/deregistering callbacks.
    pub fn hub_mut(&mut self) -> &mut ObservationHub {
        &mut self.hub
    }

    /// The round store, for offline queries (`load_all`, `summarize`).
    pub fn store(&self) -> &RoundLog {
        &self.store
    }

    /// The lifecycle tracker (read-only view).
    pub fn tracker(&self) -> &RoundTracker {
        &self.tracker
    }
}
