//! Round Store
//!
//! Durable, append-only JSON-lines log of finalized rounds. One JSON
//! object per line, written sequentially and flushed per append; the file
//! is opened once for the process lifetime and only ever appended to, so
//! single-writer discipline is enough. Reload tolerates corrupt lines
//! (a torn write from a crash, manual edits) by skipping them.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::engine::round::Round;

/// Multiplier at or above which a round counts as a high crash.
pub const HIGH_CRASH_THRESHOLD: f64 = 10.0;

/// Multiplier below which a round counts as a low crash.
pub const LOW_CRASH_THRESHOLD: f64 = 2.0;

/// The protocol's lower bound for a crash multiplier. Persisted values
/// below this are treated as invalid and excluded from multiplier stats.
const MIN_VALID_MULTIPLIER: f64 = 1.0;

/// Store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure (create dir, open, write, read).
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A round failed to serialize for appending.
    #[error("failed to serialize round: {0}")]
    Serialize(#[from] serde_json::Error),
}

// =============================================================================
// ROUND LOG
// =============================================================================

/// Append-only log of finalized rounds.
pub struct RoundLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RoundLog {
    /// Open (creating as needed) the round log at `dir/file_name`.
    ///
    /// This is the only fatal point of the persistence layer: if the data
    /// directory cannot be created or the log cannot be opened, the
    /// process has nowhere to put its records and should not start.
    pub fn open(dir: &Path, file_name: &str) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(path = %path.display(), "round log open");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append one finalized round as a JSON line.
    ///
    /// Appending the same round twice yields two entries - the log is not
    /// deduplicating.
    pub fn append(&mut self, round: &Round) -> Result<(), StoreError> {
        let line = serde_json::to_string(round)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Reload the full persisted history, in append order.
    ///
    /// Lines that fail to deserialize are logged and skipped; corruption
    /// never aborts a reload.
    pub fn load_all(&self) -> Result<Vec<Round>, StoreError> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut rounds = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Round>(&line) {
                Ok(round) => rounds.push(round),
                Err(e) => {
                    warn!(line = idx + 1, "skipping corrupt log line: {}", e);
                }
            }
        }
        Ok(rounds)
    }

    /// Aggregate statistics over the full persisted history.
    pub fn summarize(&self) -> Result<HistorySummary, StoreError> {
        Ok(HistorySummary::from_rounds(&self.load_all()?))
    }
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Aggregate view of the persisted history.
///
/// Each mean is computed only over records where the relevant field is
/// present and valid; partial records still count toward `rounds`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    /// Total persisted records, complete or not.
    pub rounds: usize,
    /// Mean crash multiplier over valid outcomes.
    pub mean_multiplier: Option<f64>,
    /// Mean round duration in milliseconds.
    pub mean_duration_ms: Option<f64>,
    /// Mean final remaining percentage.
    pub mean_final_pct_remaining: Option<f64>,
    /// Rounds with multiplier >= [`HIGH_CRASH_THRESHOLD`].
    pub high_crashes: usize,
    /// Rounds with a valid multiplier < [`LOW_CRASH_THRESHOLD`].
    pub low_crashes: usize,
}

impl HistorySummary {
    /// Compute the summary over a loaded history.
    pub fn from_rounds(rounds: &[Round]) -> Self {
        let multipliers: Vec<f64> = rounds
            .iter()
            .filter_map(|r| r.crash_multiplier)
            .filter(|m| *m >= MIN_VALID_MULTIPLIER)
            .collect();

        Self {
            rounds: rounds.len(),
            mean_multiplier: mean(multipliers.iter().copied()),
            mean_duration_ms: mean(rounds.iter().filter_map(|r| r.duration_ms).map(|d| d as f64)),
            mean_final_pct_remaining: mean(rounds.iter().filter_map(|r| r.final_pct_remaining)),
            high_crashes: multipliers
                .iter()
                .filter(|m| **m >= HIGH_CRASH_THRESHOLD)
                .count(),
            low_crashes: multipliers
                .iter()
                .filter(|m| **m < LOW_CRASH_THRESHOLD)
                .count(),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::StageArgs;
    use chrono::Utc;
    use std::io::Write as _;

    fn round(id: u64, multiplier: Option<f64>) -> Round {
        let mut r = Round::staged(
            &StageArgs {
                round_id: id,
                next_round_id: None,
                ts: None,
            },
            Utc::now(),
        );
        r.crash_multiplier = multiplier;
        r
    }

    fn open_log(dir: &tempfile::TempDir) -> RoundLog {
        RoundLog::open(dir.path(), "rounds.jsonl").unwrap()
    }

    #[test]
    fn test_append_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open_log(&dir);

        log.append(&round(1, Some(1.5))).unwrap();
        log.append(&round(2, Some(3.0))).unwrap();

        let loaded = log.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].round_id, 1);
        assert_eq!(loaded[1].round_id, 2);
    }

    #[test]
    fn test_reopen_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut log = open_log(&dir);
            log.append(&round(1, Some(2.0))).unwrap();
        }
        // Process restart: reopen and append more.
        let mut log = open_log(&dir);
        log.append(&round(2, Some(4.0))).unwrap();

        let loaded = log.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_corrupt_line_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open_log(&dir);
        log.append(&round(1, Some(1.5))).unwrap();
        log.append(&round(2, Some(3.0))).unwrap();

        // Inject a torn line between valid appends.
        {
            let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
            writeln!(file, "{{\"round_id\": 99, truncated garbage").unwrap();
        }
        log.append(&round(3, Some(5.0))).unwrap();

        let loaded = log.load_all().unwrap();
        assert_eq!(loaded.len(), 3);
        let ids: Vec<u64> = loaded.iter().map(|r| r.round_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_double_append_grows_log_by_two() {
        // Append is not deduplicating. Replaying the same finalized round
        // twice is two entries.
        let dir = tempfile::tempdir().unwrap();
        let mut log = open_log(&dir);
        let r = round(7, Some(2.2));

        log.append(&r).unwrap();
        log.append(&r).unwrap();

        assert_eq!(log.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_summarize_thresholds_and_invalid_exclusion() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open_log(&dir);
        for (id, m) in [(1, 1.5), (2, 12.0), (3, 3.0), (4, 0.0)] {
            log.append(&round(id, Some(m))).unwrap();
        }

        let summary = log.summarize().unwrap();
        assert_eq!(summary.rounds, 4);
        assert_eq!(summary.high_crashes, 1);
        assert_eq!(summary.low_crashes, 1);
        // 0.0 is below the protocol floor: excluded from the mean.
        let mean = summary.mean_multiplier.unwrap();
        assert!((mean - (1.5 + 12.0 + 3.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_records_count_but_do_not_skew() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open_log(&dir);

        let mut complete = round(1, Some(4.0));
        complete.duration_ms = Some(8_000);
        log.append(&complete).unwrap();
        // Superseded round: no outcome, no derived fields.
        log.append(&round(2, None)).unwrap();

        let summary = log.summarize().unwrap();
        assert_eq!(summary.rounds, 2);
        assert_eq!(summary.mean_multiplier, Some(4.0));
        assert_eq!(summary.mean_duration_ms, Some(8_000.0));
    }

    #[test]
    fn test_empty_log_summary() {
        let dir = tempfile::tempdir().unwrap();
        let log = open_log(&dir);
        let summary = log.summarize().unwrap();
        assert_eq!(summary.rounds, 0);
        assert!(summary.mean_multiplier.is_none());
        assert_eq!(summary.high_crashes, 0);
    }
}
