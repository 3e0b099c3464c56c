//! Configuration
//!
//! Plain structs with defaults; process wiring decides how they are
//! filled (flags, env, hardcoded demo values).

use std::path::PathBuf;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory the round log lives in. Created at startup; failure to
    /// create it is fatal.
    pub data_dir: PathBuf,
    /// File name of the append-only round log.
    pub log_file: String,
    /// Whether rounds superseded before their crash event are persisted.
    /// On by default: best-effort capture favors completeness of the
    /// historical log, and downstream analysis can filter on the null
    /// outcome.
    pub persist_incomplete: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            log_file: "rounds.jsonl".to_string(),
            persist_incomplete: true,
        }
    }
}
