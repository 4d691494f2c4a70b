//! Run session state: score, high score and run lifecycle.
//!
//! Lives as long as the process. The high score can optionally be persisted
//! to a small JSON file between processes.

use std::fs;
use std::path::Path;

use runner_common::{RunnerError, RunnerResult, SchemaVersion};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Session State
// ============================================================================

/// Current session state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No run started yet.
    #[default]
    Idle,
    /// A run is in progress.
    Playing,
    /// The last run ended with the character's death.
    Dead,
}

impl SessionState {
    /// Check if the track should be maintained.
    #[must_use]
    pub const fn should_update_world(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Final score
    pub score: i32,
    /// High score after this run
    pub high_score: i32,
    /// Whether the run set a new high score
    pub new_record: bool,
}

// ============================================================================
// Session
// ============================================================================

/// Score bookkeeping across runs.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SessionState,
    score: i32,
    high_score: i32,
    runs: u32,
    new_record: bool,
}

/// Persisted part of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSave {
    /// Save format version
    pub version: String,
    /// Best score so far
    pub high_score: i32,
    /// Finished runs
    pub runs: u32,
}

impl Session {
    /// Creates a fresh session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a run is in progress.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.state, SessionState::Playing)
    }

    /// Score of the current or last run.
    #[must_use]
    pub const fn score(&self) -> i32 {
        self.score
    }

    /// Best score.
    #[must_use]
    pub const fn high_score(&self) -> i32 {
        self.high_score
    }

    /// Finished runs.
    #[must_use]
    pub const fn runs(&self) -> u32 {
        self.runs
    }

    /// Whether the last run set a new high score.
    #[must_use]
    pub const fn new_record(&self) -> bool {
        self.new_record
    }

    /// Starts a run.
    pub fn start_run(&mut self) {
        self.state = SessionState::Playing;
        self.score = 0;
        self.new_record = false;
    }

    /// Updates the live score.
    pub fn set_score(&mut self, score: i32) {
        if self.is_playing() {
            self.score = score;
        }
    }

    /// Ends the run with its final score.
    pub fn end_run(&mut self, score: i32) -> RunSummary {
        self.score = score;
        self.runs += 1;
        self.new_record = score > self.high_score;
        if self.new_record {
            self.high_score = score;
        }
        self.state = SessionState::Dead;
        info!(
            "Run {} ended with score {score} (high score {})",
            self.runs, self.high_score
        );
        RunSummary {
            score,
            high_score: self.high_score,
            new_record: self.new_record,
        }
    }

    /// Persisted snapshot.
    #[must_use]
    pub fn to_save(&self) -> SessionSave {
        SessionSave {
            version: SchemaVersion::SESSION_SAVE.to_string(),
            high_score: self.high_score,
            runs: self.runs,
        }
    }

    /// Writes the high score to a JSON file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> RunnerResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.to_save())
            .map_err(|e| RunnerError::Serialization(e.to_string()))?;
        fs::write(path, contents)?;
        info!("Saved session to {}", path.display());
        Ok(())
    }

    /// Reads a session saved by [`Session::save_to`].
    pub fn load_from<P: AsRef<Path>>(path: P) -> RunnerResult<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let save: SessionSave =
            serde_json::from_str(&contents).map_err(|e| RunnerError::Serialization(e.to_string()))?;

        let expected = SchemaVersion::SESSION_SAVE;
        let readable = SchemaVersion::parse(&save.version).is_some_and(|v| expected.can_read(&v));
        if !readable {
            return Err(RunnerError::VersionMismatch {
                expected: expected.to_string(),
                actual: save.version,
            });
        }

        Ok(Self {
            high_score: save.high_score,
            runs: save.runs,
            ..Self::default()
        })
    }

    /// Like [`Session::load_from`], falling back to a fresh session.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to load session from {}: {e}", path.display());
                Self::default()
            },
        }
    }
}
