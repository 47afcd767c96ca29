//! Run state checkpointing
//!
//! The orchestrator's only persistent cross-invocation state: a JSON
//! sidecar written after every batch so an interrupted run resumes without
//! reprocessing already-flagged records. Writes go through a temp file and
//! rename, so a crash mid-write can never leave a partial JSON value behind.
//! A missing checkpoint means "start from zero", never an error.

use chrono::{DateTime, Utc};
use namebase_common::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Overall run disposition recorded in the checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Running,
    Paused,
    Completed,
}

/// Persistent progress state, passed into and out of the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    /// Index of the last completed batch across the whole run
    pub last_batch_index: u64,
    /// Names enriched over all sessions of this run
    pub total_processed: u64,
    /// Names left unprocessed by failed batches
    pub total_errors: u64,
    /// Cumulative estimated oracle cost, dollars
    pub estimated_cost: f64,
    /// Shard being processed when the checkpoint was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_chunk: Option<String>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl RunState {
    /// Load the checkpoint, or start fresh when none exists.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No checkpoint found, starting from zero");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let state: RunState = serde_json::from_str(&content)?;
        tracing::info!(
            total_processed = state.total_processed,
            total_errors = state.total_errors,
            last_batch = state.last_batch_index,
            "Resuming from checkpoint"
        );
        Ok(state)
    }

    /// Persist the checkpoint atomically (complete JSON value or nothing).
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_update = Some(Utc::now());
        let rendered = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, rendered)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// One failed-batch entry in the error log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    /// Names in the failed batch
    pub batch: Vec<String>,
    pub error: String,
}

/// Append-only JSON error log for exhausted batches
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry, keeping the file a single complete JSON array.
    pub fn append(&self, entry: ErrorLogEntry) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.push(entry);

        let rendered = serde_json::to_string_pretty(&entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, rendered)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// All logged entries; an absent file is an empty log.
    pub fn read_all(&self) -> Result<Vec<ErrorLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Names of every record mentioned in the log, for retry-first queueing.
    pub fn failed_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.read_all()? {
            for name in entry.batch {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}
