//! Append-only quality history.
//!
//! The history document is the sole state carried between runs: a JSON
//! array of snapshots, capped at a fixed window with FIFO eviction. Saves
//! write into a fresh file and rename it into place so a crash mid-run
//! never corrupts previously committed history.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::content::TokenUsage;
use crate::pipeline::orchestrator::write_atomic;

/// Default maximum number of retained snapshots.
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// Errors that can occur while loading or saving the history document.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to read history '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write history '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("History document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A point-in-time record of one content generation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualitySnapshot {
    /// When the snapshot was recorded.
    #[serde(rename = "recordedAt")]
    pub recorded_at: DateTime<Utc>,
    /// Editorial block quality sub-score, 0-100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editorial: Option<f64>,
    /// Data-enrichment sub-score, 0-100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<f64>,
    /// Featured-content sub-score, 0-100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<f64>,
    /// Must-watch coverage sub-score, 0-100.
    #[serde(rename = "watchPlan", skip_serializing_if = "Option::is_none")]
    pub watch_plan: Option<f64>,
    /// Hints that were applied to the generation attempt.
    #[serde(rename = "hintsApplied", default)]
    pub hints_applied: Vec<String>,
    /// Token usage folded over all generation attempts.
    #[serde(rename = "tokenUsage", default)]
    pub token_usage: TokenUsage,
}

impl QualitySnapshot {
    /// Creates an empty snapshot stamped now.
    pub fn new() -> Self {
        Self {
            recorded_at: Utc::now(),
            editorial: None,
            enrichment: None,
            featured: None,
            watch_plan: None,
            hints_applied: Vec::new(),
            token_usage: TokenUsage::default(),
        }
    }

    /// Sets the editorial sub-score.
    pub fn with_editorial(mut self, score: f64) -> Self {
        self.editorial = Some(score);
        self
    }

    /// Sets the enrichment sub-score.
    pub fn with_enrichment(mut self, score: f64) -> Self {
        self.enrichment = Some(score);
        self
    }

    /// Sets the featured sub-score.
    pub fn with_featured(mut self, score: f64) -> Self {
        self.featured = Some(score);
        self
    }

    /// Sets the must-watch coverage sub-score.
    pub fn with_watch_plan(mut self, score: f64) -> Self {
        self.watch_plan = Some(score);
        self
    }

    /// Records the hints applied to the generation attempt.
    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints_applied = hints;
        self
    }

    /// Records token usage.
    pub fn with_token_usage(mut self, usage: TokenUsage) -> Self {
        self.token_usage = usage;
        self
    }
}

impl Default for QualitySnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Capped, append-only log of quality snapshots.
#[derive(Debug, Clone)]
pub struct QualityHistory {
    entries: Vec<QualitySnapshot>,
    cap: usize,
}

impl QualityHistory {
    /// Creates an empty history with the default cap.
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_HISTORY_CAP)
    }

    /// Creates an empty history with a custom cap.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            cap: cap.max(1),
        }
    }

    /// Loads history from a JSON array document.
    ///
    /// A missing file yields an empty history; a corrupt document is an
    /// error so a bad write never silently wipes the learning state.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        Self::load_with_cap(path, DEFAULT_HISTORY_CAP)
    }

    /// Loads history with a custom cap, evicting oldest entries past it.
    pub fn load_with_cap(path: impl AsRef<Path>, cap: usize) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No history at {}, starting empty", path.display());
            return Ok(Self::with_cap(cap));
        }

        let content = std::fs::read_to_string(path).map_err(|source| HistoryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut history = Self::with_cap(cap);
        history.entries = serde_json::from_str(&content)?;
        history.evict();
        Ok(history)
    }

    /// Appends a snapshot, evicting the oldest entry past the cap.
    pub fn append(&mut self, snapshot: QualitySnapshot) {
        self.entries.push(snapshot);
        self.evict();
    }

    /// Saves the history document atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), HistoryError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(path, &json).map_err(|source| HistoryError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[QualitySnapshot] {
        &self.entries
    }

    /// The most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[QualitySnapshot] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no snapshots are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict(&mut self) {
        if self.entries.len() > self.cap {
            let excess = self.entries.len() - self.cap;
            self.entries.drain(..excess);
        }
    }
}

impl Default for QualityHistory {
    fn default() -> Self {
        Self::new()
    }
}
