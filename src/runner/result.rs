//! Results produced by step, phase and pipeline execution.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::categorize::ErrorCategory;

/// Maximum length of a captured error message before truncation.
const MAX_ERROR_LEN: usize = 500;

/// Status of a single step execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The subprocess ran and exited zero.
    Success,
    /// The subprocess exited non-zero, timed out, or failed to spawn.
    Failed,
    /// Environment preconditions were not met; execution never started.
    Skipped,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Success => write!(f, "success"),
            StepStatus::Failed => write!(f, "failed"),
            StepStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Outcome of one step execution attempt. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Step name from the manifest.
    pub name: String,
    /// Final status.
    pub status: StepStatus,
    /// Wall-clock duration in milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    /// Exit code, when a subprocess actually ran.
    #[serde(rename = "exitCode", skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Truncated failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure classification.
    #[serde(rename = "errorCategory", skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    /// Why the step was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StepResult {
    /// Creates a successful result.
    pub fn success(name: impl Into<String>, duration: Duration, exit_code: i32) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Success,
            duration_ms: duration.as_millis() as u64,
            exit_code: Some(exit_code),
            error: None,
            error_category: None,
            reason: None,
        }
    }

    /// Creates a failed result with a truncated, categorized error message.
    pub fn failed(
        name: impl Into<String>,
        duration: Duration,
        error: impl Into<String>,
        category: ErrorCategory,
    ) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Failed,
            duration_ms: duration.as_millis() as u64,
            exit_code: None,
            error: Some(truncate(error.into(), MAX_ERROR_LEN)),
            error_category: Some(category),
            reason: None,
        }
    }

    /// Creates a skipped result with the reason execution never started.
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Skipped,
            duration_ms: 0,
            exit_code: None,
            error: None,
            error_category: None,
            reason: Some(reason.into()),
        }
    }

    /// Sets the exit code.
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Returns true if the step failed.
    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

/// Status of a completed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Every step succeeded (skips allowed).
    Success,
    /// At least one `continue` step failed; the phase proceeded.
    Partial,
    /// A `required` step failed and the phase aborted.
    Failed,
    /// The phase never ran because an earlier phase aborted.
    Skipped,
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseStatus::Success => write!(f, "success"),
            PhaseStatus::Partial => write!(f, "partial"),
            PhaseStatus::Failed => write!(f, "failed"),
            PhaseStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl PhaseStatus {
    /// Reduces a step-result list plus an abort flag into a phase status.
    ///
    /// Precedence: failed (aborted) > partial (any failed step) > success.
    pub fn reduce(steps: &[StepResult], aborted: bool) -> Self {
        if aborted {
            PhaseStatus::Failed
        } else if steps.iter().any(StepResult::is_failed) {
            PhaseStatus::Partial
        } else {
            PhaseStatus::Success
        }
    }
}

/// Aggregated outcome of one phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    /// Phase name from the manifest.
    pub name: String,
    /// Final status.
    pub status: PhaseStatus,
    /// Step results in declared order.
    pub steps: Vec<StepResult>,
    /// Name of the required step whose failure aborted the phase.
    #[serde(rename = "abortedBy", skip_serializing_if = "Option::is_none")]
    pub aborted_by: Option<String>,
}

impl PhaseResult {
    /// Creates a result for a phase that never ran.
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: PhaseStatus::Skipped,
            steps: Vec::new(),
            aborted_by: None,
        }
    }

    /// Returns true if this phase aborted the pipeline.
    pub fn is_aborted(&self) -> bool {
        self.aborted_by.is_some()
    }

    /// Looks up a step result by name.
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Final pass/fail verdict gating downstream publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gate {
    Pass,
    Fail,
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gate::Pass => write!(f, "pass"),
            Gate::Fail => write!(f, "fail"),
        }
    }
}

/// Step counts across the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: u32,
    pub success: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl RunSummary {
    /// Tallies step results from every executed phase.
    pub fn from_phases<'a>(phases: impl IntoIterator<Item = &'a PhaseResult>) -> Self {
        let mut summary = Self::default();
        for phase in phases {
            for step in &phase.steps {
                summary.total += 1;
                match step.status {
                    StepStatus::Success => summary.success += 1,
                    StepStatus::Failed => summary.failed += 1,
                    StepStatus::Skipped => summary.skipped += 1,
                }
            }
        }
        summary
    }
}

/// The authoritative record of one pipeline run, written after every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Run identifier (`run-<uuid>`).
    pub run_id: String,
    /// When the run started.
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    /// When the run completed.
    #[serde(rename = "completedAt")]
    pub completed_at: DateTime<Utc>,
    /// Total wall-clock duration in milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    /// Final pass/fail verdict.
    pub gate: Gate,
    /// Per-phase outcomes keyed by phase name.
    pub phases: BTreeMap<String, PhaseResult>,
    /// Step counts across the whole run.
    pub summary: RunSummary,
}

impl PipelineResult {
    /// Returns true if the run passed the gate.
    pub fn passed(&self) -> bool {
        self.gate == Gate::Pass
    }

    /// Looks up a phase result by name.
    pub fn phase(&self, name: &str) -> Option<&PhaseResult> {
        self.phases.get(name)
    }
}

/// Truncates a message, marking the cut.
fn truncate(s: String, max_len: usize) -> String {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    }
}
