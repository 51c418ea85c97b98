//! Structural validator and scorer for dashboard content artifacts.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::blocks::{word_count, ContentBlock};

/// Minimum number of normalized blocks for a publishable artifact.
const MIN_BLOCKS: usize = 3;
/// Maximum number of blocks before the layout gets crowded.
const MAX_BLOCKS: usize = 10;
/// Maximum number of free-text notes before commentary drowns the data.
const MAX_NOTES: usize = 3;

/// Penalty for an artifact with too few blocks.
const PENALTY_TOO_FEW: u32 = 35;
/// Penalty for an artifact with no event blocks.
const PENALTY_NO_EVENTS: u32 = 35;
/// Penalty for an overcrowded artifact.
const PENALTY_TOO_MANY: u32 = 10;
/// Penalty for too many notes.
const PENALTY_TOO_MANY_NOTES: u32 = 5;
/// Penalty per block over its word budget.
const PENALTY_OVER_BUDGET: u32 = 5;

/// Severity of a quality issue. Purely descriptive; issues never crash the
/// pipeline, they only shape the validity verdict and score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single structural finding about an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    /// Issue severity; any `error` makes the artifact invalid.
    pub severity: Severity,
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl QualityIssue {
    fn new(severity: Severity, code: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Verdict of validating one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityResult {
    /// True iff no issue has severity `error`, independent of the score.
    pub valid: bool,
    /// 0-100, starts at 100 and loses the rule penalties.
    pub score: u32,
    /// All findings, in rule order.
    pub issues: Vec<QualityIssue>,
    /// Best-effort cleaned artifact: unknown and malformed blocks
    /// filtered out. Present even when invalid.
    pub normalized: Vec<ContentBlock>,
}

impl QualityResult {
    /// Issue messages at error severity, used as correction directives.
    pub fn error_messages(&self) -> Vec<String> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .map(|i| i.message.clone())
            .collect()
    }
}

/// Structural validator for generated dashboard artifacts.
#[derive(Debug, Clone, Default)]
pub struct ContentValidator;

impl ContentValidator {
    /// Creates a validator.
    pub fn new() -> Self {
        Self
    }

    /// Validates a raw artifact (a JSON array of blocks).
    ///
    /// Normalization drops blocks whose `type` tag is unknown or whose
    /// fields do not decode; dropping alone never fails an artifact. The
    /// structural rules then score what remains.
    pub fn validate(&self, raw_blocks: &[serde_json::Value]) -> QualityResult {
        if raw_blocks.is_empty() {
            return QualityResult {
                valid: false,
                score: 0,
                issues: vec![QualityIssue::new(
                    Severity::Error,
                    "empty_artifact",
                    "Artifact contains no blocks",
                )],
                normalized: Vec::new(),
            };
        }

        let normalized = normalize(raw_blocks);
        let dropped = raw_blocks.len() - normalized.len();
        if dropped > 0 {
            debug!("Normalization dropped {} unrecognized block(s)", dropped);
        }

        let mut issues = Vec::new();
        let mut penalty: u32 = 0;

        if normalized.len() < MIN_BLOCKS {
            issues.push(QualityIssue::new(
                Severity::Error,
                "too_few_blocks",
                format!(
                    "Artifact has {} usable blocks; at least {} are required",
                    normalized.len(),
                    MIN_BLOCKS
                ),
            ));
            penalty += PENALTY_TOO_FEW;
        }

        if normalized.len() > MAX_BLOCKS {
            issues.push(QualityIssue::new(
                Severity::Warning,
                "too_many_blocks",
                format!(
                    "Artifact has {} blocks; more than {} crowds the dashboard",
                    normalized.len(),
                    MAX_BLOCKS
                ),
            ));
            penalty += PENALTY_TOO_MANY;
        }

        if !normalized.iter().any(ContentBlock::is_event_block) {
            issues.push(QualityIssue::new(
                Severity::Error,
                "no_event_blocks",
                "Artifact must contain at least one event or event_group block",
            ));
            penalty += PENALTY_NO_EVENTS;
        }

        let note_count = normalized
            .iter()
            .filter(|b| matches!(b, ContentBlock::Note { .. }))
            .count();
        if note_count > MAX_NOTES {
            issues.push(QualityIssue::new(
                Severity::Warning,
                "too_many_notes",
                format!("Artifact has {} notes; at most {} fit the layout", note_count, MAX_NOTES),
            ));
            penalty += PENALTY_TOO_MANY_NOTES;
        }

        for (idx, block) in normalized.iter().enumerate() {
            if let Some((budget, text)) = block.word_budget() {
                let words = word_count(text);
                if words > budget {
                    issues.push(QualityIssue::new(
                        Severity::Warning,
                        "over_word_budget",
                        format!(
                            "Block {} ({}) has {} words, budget is {}",
                            idx,
                            block.kind(),
                            words,
                            budget
                        ),
                    ));
                    penalty += PENALTY_OVER_BUDGET;
                }
            }
        }

        let score = 100u32.saturating_sub(penalty);
        let valid = !issues.iter().any(|i| i.severity == Severity::Error);

        QualityResult {
            valid,
            score,
            issues,
            normalized,
        }
    }

    /// Validates an already-typed artifact, e.g. the deterministic
    /// fallback, through the same rule set.
    pub fn validate_blocks(&self, blocks: &[ContentBlock]) -> QualityResult {
        let raw: Vec<serde_json::Value> = blocks
            .iter()
            .map(|b| serde_json::to_value(b).unwrap_or(serde_json::Value::Null))
            .collect();
        self.validate(&raw)
    }
}

/// Drops unknown and malformed blocks, keeping declared order.
fn normalize(raw_blocks: &[serde_json::Value]) -> Vec<ContentBlock> {
    raw_blocks
        .iter()
        .filter_map(|value| serde_json::from_value(value.clone()).ok())
        .collect()
}
