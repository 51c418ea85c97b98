//! Bounded generate/validate/retry loop.
//!
//! The state machine is small and hard-capped:
//! Generate → Validate → (valid? Done : RetryWithHints) → FallbackDeterministic.
//! Corrective text accumulates between attempts; the fallback artifact is
//! re-validated through the same gate and passes by construction.

use tracing::{info, warn};

use crate::quality::{ContentBlock, ContentValidator, QualityIssue, QualitySnapshot};

use super::fallback::build_fallback;
use super::generator::{CommentaryGenerator, DashboardContext, TokenUsage};

/// Hard ceiling on generation attempts before falling back.
pub const MAX_GENERATION_ATTEMPTS: u32 = 2;

/// Final product of the content loop.
#[derive(Debug, Clone)]
pub struct ContentOutcome {
    /// Accepted (normalized) blocks, from generation or fallback.
    pub blocks: Vec<ContentBlock>,
    /// Quality score of the accepted artifact.
    pub score: u32,
    /// Issues recorded against the accepted artifact.
    pub issues: Vec<QualityIssue>,
    /// Generation attempts made (0 when the generator never succeeded).
    pub attempts: u32,
    /// True when the deterministic fallback shipped.
    pub fell_back: bool,
    /// Token usage folded across every attempt.
    pub usage: TokenUsage,
    /// Hints that were in effect for the final attempt.
    pub hints_applied: Vec<String>,
}

impl ContentOutcome {
    /// Converts the outcome into a history snapshot.
    ///
    /// Editorial tracks the gate score; watch-plan tracks how many
    /// must-watch events from the context made it into the artifact;
    /// featured tracks whether a card section shipped. Enrichment is
    /// owned by the upstream data step and stays absent here.
    pub fn to_snapshot(&self, context: &DashboardContext) -> QualitySnapshot {
        let mut snapshot = QualitySnapshot::new()
            .with_editorial(self.score as f64)
            .with_hints(self.hints_applied.clone())
            .with_token_usage(self.usage);

        if let Some(coverage) = must_watch_coverage(context, &self.blocks) {
            snapshot = snapshot.with_watch_plan(coverage);
        }

        let has_card = self
            .blocks
            .iter()
            .any(|b| matches!(b, ContentBlock::Card { .. }));
        snapshot = snapshot.with_featured(if has_card { 100.0 } else { 0.0 });

        snapshot
    }
}

/// Fraction (0-100) of must-watch events whose text appears in the
/// artifact. `None` when the context has no must-watch events.
fn must_watch_coverage(context: &DashboardContext, blocks: &[ContentBlock]) -> Option<f64> {
    let must_watch: Vec<&str> = context
        .events
        .iter()
        .filter(|e| e.is_must_watch())
        .map(|e| e.text.as_str())
        .collect();
    if must_watch.is_empty() {
        return None;
    }

    let mut rendered = String::new();
    for block in blocks {
        match block {
            ContentBlock::Headline { text }
            | ContentBlock::Event { text, .. }
            | ContentBlock::Note { text } => rendered.push_str(text),
            ContentBlock::EventGroup { title, items } => {
                rendered.push_str(title);
                for item in items {
                    rendered.push_str(item);
                }
            }
            ContentBlock::Card { title, body } => {
                rendered.push_str(title);
                rendered.push_str(body);
            }
            ContentBlock::Divider => {}
        }
        rendered.push('\n');
    }

    let covered = must_watch
        .iter()
        .filter(|text| rendered.contains(*text))
        .count();
    Some(covered as f64 / must_watch.len() as f64 * 100.0)
}

/// Drives a generator through the bounded retry loop.
pub struct ContentPipeline<G> {
    generator: G,
    validator: ContentValidator,
    max_attempts: u32,
}

impl<G: CommentaryGenerator> ContentPipeline<G> {
    /// Creates a content pipeline with the default attempt ceiling.
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            validator: ContentValidator::new(),
            max_attempts: MAX_GENERATION_ATTEMPTS,
        }
    }

    /// Overrides the attempt ceiling (clamped to at least 1).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Produces an artifact for the context, falling back when every
    /// generation attempt is rejected or errors.
    pub async fn produce(
        &self,
        context: &DashboardContext,
        base_hints: &[String],
    ) -> ContentOutcome {
        let mut usage = TokenUsage::default();
        let mut hints: Vec<String> = base_hints.to_vec();
        let mut attempts = 0;

        while attempts < self.max_attempts {
            attempts += 1;
            match self.generator.generate(context, &hints).await {
                Ok(candidate) => {
                    usage = usage.fold(candidate.usage);
                    let result = self.validator.validate(&candidate.blocks);

                    if result.valid {
                        info!(
                            "Generation attempt {} accepted (score {})",
                            attempts, result.score
                        );
                        return ContentOutcome {
                            blocks: result.normalized,
                            score: result.score,
                            issues: result.issues,
                            attempts,
                            fell_back: false,
                            usage,
                            hints_applied: hints,
                        };
                    }

                    warn!(
                        "Generation attempt {} rejected (score {}): {} issue(s)",
                        attempts,
                        result.score,
                        result.issues.len()
                    );
                    for message in result.error_messages() {
                        if !hints.contains(&message) {
                            hints.push(message);
                        }
                    }
                }
                Err(e) => {
                    warn!("Generation attempt {} failed: {}", attempts, e);
                }
            }
        }

        info!("Generation exhausted; shipping deterministic fallback");
        let blocks = build_fallback(context);
        let result = self.validator.validate_blocks(&blocks);

        ContentOutcome {
            blocks: result.normalized,
            score: result.score,
            issues: result.issues,
            attempts,
            fell_back: true,
            usage,
            hints_applied: hints,
        }
    }
}
