//! Generator interface and usage accounting.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a generator implementation can report.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse generated artifact: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),
}

/// Token usage for one or more generation calls.
///
/// An explicit accumulator value: each call returns its own usage and the
/// caller folds them, instead of a shared mutable counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input/prompt tokens.
    #[serde(rename = "inputTokens")]
    pub input_tokens: u64,
    /// Output/completion tokens.
    #[serde(rename = "outputTokens")]
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Creates usage stats.
    pub fn new(input: u64, output: u64) -> Self {
        Self {
            input_tokens: input,
            output_tokens: output,
        }
    }

    /// Total tokens.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Folds another usage value into this one.
    pub fn fold(self, other: TokenUsage) -> Self {
        Self {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
        }
    }
}

/// The day's raw material a generation attempt works from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardContext {
    /// Dashboard title, e.g. "Saturday fixtures".
    pub title: String,
    /// Fixtures and results, most important first.
    pub events: Vec<EventSummary>,
    /// Editorial notes supplied by upstream fetchers.
    #[serde(default)]
    pub notes: Vec<String>,
}

/// One fixture or result line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    /// Display text, e.g. "Rovers 2-1 United".
    pub text: String,
    /// Editorial importance, 0-100. At or above
    /// [`MUST_WATCH_IMPORTANCE`] the event is must-watch.
    #[serde(default)]
    pub importance: u8,
}

/// Importance at which an event counts as must-watch.
pub const MUST_WATCH_IMPORTANCE: u8 = 70;

impl EventSummary {
    /// Creates an event line.
    pub fn new(text: impl Into<String>, importance: u8) -> Self {
        Self {
            text: text.into(),
            importance,
        }
    }

    /// True for events the watch plan must cover.
    pub fn is_must_watch(&self) -> bool {
        self.importance >= MUST_WATCH_IMPORTANCE
    }
}

/// A candidate artifact returned by one generation attempt.
///
/// Blocks stay raw JSON here; the quality validator owns typing and
/// normalization.
#[derive(Debug, Clone)]
pub struct CandidateArtifact {
    /// Raw content blocks.
    pub blocks: Vec<serde_json::Value>,
    /// Usage of this attempt only.
    pub usage: TokenUsage,
}

/// The narrow seam to the external LLM collaborator.
///
/// `hints` carries the adaptive correction directives plus any error
/// messages from a previously rejected attempt; implementations fold them
/// into the prompt however they see fit.
#[async_trait]
pub trait CommentaryGenerator: Send + Sync {
    /// Generates a candidate artifact for the given context.
    async fn generate(
        &self,
        context: &DashboardContext,
        hints: &[String],
    ) -> Result<CandidateArtifact, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_fold() {
        let total = TokenUsage::new(100, 40)
            .fold(TokenUsage::new(50, 10))
            .fold(TokenUsage::default());
        assert_eq!(total.input_tokens, 150);
        assert_eq!(total.output_tokens, 50);
        assert_eq!(total.total(), 200);
    }

    #[test]
    fn test_must_watch_threshold() {
        assert!(EventSummary::new("derby", 70).is_must_watch());
        assert!(EventSummary::new("final", 100).is_must_watch());
        assert!(!EventSummary::new("friendly", 69).is_must_watch());
    }

    #[test]
    fn test_context_serde() {
        let json = r#"{
            "title": "Saturday fixtures",
            "events": [{"text": "Rovers 2-1 United", "importance": 85}],
            "notes": ["Kickoff moved to 17:30"]
        }"#;
        let ctx: DashboardContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.events.len(), 1);
        assert!(ctx.events[0].is_must_watch());
    }
}
