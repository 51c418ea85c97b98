//! Content generation seam.
//!
//! The LLM collaborator sits behind the narrow [`CommentaryGenerator`]
//! trait; this module owns what surrounds it: the bounded
//! generate/validate/retry state machine, the deterministic fallback
//! artifact, and explicit token-usage accounting.

pub mod fallback;
pub mod generator;
pub mod retry;

pub use fallback::build_fallback;
pub use generator::{
    CandidateArtifact, CommentaryGenerator, DashboardContext, EventSummary, GenerationError,
    TokenUsage,
};
pub use retry::{ContentOutcome, ContentPipeline, MAX_GENERATION_ATTEMPTS};
