//! Step and phase execution.
//!
//! This module provides the infrastructure to run manifest steps as
//! subprocesses and aggregate their outcomes:
//!
//! ```text
//! PhaseSpec → PhaseRunner → StepExecutor → subprocess → StepResult
//!                  └────────── status reducer ──────→ PhaseResult
//! ```
//!
//! The executor runs one step with environment gating, a wall-clock
//! timeout and error classification. The phase runner drives a group of
//! steps sequentially (with abort-on-required-failure) or concurrently,
//! and reduces the step results into a phase status.

pub mod categorize;
pub mod executor;
pub mod phase;
pub mod result;

pub use categorize::{categorize_error, ErrorCategory};
pub use executor::StepExecutor;
pub use phase::PhaseRunner;
pub use result::{
    Gate, PhaseResult, PhaseStatus, PipelineResult, RunSummary, StepResult, StepStatus,
};
