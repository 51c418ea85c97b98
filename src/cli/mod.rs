//! Command-line interface for matchday.
//!
//! Provides commands for running the pipeline, checking manifests,
//! validating content artifacts, and inspecting adaptive hints.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
