//! CLI command definitions for matchday.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::manifest::Manifest;
use crate::pipeline::{PipelineConfig, PipelineOrchestrator};
use crate::quality::{build_hints, ContentValidator, QualityHistory};

/// Default manifest location.
const DEFAULT_MANIFEST: &str = "pipeline.manifest.json";

/// Default pipeline result location.
const DEFAULT_RESULT: &str = "pipeline-result.json";

/// Default quality history location.
const DEFAULT_HISTORY: &str = "quality-history.json";

/// Sports dashboard content pipeline.
#[derive(Parser)]
#[command(name = "matchday")]
#[command(about = "Manifest-driven content pipeline with a quality gate")]
#[command(version)]
#[command(
    long_about = "matchday orchestrates the dashboard content pipeline: fetch phases, \
generation, and the pre-publish quality gate.\n\nThe run result is written after every \
run and the process exits 0 only when the gate passes.\n\nExample usage:\n  matchday run \
--manifest pipeline.manifest.json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the full pipeline from a manifest.
    Run(RunArgs),

    /// Load and validate a manifest without executing anything.
    Check(CheckArgs),

    /// Run the content quality gate over an artifact file.
    Validate(ValidateArgs),

    /// Show adaptive hints derived from the quality history.
    Hints(HintsArgs),
}

/// Arguments for `matchday run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the pipeline manifest.
    #[arg(short, long, default_value = DEFAULT_MANIFEST, env = "MATCHDAY_MANIFEST")]
    pub manifest: PathBuf,

    /// Path the result document is written to.
    #[arg(short, long, default_value = DEFAULT_RESULT, env = "MATCHDAY_RESULT")]
    pub result: PathBuf,

    /// Default step timeout in seconds.
    #[arg(short, long, env = "MATCHDAY_STEP_TIMEOUT_SECS")]
    pub timeout: Option<u64>,

    /// Phase holding the pre-publish gate step.
    #[arg(long, default_value = "finalize")]
    pub gate_phase: String,

    /// Step whose failure fails the gate.
    #[arg(long, default_value = "validate")]
    pub gate_step: String,

    /// Print the full result document as JSON.
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments for `matchday check`.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the pipeline manifest.
    #[arg(short, long, default_value = DEFAULT_MANIFEST)]
    pub manifest: PathBuf,
}

/// Arguments for `matchday validate`.
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to a content artifact (a JSON array of blocks).
    pub artifact: PathBuf,

    /// Print the full quality result as JSON.
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments for `matchday hints`.
#[derive(Parser, Debug)]
pub struct HintsArgs {
    /// Path to the quality history document.
    #[arg(long, default_value = DEFAULT_HISTORY, env = "MATCHDAY_HISTORY")]
    pub history: PathBuf,

    /// Print the hint report as JSON.
    #[arg(short, long)]
    pub json: bool,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parses CLI arguments and runs the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Runs the selected command with already-parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Check(args) => check_manifest(args),
        Commands::Validate(args) => validate_artifact(args),
        Commands::Hints(args) => show_hints(args),
    }
}

async fn run_pipeline(args: RunArgs) -> anyhow::Result<()> {
    let mut config = PipelineConfig::default()
        .with_manifest_path(args.manifest)
        .with_result_path(args.result)
        .with_gate(args.gate_phase, args.gate_step);
    if let Some(secs) = args.timeout {
        config = config.with_default_step_timeout(Duration::from_secs(secs));
    }

    let orchestrator = PipelineOrchestrator::new(config)?;
    let result = orchestrator.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "gate={} total={} success={} failed={} skipped={} ({} ms)",
            result.gate,
            result.summary.total,
            result.summary.success,
            result.summary.failed,
            result.summary.skipped,
            result.duration_ms
        );
    }

    if !result.passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn check_manifest(args: CheckArgs) -> anyhow::Result<()> {
    let manifest = Manifest::from_path(&args.manifest)
        .with_context(|| format!("manifest '{}' is invalid", args.manifest.display()))?;

    info!("Manifest '{}' is valid", args.manifest.display());
    for phase in &manifest.phases {
        println!(
            "{} ({}, {} steps)",
            phase.name,
            if phase.parallel { "parallel" } else { "sequential" },
            phase.steps.len()
        );
        for step in &phase.steps {
            println!("  {} [{}]", step.name, step.error_policy);
        }
    }
    Ok(())
}

fn validate_artifact(args: ValidateArgs) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&args.artifact)
        .with_context(|| format!("failed to read '{}'", args.artifact.display()))?;
    let blocks: Vec<serde_json::Value> = serde_json::from_str(&content)
        .context("artifact must be a JSON array of content blocks")?;

    let result = ContentValidator::new().validate(&blocks);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "valid={} score={} blocks={}",
            result.valid,
            result.score,
            result.normalized.len()
        );
        for issue in &result.issues {
            println!("  [{}] {}: {}", issue.severity, issue.code, issue.message);
        }
    }

    if !result.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn show_hints(args: HintsArgs) -> anyhow::Result<()> {
    let history = QualityHistory::load(&args.history)?;
    let report = build_hints(&history);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.hints.is_empty() {
        println!(
            "No hints ({} history entries)",
            history.len()
        );
    } else {
        for hint in &report.hints {
            println!("- {}", hint);
        }
    }
    for (metric, average) in &report.metrics {
        println!("  {} avg: {:.1}", metric, average);
    }
    Ok(())
}
