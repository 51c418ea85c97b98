//! Pipeline orchestrator: drives phases in order and persists the result.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::manifest::{Manifest, ManifestError};
use crate::runner::{
    Gate, PhaseResult, PhaseRunner, PipelineResult, RunSummary, StepExecutor, StepStatus,
};

use super::config::{ConfigError, PipelineConfig};

/// Errors that can occur during orchestration itself (not step failures,
/// which are reported inside the pipeline result).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Manifest could not be loaded or validated.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// The result document could not be persisted.
    #[error("Failed to persist result to '{path}': {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The result document could not be serialized.
    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Drives all phases of a manifest in order, computes the publish gate and
/// persists the run result.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    runner: PhaseRunner,
}

impl PipelineOrchestrator {
    /// Creates an orchestrator from a validated configuration.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let executor = StepExecutor::new(config.default_step_timeout);
        Ok(Self {
            config,
            runner: PhaseRunner::new(executor),
        })
    }

    /// Gets the current configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full pipeline once.
    ///
    /// The result document is written after every run. When orchestration
    /// itself fails (manifest load, serialization) a partial gate=fail
    /// document is still written best-effort before the error propagates,
    /// so downstream tooling can always inspect the last run.
    pub async fn run(&self) -> Result<PipelineResult, PipelineError> {
        let run_id = format!("run-{}", Uuid::new_v4());
        let started_at = Utc::now();
        let start = Instant::now();

        info!(
            "Starting pipeline run {} from {}",
            run_id,
            self.config.manifest_path.display()
        );

        let manifest = match Manifest::from_path(&self.config.manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                error!("Pipeline run {} failed to load manifest: {}", run_id, e);
                self.persist_partial(&run_id, started_at, start.elapsed().as_millis() as u64);
                return Err(e.into());
            }
        };

        let mut phases = BTreeMap::new();
        let mut aborted = false;

        for phase in &manifest.phases {
            // A single global abort switch: once any phase aborts, every
            // remaining phase is recorded skipped and never executes.
            let result = if aborted {
                PhaseResult::skipped(&phase.name)
            } else {
                self.runner.run(phase).await
            };

            aborted = aborted || result.is_aborted();
            phases.insert(phase.name.clone(), result);
        }

        let gate = self.compute_gate(&phases, aborted);
        let summary = RunSummary::from_phases(phases.values());
        let completed_at = Utc::now();

        let result = PipelineResult {
            run_id: run_id.clone(),
            started_at,
            completed_at,
            duration_ms: start.elapsed().as_millis() as u64,
            gate,
            phases,
            summary,
        };

        self.persist(&result)?;

        info!(
            "Pipeline run {} finished: gate={} ({} steps: {} success, {} failed, {} skipped)",
            run_id, gate, summary.total, summary.success, summary.failed, summary.skipped
        );

        Ok(result)
    }

    /// Computes the publish gate.
    ///
    /// Fail when any phase aborted, or when the designated finalize gate
    /// step reports failed even under a `continue` policy. Skipped steps
    /// never fail the gate by themselves.
    fn compute_gate(&self, phases: &BTreeMap<String, PhaseResult>, aborted: bool) -> Gate {
        if aborted {
            return Gate::Fail;
        }

        let gate_step_failed = phases
            .get(&self.config.gate_phase)
            .and_then(|phase| phase.step(&self.config.gate_step))
            .is_some_and(|step| step.status == StepStatus::Failed);

        if gate_step_failed {
            warn!(
                "Gate step '{}/{}' failed; failing the gate",
                self.config.gate_phase, self.config.gate_step
            );
            Gate::Fail
        } else {
            Gate::Pass
        }
    }

    /// Writes the result document atomically.
    fn persist(&self, result: &PipelineResult) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(result)?;
        write_atomic(&self.config.result_path, &json).map_err(|source| PipelineError::Persist {
            path: self.config.result_path.display().to_string(),
            source,
        })
    }

    /// Best-effort partial result when orchestration itself failed.
    fn persist_partial(&self, run_id: &str, started_at: chrono::DateTime<Utc>, duration_ms: u64) {
        let partial = PipelineResult {
            run_id: run_id.to_string(),
            started_at,
            completed_at: Utc::now(),
            duration_ms,
            gate: Gate::Fail,
            phases: BTreeMap::new(),
            summary: RunSummary::default(),
        };
        if let Err(e) = self.persist(&partial) {
            warn!("Could not write partial result: {}", e);
        }
    }
}

/// Writes content into a fresh file next to `path`, then renames it into
/// place, so a crash mid-write never corrupts the previous document.
pub(crate) fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new_in(".")?,
    };
    std::io::Write::write_all(&mut tmp, content.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("pipeline.manifest.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn config_for(dir: &TempDir) -> PipelineConfig {
        PipelineConfig::default()
            .with_manifest_path(dir.path().join("pipeline.manifest.json"))
            .with_result_path(dir.path().join("pipeline-result.json"))
            .with_history_path(dir.path().join("quality-history.json"))
    }

    #[tokio::test]
    async fn test_continue_failures_pass_the_gate() {
        // fetch(required, succeeds), build(continue, one step fails),
        // finalize(required, succeeds) => gate pass, summary {3,2,1,0}.
        let dir = TempDir::new().unwrap();
        write_manifest(
            &dir,
            r#"{"phases": [
                {"name": "fetch", "steps": [
                    {"name": "scores", "command": "exit 0", "errorPolicy": "required"}
                ]},
                {"name": "build", "steps": [
                    {"name": "commentary", "command": "exit 1", "errorPolicy": "continue"}
                ]},
                {"name": "finalize", "steps": [
                    {"name": "validate", "command": "exit 0", "errorPolicy": "required"}
                ]}
            ]}"#,
        );

        let orchestrator = PipelineOrchestrator::new(config_for(&dir)).unwrap();
        let result = orchestrator.run().await.unwrap();

        assert_eq!(result.gate, Gate::Pass);
        assert_eq!(result.summary.total, 3);
        assert_eq!(result.summary.success, 2);
        assert_eq!(result.summary.failed, 1);
        assert_eq!(result.summary.skipped, 0);
        assert_eq!(
            result.phase("build").unwrap().status,
            crate::runner::PhaseStatus::Partial
        );
    }

    #[tokio::test]
    async fn test_required_failure_skips_remaining_phases() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            &dir,
            r#"{"phases": [
                {"name": "fetch", "steps": [
                    {"name": "scores", "command": "exit 1", "errorPolicy": "required"}
                ]},
                {"name": "build", "steps": [
                    {"name": "commentary", "command": "exit 0", "errorPolicy": "continue"}
                ]},
                {"name": "finalize", "steps": [
                    {"name": "validate", "command": "exit 0", "errorPolicy": "required"}
                ]}
            ]}"#,
        );

        let orchestrator = PipelineOrchestrator::new(config_for(&dir)).unwrap();
        let result = orchestrator.run().await.unwrap();

        assert_eq!(result.gate, Gate::Fail);
        let fetch = result.phase("fetch").unwrap();
        assert_eq!(fetch.aborted_by.as_deref(), Some("scores"));

        for name in ["build", "finalize"] {
            let phase = result.phase(name).unwrap();
            assert_eq!(phase.status, crate::runner::PhaseStatus::Skipped);
            assert!(phase.steps.is_empty());
        }
        assert_eq!(result.summary.total, 1);
    }

    #[tokio::test]
    async fn test_gate_step_failure_fails_gate_without_abort() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            &dir,
            r#"{"phases": [
                {"name": "fetch", "steps": [
                    {"name": "scores", "command": "exit 0", "errorPolicy": "required"}
                ]},
                {"name": "finalize", "steps": [
                    {"name": "validate", "command": "exit 1", "errorPolicy": "continue"}
                ]}
            ]}"#,
        );

        let orchestrator = PipelineOrchestrator::new(config_for(&dir)).unwrap();
        let result = orchestrator.run().await.unwrap();

        // No abort anywhere, but the pre-publish validation gate failed.
        assert!(result.phases.values().all(|p| !p.is_aborted()));
        assert_eq!(result.gate, Gate::Fail);
    }

    #[tokio::test]
    async fn test_result_document_always_written() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            &dir,
            r#"{"phases": [
                {"name": "fetch", "steps": [
                    {"name": "scores", "command": "exit 1", "errorPolicy": "required"}
                ]}
            ]}"#,
        );

        let config = config_for(&dir);
        let result_path = config.result_path.clone();
        let orchestrator = PipelineOrchestrator::new(config).unwrap();
        orchestrator.run().await.unwrap();

        let raw = std::fs::read_to_string(&result_path).unwrap();
        let parsed: PipelineResult = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.gate, Gate::Fail);
        assert!(parsed.run_id.starts_with("run-"));

        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(doc.get("startedAt").is_some());
        assert!(doc.get("completedAt").is_some());
        assert!(doc.get("duration").is_some());
    }

    #[tokio::test]
    async fn test_manifest_error_writes_partial_result() {
        let dir = TempDir::new().unwrap();
        write_manifest(&dir, "{ not json");

        let config = config_for(&dir);
        let result_path = config.result_path.clone();
        let orchestrator = PipelineOrchestrator::new(config).unwrap();

        let err = orchestrator.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::Manifest(_)));

        // A partial gate=fail document exists for downstream tooling.
        let parsed: PipelineResult =
            serde_json::from_str(&std::fs::read_to_string(&result_path).unwrap()).unwrap();
        assert_eq!(parsed.gate, Gate::Fail);
        assert!(parsed.phases.is_empty());
        assert_eq!(parsed.summary, RunSummary::default());
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        write_atomic(&path, "{\"a\": 1}").unwrap();
        write_atomic(&path, "{\"a\": 2}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\": 2}");
    }
}
