//! Manifest loading and validation.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use super::model::Manifest;

/// Errors that can occur while loading or validating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Manifest has no phases")]
    NoPhases,

    #[error("Duplicate phase name '{0}'")]
    DuplicatePhase(String),

    #[error("Phase {0} has no name")]
    UnnamedPhase(usize),

    #[error("Phase '{0}' has no steps")]
    EmptyPhase(String),

    #[error("Step {index} in phase '{phase}' has no name")]
    UnnamedStep { phase: String, index: usize },

    #[error("Step '{step}' in phase '{phase}' has an empty command")]
    EmptyCommand { phase: String, step: String },

    #[error("Duplicate step name '{step}' in phase '{phase}'")]
    DuplicateStep { phase: String, step: String },

    #[error("Step '{step}' in phase '{phase}' has a zero timeout")]
    ZeroTimeout { phase: String, step: String },
}

impl Manifest {
    /// Loads and validates a manifest from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let manifest = Self::from_json(&content)?;
        debug!(
            "Loaded manifest from {} ({} phases, {} steps)",
            path.display(),
            manifest.phases.len(),
            manifest.step_count()
        );
        Ok(manifest)
    }

    /// Parses and validates a manifest from a JSON string.
    ///
    /// Unknown error policies and missing required fields surface as
    /// `ManifestError::Parse` with the serde context; structural problems
    /// (empty phases, duplicate names, empty commands) get their own
    /// variants so callers can report exactly what is wrong.
    pub fn from_json(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validates manifest invariants beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.phases.is_empty() {
            return Err(ManifestError::NoPhases);
        }

        let mut phase_names = HashSet::new();
        for (phase_idx, phase) in self.phases.iter().enumerate() {
            if phase.name.trim().is_empty() {
                return Err(ManifestError::UnnamedPhase(phase_idx));
            }
            if !phase_names.insert(phase.name.as_str()) {
                return Err(ManifestError::DuplicatePhase(phase.name.clone()));
            }
            if phase.steps.is_empty() {
                return Err(ManifestError::EmptyPhase(phase.name.clone()));
            }

            let mut step_names = HashSet::new();
            for (step_idx, step) in phase.steps.iter().enumerate() {
                if step.name.trim().is_empty() {
                    return Err(ManifestError::UnnamedStep {
                        phase: phase.name.clone(),
                        index: step_idx,
                    });
                }
                if !step_names.insert(step.name.as_str()) {
                    return Err(ManifestError::DuplicateStep {
                        phase: phase.name.clone(),
                        step: step.name.clone(),
                    });
                }
                if step.command.trim().is_empty() {
                    return Err(ManifestError::EmptyCommand {
                        phase: phase.name.clone(),
                        step: step.name.clone(),
                    });
                }
                if step.timeout == Some(0) {
                    return Err(ManifestError::ZeroTimeout {
                        phase: phase.name.clone(),
                        step: step.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
