//! Manifest data model.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for a pipeline run: an ordered list of phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Phases, executed strictly in declared order.
    pub phases: Vec<PhaseSpec>,
}

fn default_version() -> u32 {
    1
}

impl Manifest {
    /// Looks up a phase by name.
    pub fn phase(&self, name: &str) -> Option<&PhaseSpec> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Total number of steps across all phases.
    pub fn step_count(&self) -> usize {
        self.phases.iter().map(|p| p.steps.len()).sum()
    }
}

/// A named, ordered group of steps.
///
/// Steps within a phase run either all concurrently or all in declared
/// order, never mixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSpec {
    /// Unique phase name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// When true, all steps launch as concurrent tasks.
    #[serde(default)]
    pub parallel: bool,
    /// Steps in declared order.
    pub steps: Vec<StepSpec>,
}

/// One schedulable unit of work: a subprocess invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    /// Step name, unique within its phase.
    pub name: String,
    /// Shell command to execute.
    pub command: String,
    /// What happens to the phase when this step fails.
    #[serde(rename = "errorPolicy")]
    pub error_policy: ErrorPolicy,
    /// Environment variables that must be set for the step to run.
    /// Missing variables skip the step without attempting execution.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Per-step timeout override in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl StepSpec {
    /// Creates a step with the given name, command and error policy.
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        error_policy: ErrorPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            error_policy,
            requires: Vec::new(),
            timeout: None,
        }
    }

    /// Adds a required environment variable.
    pub fn with_requires(mut self, var: impl Into<String>) -> Self {
        self.requires.push(var.into());
        self
    }

    /// Sets the per-step timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    /// Effective timeout for this step given the pipeline default.
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.map(Duration::from_secs).unwrap_or(default)
    }
}

/// Error policy for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log the failure and proceed with the rest of the phase.
    Continue,
    /// Abort the phase and all subsequent phases on failure.
    Required,
}

impl std::fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorPolicy::Continue => write!(f, "continue"),
            ErrorPolicy::Required => write!(f, "required"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_effective_timeout() {
        let default = Duration::from_secs(120);

        let step = StepSpec::new("fetch", "echo hi", ErrorPolicy::Continue);
        assert_eq!(step.effective_timeout(default), default);

        let step = step.with_timeout_secs(5);
        assert_eq!(step.effective_timeout(default), Duration::from_secs(5));
    }

    #[test]
    fn test_error_policy_serde_roundtrip() {
        let json = serde_json::to_string(&ErrorPolicy::Required).unwrap();
        assert_eq!(json, "\"required\"");

        let policy: ErrorPolicy = serde_json::from_str("\"continue\"").unwrap();
        assert_eq!(policy, ErrorPolicy::Continue);
    }

    #[test]
    fn test_error_policy_rejects_unknown() {
        let result: Result<ErrorPolicy, _> = serde_json::from_str("\"retry\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_manifest_lookup_and_counts() {
        let manifest = Manifest {
            version: 1,
            phases: vec![
                PhaseSpec {
                    name: "fetch".to_string(),
                    description: String::new(),
                    parallel: true,
                    steps: vec![
                        StepSpec::new("scores", "echo scores", ErrorPolicy::Required),
                        StepSpec::new("standings", "echo standings", ErrorPolicy::Continue),
                    ],
                },
                PhaseSpec {
                    name: "build".to_string(),
                    description: String::new(),
                    parallel: false,
                    steps: vec![StepSpec::new("render", "echo render", ErrorPolicy::Required)],
                },
            ],
        };

        assert_eq!(manifest.step_count(), 3);
        assert!(manifest.phase("fetch").is_some());
        assert!(manifest.phase("publish").is_none());
    }
}
