//! Pipeline configuration.
//!
//! Paths for the manifest and the run artifacts, the default step timeout,
//! and the designation of the pre-publish gate step. Values come from
//! defaults, environment variables, or builder calls.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the pipeline orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to the pipeline manifest document.
    pub manifest_path: PathBuf,
    /// Path the pipeline result document is written to after every run.
    pub result_path: PathBuf,
    /// Path of the quality history document.
    pub history_path: PathBuf,
    /// Default wall-clock timeout for steps without an override.
    pub default_step_timeout: Duration,
    /// Phase holding the pre-publish validation gate step.
    pub gate_phase: String,
    /// Step within `gate_phase` whose failure fails the gate even under a
    /// `continue` error policy.
    pub gate_step: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("pipeline.manifest.json"),
            result_path: PathBuf::from("pipeline-result.json"),
            history_path: PathBuf::from("quality-history.json"),
            default_step_timeout: Duration::from_secs(300),
            gate_phase: "finalize".to_string(),
            gate_step: "validate".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MATCHDAY_MANIFEST`: manifest path (default: pipeline.manifest.json)
    /// - `MATCHDAY_RESULT`: result document path (default: pipeline-result.json)
    /// - `MATCHDAY_HISTORY`: quality history path (default: quality-history.json)
    /// - `MATCHDAY_STEP_TIMEOUT_SECS`: default step timeout (default: 300)
    /// - `MATCHDAY_GATE_PHASE`: gate phase name (default: finalize)
    /// - `MATCHDAY_GATE_STEP`: gate step name (default: validate)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MATCHDAY_MANIFEST") {
            config.manifest_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("MATCHDAY_RESULT") {
            config.result_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("MATCHDAY_HISTORY") {
            config.history_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("MATCHDAY_STEP_TIMEOUT_SECS") {
            let secs: u64 = val.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MATCHDAY_STEP_TIMEOUT_SECS".to_string(),
                message: format!("could not parse '{}'", val),
            })?;
            config.default_step_timeout = Duration::from_secs(secs);
        }
        if let Ok(val) = std::env::var("MATCHDAY_GATE_PHASE") {
            config.gate_phase = val;
        }
        if let Ok(val) = std::env::var("MATCHDAY_GATE_STEP") {
            config.gate_step = val;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_step_timeout.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "default_step_timeout must be greater than 0".to_string(),
            ));
        }
        if self.gate_phase.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "gate_phase cannot be empty".to_string(),
            ));
        }
        if self.gate_step.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "gate_step cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder method to set the manifest path.
    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    /// Builder method to set the result document path.
    pub fn with_result_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.result_path = path.into();
        self
    }

    /// Builder method to set the quality history path.
    pub fn with_history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = path.into();
        self
    }

    /// Builder method to set the default step timeout.
    pub fn with_default_step_timeout(mut self, timeout: Duration) -> Self {
        self.default_step_timeout = timeout;
        self
    }

    /// Builder method to designate the gate phase and step.
    pub fn with_gate(mut self, phase: impl Into<String>, step: impl Into<String>) -> Self {
        self.gate_phase = phase.into();
        self.gate_step = step.into();
        self
    }
}
