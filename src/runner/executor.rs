//! Step executor: runs one manifest step as a bounded subprocess.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::manifest::StepSpec;

use super::categorize::{categorize_error, ErrorCategory};
use super::result::StepResult;

/// Executes single steps with environment gating and a wall-clock timeout.
///
/// `execute` is total: every outcome, including spawn failures and
/// timeouts, is reported as a [`StepResult`] rather than raised. The same
/// async call serves sequential phases (awaited one at a time) and
/// parallel phases (joined as concurrent tasks).
#[derive(Debug, Clone)]
pub struct StepExecutor {
    default_timeout: Duration,
}

impl StepExecutor {
    /// Creates an executor with the given default step timeout.
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    /// Runs one step to completion and reports the outcome.
    ///
    /// Precondition gate: when `step.requires` names unset environment
    /// variables the step is skipped without spawning anything. Otherwise
    /// the command runs under `sh -c` with piped output, bounded by the
    /// step's timeout override or the executor default. The subprocess may
    /// have external side effects; failure handling here is about
    /// reporting, not undoing.
    pub async fn execute(&self, step: &StepSpec) -> StepResult {
        if let Some(missing) = missing_env(&step.requires) {
            debug!("Skipping step '{}': {}", step.name, missing);
            return StepResult::skipped(&step.name, missing);
        }

        let timeout = step.effective_timeout(self.default_timeout);
        let start = Instant::now();

        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&step.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout must take the process
            // down with it.
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                let message = format!("Command failed to spawn: {}", e);
                warn!("Step '{}' failed: {}", step.name, message);
                return StepResult::failed(
                    &step.name,
                    start.elapsed(),
                    &message,
                    categorize_error(&message),
                );
            }
        };

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let duration = start.elapsed();
                let exit_code = output.status.code().unwrap_or(-1);

                if output.status.success() {
                    debug!("Step '{}' succeeded in {:?}", step.name, duration);
                    return StepResult::success(&step.name, duration, exit_code);
                }

                let stderr = String::from_utf8_lossy(&output.stderr);
                let message = if stderr.trim().is_empty() {
                    format!("Command failed with exit code {}", exit_code)
                } else {
                    format!("exit code {}: {}", exit_code, stderr.trim())
                };
                warn!("Step '{}' failed: {}", step.name, message);
                StepResult::failed(
                    &step.name,
                    duration,
                    &message,
                    categorize_error(&message),
                )
                .with_exit_code(exit_code)
            }
            Ok(Err(e)) => {
                let message = format!("Command failed: {}", e);
                warn!("Step '{}' failed: {}", step.name, message);
                StepResult::failed(
                    &step.name,
                    start.elapsed(),
                    &message,
                    categorize_error(&message),
                )
            }
            Err(_) => {
                // The elapsed timeout dropped the wait future, which killed
                // the subprocess via kill_on_drop.
                let message = format!("timed out after {}s", timeout.as_secs());
                warn!("Step '{}' {}", step.name, message);
                StepResult::failed(&step.name, start.elapsed(), &message, ErrorCategory::Timeout)
            }
        }
    }
}

/// Returns a skip reason when any required environment variable is unset
/// or empty.
fn missing_env(requires: &[String]) -> Option<String> {
    let missing: Vec<&str> = requires
        .iter()
        .filter(|name| std::env::var(name.as_str()).map_or(true, |v| v.is_empty()))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        None
    } else {
        Some(format!("missing env: {}", missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ErrorPolicy;
    use crate::runner::result::StepStatus;

    fn executor() -> StepExecutor {
        StepExecutor::new(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_successful_command() {
        let step = StepSpec::new("ok", "exit 0", ErrorPolicy::Continue);
        let result = executor().execute(&step).await;
        assert_eq!(result.status, StepStatus::Success);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_failing_command_captures_stderr() {
        let step = StepSpec::new(
            "bad",
            "echo 'Validation failed: missing section' >&2; exit 3",
            ErrorPolicy::Continue,
        );
        let result = executor().execute(&step).await;
        assert_eq!(result.status, StepStatus::Failed);
        assert_eq!(result.exit_code, Some(3));
        assert!(result.error.as_deref().unwrap().contains("Validation failed"));
        assert_eq!(result.error_category, Some(ErrorCategory::Validation));
    }

    #[tokio::test]
    async fn test_failing_command_without_stderr() {
        let step = StepSpec::new("bad", "exit 7", ErrorPolicy::Continue);
        let result = executor().execute(&step).await;
        assert_eq!(result.status, StepStatus::Failed);
        assert!(result.error.as_deref().unwrap().contains("exit code 7"));
        assert_eq!(result.error_category, Some(ErrorCategory::Command));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let step =
            StepSpec::new("slow", "sleep 5", ErrorPolicy::Continue).with_timeout_secs(1);
        let start = Instant::now();
        let result = executor().execute(&step).await;
        assert_eq!(result.status, StepStatus::Failed);
        assert_eq!(result.error_category, Some(ErrorCategory::Timeout));
        assert!(result.error.as_deref().unwrap().contains("timed out"));
        // Must return at the timeout, not after the full sleep.
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_missing_env_skips_without_running() {
        let marker = std::env::temp_dir().join("matchday-env-gate-test");
        let _ = std::fs::remove_file(&marker);

        let step = StepSpec::new(
            "gated",
            format!("touch {}", marker.display()),
            ErrorPolicy::Required,
        )
        .with_requires("MATCHDAY_TEST_UNSET_VAR");

        let result = executor().execute(&step).await;
        assert_eq!(result.status, StepStatus::Skipped);
        assert_eq!(
            result.reason.as_deref(),
            Some("missing env: MATCHDAY_TEST_UNSET_VAR")
        );
        // The gate is pure: the command never ran.
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_present_env_passes_gate() {
        std::env::set_var("MATCHDAY_TEST_SET_VAR", "1");
        let step = StepSpec::new("gated", "exit 0", ErrorPolicy::Continue)
            .with_requires("MATCHDAY_TEST_SET_VAR");
        let result = executor().execute(&step).await;
        assert_eq!(result.status, StepStatus::Success);
    }

    #[test]
    fn test_missing_env_lists_all_names() {
        let reason = missing_env(&[
            "MATCHDAY_TEST_MISSING_A".to_string(),
            "MATCHDAY_TEST_MISSING_B".to_string(),
        ])
        .unwrap();
        assert_eq!(
            reason,
            "missing env: MATCHDAY_TEST_MISSING_A, MATCHDAY_TEST_MISSING_B"
        );
    }
}
