//! Phase runner: drives a group of steps and reduces their outcomes.

use futures::future::join_all;
use tracing::{info, warn};

use crate::manifest::{ErrorPolicy, PhaseSpec};

use super::executor::StepExecutor;
use super::result::{PhaseResult, PhaseStatus, StepResult};

/// Runs the steps of one phase, sequentially or concurrently.
#[derive(Debug, Clone)]
pub struct PhaseRunner {
    executor: StepExecutor,
}

impl PhaseRunner {
    /// Creates a phase runner around the given step executor.
    pub fn new(executor: StepExecutor) -> Self {
        Self { executor }
    }

    /// Runs a phase to completion and aggregates the step results.
    ///
    /// Sequential phases stop at the first failed `required` step; the
    /// remaining steps never execute and do not appear in the result.
    /// Parallel phases launch every step at once and always await all of
    /// them, even when one fails; results keep declared order.
    pub async fn run(&self, phase: &PhaseSpec) -> PhaseResult {
        info!(
            "Running phase '{}' ({} steps, {})",
            phase.name,
            phase.steps.len(),
            if phase.parallel { "parallel" } else { "sequential" }
        );

        let (steps, aborted_by) = if phase.parallel {
            self.run_parallel(phase).await
        } else {
            self.run_sequential(phase).await
        };

        let status = PhaseStatus::reduce(&steps, aborted_by.is_some());
        if let Some(step) = &aborted_by {
            warn!("Phase '{}' aborted by required step '{}'", phase.name, step);
        }

        PhaseResult {
            name: phase.name.clone(),
            status,
            steps,
            aborted_by,
        }
    }

    async fn run_sequential(&self, phase: &PhaseSpec) -> (Vec<StepResult>, Option<String>) {
        let mut results = Vec::with_capacity(phase.steps.len());

        for step in &phase.steps {
            let result = self.executor.execute(step).await;
            let failed = result.is_failed();
            results.push(result);

            if failed && step.error_policy == ErrorPolicy::Required {
                return (results, Some(step.name.clone()));
            }
        }

        (results, None)
    }

    async fn run_parallel(&self, phase: &PhaseSpec) -> (Vec<StepResult>, Option<String>) {
        // join_all preserves input order, so results come back in declared
        // order regardless of completion order.
        let futures: Vec<_> = phase
            .steps
            .iter()
            .map(|step| self.executor.execute(step))
            .collect();
        let results = join_all(futures).await;

        // Abort semantics are defined at the sequential level; here every
        // sibling has already been awaited. A failed required step still
        // marks the phase aborted so the orchestrator stops after it.
        let aborted_by = phase
            .steps
            .iter()
            .zip(&results)
            .find(|(step, result)| {
                result.is_failed() && step.error_policy == ErrorPolicy::Required
            })
            .map(|(step, _)| step.name.clone());

        (results, aborted_by)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::manifest::StepSpec;
    use crate::runner::result::StepStatus;

    fn runner() -> PhaseRunner {
        PhaseRunner::new(StepExecutor::new(Duration::from_secs(10)))
    }

    fn phase(name: &str, parallel: bool, steps: Vec<StepSpec>) -> PhaseSpec {
        PhaseSpec {
            name: name.to_string(),
            description: String::new(),
            parallel,
            steps,
        }
    }

    #[tokio::test]
    async fn test_sequential_required_failure_aborts() {
        let spec = phase(
            "build",
            false,
            vec![
                StepSpec::new("a", "exit 1", ErrorPolicy::Required),
                StepSpec::new("b", "exit 0", ErrorPolicy::Continue),
            ],
        );

        let result = runner().run(&spec).await;
        assert_eq!(result.status, PhaseStatus::Failed);
        assert_eq!(result.aborted_by.as_deref(), Some("a"));
        // B never executed.
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].name, "a");
    }

    #[tokio::test]
    async fn test_sequential_continue_failure_is_partial() {
        let spec = phase(
            "build",
            false,
            vec![
                StepSpec::new("a", "exit 1", ErrorPolicy::Continue),
                StepSpec::new("b", "exit 0", ErrorPolicy::Required),
            ],
        );

        let result = runner().run(&spec).await;
        assert_eq!(result.status, PhaseStatus::Partial);
        assert!(result.aborted_by.is_none());
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].status, StepStatus::Failed);
        assert_eq!(result.steps[1].status, StepStatus::Success);
    }

    #[tokio::test]
    async fn test_all_success() {
        let spec = phase(
            "fetch",
            false,
            vec![
                StepSpec::new("a", "exit 0", ErrorPolicy::Required),
                StepSpec::new("b", "exit 0", ErrorPolicy::Continue),
            ],
        );

        let result = runner().run(&spec).await;
        assert_eq!(result.status, PhaseStatus::Success);
        assert_eq!(result.steps.len(), 2);
    }

    #[tokio::test]
    async fn test_skipped_steps_keep_phase_successful() {
        let spec = phase(
            "fetch",
            false,
            vec![
                StepSpec::new("a", "exit 0", ErrorPolicy::Required),
                StepSpec::new("b", "exit 0", ErrorPolicy::Required)
                    .with_requires("MATCHDAY_PHASE_TEST_UNSET"),
            ],
        );

        let result = runner().run(&spec).await;
        assert_eq!(result.status, PhaseStatus::Success);
        assert_eq!(result.steps[1].status, StepStatus::Skipped);
    }

    #[tokio::test]
    async fn test_parallel_runs_concurrently() {
        let spec = phase(
            "fetch",
            true,
            vec![
                StepSpec::new("a", "sleep 0.3", ErrorPolicy::Continue),
                StepSpec::new("b", "sleep 0.3", ErrorPolicy::Continue),
            ],
        );

        let start = Instant::now();
        let result = runner().run(&spec).await;
        let elapsed = start.elapsed();

        assert_eq!(result.status, PhaseStatus::Success);
        assert_eq!(result.steps.len(), 2);
        assert!(result.steps.iter().all(|s| s.status == StepStatus::Success));
        // Well under the 0.6s a sequential run would take.
        assert!(elapsed < Duration::from_millis(550), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_parallel_awaits_siblings_of_failure() {
        let spec = phase(
            "fetch",
            true,
            vec![
                StepSpec::new("bad", "exit 1", ErrorPolicy::Required),
                StepSpec::new("slow", "sleep 0.2", ErrorPolicy::Continue),
            ],
        );

        let result = runner().run(&spec).await;
        // Both steps present: the sibling was awaited, not interrupted.
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].name, "bad");
        assert_eq!(result.steps[0].status, StepStatus::Failed);
        assert_eq!(result.steps[1].status, StepStatus::Success);
        // Required failure still aborts at phase scope.
        assert_eq!(result.status, PhaseStatus::Failed);
        assert_eq!(result.aborted_by.as_deref(), Some("bad"));
    }

    #[tokio::test]
    async fn test_parallel_results_keep_declared_order() {
        let spec = phase(
            "fetch",
            true,
            vec![
                StepSpec::new("slowest", "sleep 0.3", ErrorPolicy::Continue),
                StepSpec::new("middle", "sleep 0.1", ErrorPolicy::Continue),
                StepSpec::new("fastest", "exit 0", ErrorPolicy::Continue),
            ],
        );

        let result = runner().run(&spec).await;
        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["slowest", "middle", "fastest"]);
    }
}
