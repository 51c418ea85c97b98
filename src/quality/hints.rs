//! Adaptive correction hints.
//!
//! Turns rolling averages over the quality history into fixed
//! natural-language directives for the next generation attempt. The rule
//! table is static: one threshold and one instruction per tracked metric,
//! each evaluated independently, so several hints can fire at once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::history::{QualityHistory, QualitySnapshot};

/// Minimum history length before hints are derived. Fewer entries would
/// just react to noise.
const MIN_HISTORY: usize = 3;

/// Rolling window the metric averages are computed over.
const WINDOW: usize = 5;

/// One row of the hint table.
struct MetricRule {
    /// Metric key, matching the snapshot sub-score.
    metric: &'static str,
    /// Average below this fires the rule.
    threshold: f64,
    /// Corrective instruction injected into the next generation prompt.
    instruction: &'static str,
    /// Extracts the sub-score from a snapshot.
    extract: fn(&QualitySnapshot) -> Option<f64>,
}

const RULES: &[MetricRule] = &[
    MetricRule {
        metric: "editorial",
        threshold: 70.0,
        instruction: "Tighten the editorial blocks: lead with the headline result and keep \
                      every block within its word budget.",
        extract: |s| s.editorial,
    },
    MetricRule {
        metric: "enrichment",
        threshold: 60.0,
        instruction: "Work the fetched statistics into the commentary; do not restate bare \
                      scorelines without context.",
        extract: |s| s.enrichment,
    },
    MetricRule {
        metric: "featured",
        threshold: 60.0,
        instruction: "Give the featured match a dedicated card with a title and a concrete \
                      storyline, not a generic summary.",
        extract: |s| s.featured,
    },
    MetricRule {
        metric: "watch_plan",
        threshold: 80.0,
        instruction: "Every high-importance fixture must appear in the watch plan; do not \
                      omit any must-watch match.",
        extract: |s| s.watch_plan,
    },
];

/// Hints plus the rolling metric averages they were derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintReport {
    /// Corrective instructions, at most one per metric.
    pub hints: Vec<String>,
    /// Rolling averages keyed by metric name; metrics with no recorded
    /// values in the window are absent.
    pub metrics: HashMap<String, f64>,
}

impl HintReport {
    /// Report with no hints and no metrics.
    pub fn empty() -> Self {
        Self {
            hints: Vec::new(),
            metrics: HashMap::new(),
        }
    }
}

/// Derives corrective hints from the quality history.
///
/// Stateless given the history window: the same history always produces
/// the same report.
pub fn build_hints(history: &QualityHistory) -> HintReport {
    if history.len() < MIN_HISTORY {
        debug!(
            "History has {} entries (< {}), no hints derived",
            history.len(),
            MIN_HISTORY
        );
        return HintReport::empty();
    }

    let window = history.recent(WINDOW);
    let mut report = HintReport::empty();

    for rule in RULES {
        let values: Vec<f64> = window.iter().filter_map(rule.extract).collect();
        if values.is_empty() {
            continue;
        }

        let average = values.iter().sum::<f64>() / values.len() as f64;
        report.metrics.insert(rule.metric.to_string(), average);

        if average < rule.threshold {
            debug!(
                "Metric '{}' average {:.1} below threshold {:.1}",
                rule.metric, average, rule.threshold
            );
            report.hints.push(rule.instruction.to_string());
        }
    }

    report
}
