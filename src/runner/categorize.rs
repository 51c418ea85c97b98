//! Step failure classification.
//!
//! Failures reported by subprocesses arrive as free-form text. A small
//! ordered rule table maps that text onto a fixed category taxonomy so the
//! pipeline result stays machine-readable. The table is evaluated
//! top-to-bottom and the first matching rule wins.

use serde::{Deserialize, Serialize};

/// Category of a step execution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The step exceeded its wall-clock timeout.
    Timeout,
    /// Connection-level network failure.
    Network,
    /// Authentication or authorization failure.
    Auth,
    /// Malformed data that could not be parsed.
    Parse,
    /// Schema or content validation failure.
    Validation,
    /// The command itself failed to run or exited non-zero.
    Command,
    /// No rule matched.
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Command => "command",
            ErrorCategory::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Ordered classification rules: lowercase needles per category.
/// Precedence is top-to-bottom; do not reorder without updating the tests
/// that pin it.
const RULES: &[(&[&str], ErrorCategory)] = &[
    (
        &["etimedout", "timed out", "timeout"],
        ErrorCategory::Timeout,
    ),
    (
        &[
            "econnrefused",
            "econnreset",
            "enotfound",
            "fetch failed",
            "network error",
        ],
        ErrorCategory::Network,
    ),
    (
        &["401", "403", "authentication", "unauthorized", "forbidden"],
        ErrorCategory::Auth,
    ),
    (
        &["unexpected token", "syntaxerror", "parse"],
        ErrorCategory::Parse,
    ),
    (
        &["validation failed", "invalid schema", "validation"],
        ErrorCategory::Validation,
    ),
    (
        &["command failed", "command not found", "enoent", "exit code"],
        ErrorCategory::Command,
    ),
];

/// Classifies a failure message into an [`ErrorCategory`].
///
/// Pure and total: never panics, matching is case-insensitive, and an
/// unmatched message maps to [`ErrorCategory::Unknown`].
pub fn categorize_error(message: &str) -> ErrorCategory {
    let haystack = message.to_lowercase();
    for (needles, category) in RULES {
        if needles.iter().any(|needle| haystack.contains(needle)) {
            return *category;
        }
    }
    ErrorCategory::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_examples() {
        assert_eq!(categorize_error("ETIMEDOUT: x"), ErrorCategory::Timeout);
        assert_eq!(categorize_error("ECONNREFUSED"), ErrorCategory::Network);
        assert_eq!(
            categorize_error("HTTP 401 Unauthorized"),
            ErrorCategory::Auth
        );
        assert_eq!(categorize_error("Unexpected token <"), ErrorCategory::Parse);
        assert_eq!(
            categorize_error("Validation failed: y"),
            ErrorCategory::Validation
        );
        assert_eq!(
            categorize_error("ENOENT: no such file"),
            ErrorCategory::Command
        );
        assert_eq!(categorize_error("something weird"), ErrorCategory::Unknown);
    }

    #[test]
    fn test_first_match_wins() {
        // Timeout outranks command even when both match.
        assert_eq!(
            categorize_error("Command failed: request timed out"),
            ErrorCategory::Timeout
        );
        // Network outranks auth.
        assert_eq!(
            categorize_error("ECONNRESET while fetching 401 page"),
            ErrorCategory::Network
        );
        // Parse outranks validation.
        assert_eq!(
            categorize_error("SyntaxError during validation"),
            ErrorCategory::Parse
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(categorize_error("request TIMED OUT"), ErrorCategory::Timeout);
        assert_eq!(categorize_error("fetch FAILED"), ErrorCategory::Network);
    }

    #[test]
    fn test_total_on_edge_inputs() {
        assert_eq!(categorize_error(""), ErrorCategory::Unknown);
        assert_eq!(categorize_error("   "), ErrorCategory::Unknown);
        assert_eq!(categorize_error("日本語のエラー"), ErrorCategory::Unknown);
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(ErrorCategory::Timeout.to_string(), "timeout");
        assert_eq!(
            serde_json::to_string(&ErrorCategory::Network).unwrap(),
            "\"network\""
        );
    }
}
