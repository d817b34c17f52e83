//! The ordered severity scale for check outcomes.

use serde::{Deserialize, Serialize};

/// Severity of a check outcome.
///
/// The declaration order is the aggregation order: `Ok` is least severe,
/// `HealthCheckError` most severe. `TemporarilyUnavailable` sits between
/// `Warn` and `Critical` by policy — it is advisory until the grace
/// period expires, but still outranks a plain warning in summaries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Ok,
    Warn,
    TemporarilyUnavailable,
    Critical,
    HealthCheckError,
}

impl Severity {
    /// Returns the more severe of two severities.
    pub fn worst(a: Severity, b: Severity) -> Severity {
        a.max(b)
    }

    /// Whether this severity is `Ok`.
    pub fn is_ok(self) -> bool {
        self == Severity::Ok
    }

    /// All severities that count as "not OK" for the sticky index,
    /// least severe first.
    pub fn not_ok() -> [Severity; 4] {
        [
            Severity::Warn,
            Severity::TemporarilyUnavailable,
            Severity::Critical,
            Severity::HealthCheckError,
        ]
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Ok => "OK",
            Severity::Warn => "WARN",
            Severity::TemporarilyUnavailable => "TEMPORARILY_UNAVAILABLE",
            Severity::Critical => "CRITICAL",
            Severity::HealthCheckError => "HEALTH_CHECK_ERROR",
        };
        write!(f, "{name}")
    }
}
