//! Execution results and their aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::{CheckId, CheckMetadata, ResultLog, Severity};

/// Outcome of one check execution. Immutable once constructed — policy
/// layers (stickiness, grace escalation) produce new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub check_id: CheckId,
    pub check_name: String,
    pub severity: Severity,
    pub log: ResultLog,
    /// Wall-clock moment the execution finished (or, for synthetic
    /// timeout results, the moment the caller gave up waiting).
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Wrap a completed routine's log; severity is the log's most
    /// severe entry.
    pub fn from_log(
        metadata: &CheckMetadata,
        log: ResultLog,
        elapsed_ms: u64,
        timed_out: bool,
    ) -> Self {
        Self {
            check_id: metadata.id.clone(),
            check_name: metadata.name.clone(),
            severity: log.aggregate_status(),
            log,
            finished_at: Utc::now(),
            elapsed_ms,
            timed_out,
        }
    }

    /// Batch ordering: most severe first, then name, then id.
    pub fn sort_batch(results: &mut [ExecutionResult]) {
        results.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.check_name.cmp(&b.check_name))
                .then_with(|| a.check_id.cmp(&b.check_id))
        });
    }
}

/// Most-severe-wins fold over a batch of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    pub severity: Severity,
    /// Summary line, e.g. `"Overall status CRITICAL"`.
    pub message: String,
    /// Largest elapsed time across the inputs.
    pub elapsed_ms: u64,
    /// Latest finish time across the inputs.
    pub finished_at: DateTime<Utc>,
    pub timed_out: bool,
    pub results: Vec<ExecutionResult>,
}

impl CombinedResult {
    /// Pure fold, no side effects. An empty input combines to `Ok`.
    pub fn combine(results: Vec<ExecutionResult>) -> Self {
        let severity = results
            .iter()
            .fold(Severity::Ok, |acc, r| Severity::worst(acc, r.severity));
        let elapsed_ms = results.iter().map(|r| r.elapsed_ms).max().unwrap_or(0);
        let finished_at = results
            .iter()
            .map(|r| r.finished_at)
            .max()
            .unwrap_or_else(Utc::now);
        let timed_out = results.iter().any(|r| r.timed_out);

        Self {
            severity,
            message: format!("Overall status {severity}"),
            elapsed_ms,
            finished_at,
            timed_out,
            results,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.severity.is_ok()
    }

    pub fn has_timed_out(&self) -> bool {
        self.timed_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn result(name: &str, severity: Severity, elapsed_ms: u64, timed_out: bool) -> ExecutionResult {
        ExecutionResult {
            check_id: name.to_string(),
            check_name: name.to_string(),
            severity,
            log: ResultLog::single(severity, "entry"),
            finished_at: Utc::now(),
            elapsed_ms,
            timed_out,
        }
    }

    #[test]
    fn from_log_derives_severity() {
        let metadata = CheckMetadata::new("db", "Database");
        let mut log = ResultLog::new();
        log.info("reachable");
        log.warn("slow");
        let r = ExecutionResult::from_log(&metadata, log, 12, false);
        assert_eq!(r.severity, Severity::Warn);
        assert_eq!(r.check_id, "db");
        assert!(!r.timed_out);
    }

    #[test]
    fn sort_batch_orders_by_severity_then_name() {
        let mut batch = vec![
            result("b-ok", Severity::Ok, 1, false),
            result("z-critical", Severity::Critical, 1, false),
            result("a-ok", Severity::Ok, 1, false),
            result("m-warn", Severity::Warn, 1, false),
        ];
        ExecutionResult::sort_batch(&mut batch);
        let names: Vec<_> = batch.iter().map(|r| r.check_name.as_str()).collect();
        assert_eq!(names, vec!["z-critical", "m-warn", "a-ok", "b-ok"]);
    }

    #[test]
    fn combine_is_most_severe_wins() {
        let combined = CombinedResult::combine(vec![
            result("a", Severity::Ok, 10, false),
            result("b", Severity::Warn, 20, false),
            result("c", Severity::Critical, 5, false),
        ]);
        assert_eq!(combined.severity, Severity::Critical);
        assert_eq!(combined.message, "Overall status CRITICAL");
        assert_eq!(combined.elapsed_ms, 20);
        assert!(!combined.has_timed_out());
    }

    #[test]
    fn combine_all_ok() {
        let combined =
            CombinedResult::combine(vec![result("a", Severity::Ok, 1, false), result("b", Severity::Ok, 2, false)]);
        assert_eq!(combined.severity, Severity::Ok);
        assert!(combined.is_ok());
    }

    #[test]
    fn combine_takes_latest_finish_and_any_timeout() {
        let mut early = result("a", Severity::Ok, 1, false);
        early.finished_at = Utc::now() - TimeDelta::seconds(30);
        let late = result("b", Severity::Warn, 2, true);
        let late_finish = late.finished_at;

        let combined = CombinedResult::combine(vec![early, late]);
        assert_eq!(combined.finished_at, late_finish);
        assert!(combined.has_timed_out());
    }

    #[test]
    fn combine_empty_is_ok() {
        let combined = CombinedResult::combine(Vec::new());
        assert!(combined.is_ok());
        assert_eq!(combined.elapsed_ms, 0);
    }
}
