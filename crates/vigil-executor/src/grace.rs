//! Grace-period tracking for the transient status.
//!
//! A check reporting TEMPORARILY_UNAVAILABLE is tolerated for a grace
//! period before it is treated as CRITICAL. One "first seen" timestamp
//! per check is all the state needed: it is set when a transient streak
//! starts, left alone while the streak continues, and cleared the
//! moment the check reports anything else — so a recovered check that
//! later flaps again starts a fresh grace timer.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::debug;

use vigil_core::{CheckId, Severity};

use crate::result::ExecutionResult;

/// Tracks how long each check has been continuously
/// TEMPORARILY_UNAVAILABLE.
#[derive(Clone, Default)]
pub struct GracePeriodEvaluator {
    first_seen: Arc<DashMap<CheckId, DateTime<Utc>>>,
}

impl GracePeriodEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one completed result into the state machine. Called from
    /// task completion callbacks, including late ones.
    pub fn ingest(&self, result: &ExecutionResult) {
        if result.severity == Severity::TemporarilyUnavailable {
            // Keep the original first-seen time; the streak is measured
            // from its first occurrence.
            self.first_seen
                .entry(result.check_id.clone())
                .or_insert(result.finished_at);
        } else if self.first_seen.remove(&result.check_id).is_some() {
            debug!(check_id = %result.check_id, severity = %result.severity, "transient streak ended");
        }
    }

    /// Escalate a result to CRITICAL if its transient streak has
    /// outlived `grace_period_ms`. Anything not currently transient, or
    /// still within the grace period, passes through unchanged.
    pub fn apply(&self, result: ExecutionResult, grace_period_ms: u64) -> ExecutionResult {
        if result.severity != Severity::TemporarilyUnavailable {
            return result;
        }
        let Some(first_seen) = self.first_seen.get(&result.check_id).map(|t| *t) else {
            return result;
        };

        let grace = TimeDelta::milliseconds(grace_period_ms.min(i64::MAX as u64) as i64);
        let deadline = first_seen + grace;
        if result.finished_at < deadline {
            return result;
        }

        let exceeded_ms = (result.finished_at - deadline).num_milliseconds();
        let mut escalated = result;
        escalated.log.critical(format!(
            "Grace period for TEMPORARILY_UNAVAILABLE ({grace_period_ms} ms) exceeded by {exceeded_ms} ms, reporting CRITICAL"
        ));
        escalated.severity = Severity::Critical;
        debug!(check_id = %escalated.check_id, exceeded_ms, "transient status escalated");
        escalated
    }

    /// Forget a check entirely (deregistration).
    pub fn remove(&self, id: &str) {
        self.first_seen.remove(id);
    }

    #[cfg(test)]
    fn first_seen_for(&self, id: &str) -> Option<DateTime<Utc>> {
        self.first_seen.get(id).map(|t| *t)
    }
}
