//! Time-bounded result cache with a sticky not-OK index.
//!
//! The cache holds the latest [`ExecutionResult`] per check and, for
//! every not-OK severity, the most recent result that reported it.
//! TTL is applied at read time only — a stale entry is kept so it can
//! still feed sticky annotations (and the last-result log shown on
//! timeouts). Writes come from task completion callbacks on arbitrary
//! worker tasks, possibly after the originating run has returned, so
//! both maps are concurrent with replace-whole-value semantics.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use dashmap::{DashMap, Entry};
use tracing::debug;

use vigil_core::{CheckId, Severity};

use crate::result::ExecutionResult;

/// Shared, time-bounded store of the latest result per check.
#[derive(Clone, Default)]
pub struct ResultCache {
    latest: Arc<DashMap<CheckId, ExecutionResult>>,
    /// Most recent not-OK result per severity, for stickiness.
    not_ok: Arc<DashMap<Severity, ExecutionResult>>,
}

/// Clamp a millisecond count into a `TimeDelta`.
fn delta_ms(ms: u64) -> TimeDelta {
    TimeDelta::milliseconds(ms.min(i64::MAX as u64) as i64)
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for `id` if it is still within `ttl_ms`
    /// of its finish time. Stale entries are left in place.
    pub fn get(&self, id: &str, ttl_ms: u64) -> Option<ExecutionResult> {
        let entry = self.latest.get(id)?;
        if Utc::now() < entry.finished_at + delta_ms(ttl_ms) {
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Store a completed result. The entry is replaced wholesale; if an
    /// already-stored result finished later (a slow write racing a fast
    /// one), the fresher finish time wins and the incoming value is
    /// dropped.
    pub fn put(&self, result: ExecutionResult) {
        let id = result.check_id.clone();

        let mut stored = false;
        match self.latest.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().finished_at <= result.finished_at {
                    entry.insert(result.clone());
                    stored = true;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(result.clone());
                stored = true;
            }
        }

        if stored && result.severity >= Severity::Warn {
            match self.not_ok.entry(result.severity) {
                Entry::Occupied(mut entry) => {
                    if entry.get().finished_at <= result.finished_at {
                        entry.insert(result.clone());
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(result.clone());
                }
            }
        }

        if stored {
            debug!(check_id = %id, severity = %result.severity, "result cached");
        } else {
            debug!(check_id = %id, "stale result dropped, cache holds a fresher one");
        }
    }

    /// Annotate `fresh` with past not-OK results still inside the
    /// sticky window.
    ///
    /// For each not-OK severity whose indexed result is not `fresh`
    /// itself and finished within the window, the past result's log is
    /// appended under a header and the copy's severity is raised to the
    /// worst of fresh + sticky. Returns `fresh` unchanged when nothing
    /// qualifies.
    pub fn with_sticky_annotations(
        &self,
        fresh: &ExecutionResult,
        sticky_window_minutes: u64,
    ) -> ExecutionResult {
        let horizon = Utc::now() - delta_ms(sticky_window_minutes * 60_000);

        let sticky: Vec<ExecutionResult> = Severity::not_ok()
            .iter()
            .filter_map(|severity| self.not_ok.get(severity).map(|r| r.clone()))
            .filter(|past| past != fresh && past.finished_at > horizon)
            .collect();

        if sticky.is_empty() {
            return fresh.clone();
        }

        let mut annotated = fresh.clone();
        for past in sticky {
            annotated.log.info(format!(
                "*** Sticky result from {} (window: {} min): {} ***",
                past.finished_at.format("%H:%M:%S%.3f"),
                sticky_window_minutes,
                past.severity
            ));
            annotated.log.extend_from(&past.log);
            annotated.severity = Severity::worst(annotated.severity, past.severity);
        }
        debug!(
            check_id = %fresh.check_id,
            severity = %annotated.severity,
            "sticky annotations applied"
        );
        annotated
    }

    /// Drop the entry for one check, including its not-OK index slots.
    pub fn remove(&self, id: &str) {
        self.latest.remove(id);
        self.not_ok.retain(|_, result| result.check_id != id);
    }

    pub fn clear(&self) {
        self.latest.clear();
        self.not_ok.clear();
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}
