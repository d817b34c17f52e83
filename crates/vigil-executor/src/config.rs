//! Executor configuration.
//!
//! All durations are milliseconds unless the field name says otherwise.
//! Every knob here can be overridden per check through
//! [`CheckPolicy`](vigil_core::CheckPolicy); the `effective_*` helpers
//! resolve that precedence in one place.

use serde::{Deserialize, Serialize};

use vigil_core::CheckPolicy;

/// Default per-task wait budget.
pub const TIMEOUT_DEFAULT_MS: u64 = 2_000;
/// Default threshold past which a timed-out check is reported CRITICAL.
pub const LONG_RUNNING_CRITICAL_THRESHOLD_DEFAULT_MS: u64 = 90_000;
/// Default cache validity for completed results.
pub const RESULT_CACHE_TTL_DEFAULT_MS: u64 = 1_500;
/// Default tolerance for a continuously TEMPORARILY_UNAVAILABLE check.
pub const GRACE_PERIOD_DEFAULT_MS: u64 = 60_000;
/// Default worker pool bound.
pub const MAX_PARALLEL_CHECKS_DEFAULT: usize = 5;

/// Engine-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Per-task wait budget before a synthetic timeout result.
    pub timeout_ms: u64,
    /// Timed-out checks older than this are reported CRITICAL instead of WARN.
    pub long_running_critical_threshold_ms: u64,
    /// Completed results served from cache for this long.
    pub result_cache_ttl_ms: u64,
    /// Continuous TEMPORARILY_UNAVAILABLE tolerance before escalation to CRITICAL.
    pub grace_period_ms: u64,
    /// Past not-OK results keep being shown this long after recovery.
    /// Zero disables stickiness unless a check opts in via its policy.
    pub sticky_window_minutes: u64,
    /// Maximum number of check routines executing at once.
    pub max_parallel_checks: usize,
    /// Tags applied when a run is issued with an empty selector.
    /// Empty means "all registered checks".
    pub default_tags: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: TIMEOUT_DEFAULT_MS,
            long_running_critical_threshold_ms: LONG_RUNNING_CRITICAL_THRESHOLD_DEFAULT_MS,
            result_cache_ttl_ms: RESULT_CACHE_TTL_DEFAULT_MS,
            grace_period_ms: GRACE_PERIOD_DEFAULT_MS,
            sticky_window_minutes: 0,
            max_parallel_checks: MAX_PARALLEL_CHECKS_DEFAULT,
            default_tags: Vec::new(),
        }
    }
}

impl ExecutorConfig {
    /// Wait budget for one task: check policy, then the per-call
    /// override, then the global default.
    pub fn effective_timeout_ms(&self, policy: &CheckPolicy, options: &ExecutionOptions) -> u64 {
        policy
            .timeout_ms
            .or(options.override_global_timeout_ms)
            .unwrap_or(self.timeout_ms)
    }

    pub fn effective_cache_ttl_ms(&self, policy: &CheckPolicy) -> u64 {
        policy.result_cache_ttl_ms.unwrap_or(self.result_cache_ttl_ms)
    }

    pub fn effective_critical_threshold_ms(&self, policy: &CheckPolicy) -> u64 {
        policy
            .long_running_critical_threshold_ms
            .unwrap_or(self.long_running_critical_threshold_ms)
    }

    pub fn effective_grace_period_ms(&self, policy: &CheckPolicy) -> u64 {
        policy.grace_period_ms.unwrap_or(self.grace_period_ms)
    }

    pub fn effective_sticky_window_minutes(&self, policy: &CheckPolicy) -> u64 {
        policy.sticky_window_minutes.unwrap_or(self.sticky_window_minutes)
    }
}

/// Per-call execution options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Match checks carrying any selector tag instead of all of them.
    pub combine_tags_with_or: bool,
    /// Skip the result cache and force fresh execution.
    pub force_instant_execution: bool,
    /// Replaces the global timeout for this call (per-check timeouts
    /// still win).
    pub override_global_timeout_ms: Option<u64>,
}
