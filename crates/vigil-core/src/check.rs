//! The pluggable check contract and its metadata.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::log::ResultLog;

/// Stable identifier for a registered check; serves as the cache key.
pub type CheckId = String;

/// A pluggable health check routine.
///
/// Implementations report their outcome as a [`ResultLog`]; returning an
/// error (or panicking) is contained by the executor and surfaced as a
/// `HEALTH_CHECK_ERROR` result, never as a batch failure.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn execute(&self) -> anyhow::Result<ResultLog>;
}

/// Per-check configuration overrides.
///
/// Every field falls back to the executor-wide default when `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckPolicy {
    /// Per-task wait budget before a synthetic timeout result.
    pub timeout_ms: Option<u64>,
    /// Cached results stay valid this long.
    pub result_cache_ttl_ms: Option<u64>,
    /// Timed-out checks older than this are reported CRITICAL instead of WARN.
    pub long_running_critical_threshold_ms: Option<u64>,
    /// Continuous TEMPORARILY_UNAVAILABLE tolerance before escalation.
    pub grace_period_ms: Option<u64>,
    /// Past not-OK results keep being shown this long after recovery.
    /// Zero disables stickiness for this check.
    pub sticky_window_minutes: Option<u64>,
}

/// Identity and classification of a registered check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckMetadata {
    pub id: CheckId,
    /// Human-readable name, used as the ordering tie-break in results.
    pub name: String,
    /// Tags the selector matches against.
    pub tags: Vec<String>,
    pub policy: CheckPolicy,
    /// Free-form properties a host may attach (rendering hints etc.).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
}

impl CheckMetadata {
    /// Metadata with no tags and default policy.
    pub fn new(id: impl Into<CheckId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags: Vec::new(),
            policy: CheckPolicy::default(),
            properties: HashMap::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_policy(mut self, policy: CheckPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
