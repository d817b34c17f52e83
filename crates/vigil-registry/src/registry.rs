//! In-memory check registry.
//!
//! The registry owns the `metadata + routine` pairs and answers
//! `resolve(selector)` queries for the executor. It deliberately knows
//! nothing about execution: no cache, no timeouts, no results.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use vigil_core::{CheckId, CheckMetadata, CheckSelector, HealthCheck};

use crate::error::{RegistryError, RegistryResult};

/// One registered check: its metadata plus the routine to invoke.
#[derive(Clone)]
pub struct RegisteredCheck {
    pub metadata: CheckMetadata,
    pub routine: Arc<dyn HealthCheck>,
}

/// Thread-safe, in-memory registry of health checks.
#[derive(Clone, Default)]
pub struct CheckRegistry {
    checks: Arc<RwLock<HashMap<CheckId, RegisteredCheck>>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check. Fails if the id is already taken.
    pub fn register(
        &self,
        metadata: CheckMetadata,
        routine: Arc<dyn HealthCheck>,
    ) -> RegistryResult<()> {
        let id = metadata.id.clone();
        let mut checks = self.checks.write().expect("registry lock poisoned");
        if checks.contains_key(&id) {
            return Err(RegistryError::DuplicateCheck(id));
        }
        checks.insert(id.clone(), RegisteredCheck { metadata, routine });
        info!(check_id = %id, "check registered");
        Ok(())
    }

    /// Remove a check. The caller is expected to also invalidate any
    /// executor state held for it.
    pub fn unregister(&self, id: &str) -> RegistryResult<CheckMetadata> {
        let mut checks = self.checks.write().expect("registry lock poisoned");
        match checks.remove(id) {
            Some(check) => {
                info!(check_id = %id, "check unregistered");
                Ok(check.metadata)
            }
            None => Err(RegistryError::CheckNotFound(id.to_string())),
        }
    }

    pub fn get(&self, id: &str) -> Option<RegisteredCheck> {
        self.checks
            .read()
            .expect("registry lock poisoned")
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.checks
            .read()
            .expect("registry lock poisoned")
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.checks.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a selector to the checks it matches.
    ///
    /// - empty selector → every registered check
    /// - include tags → AND by default, OR when `combine_tags_with_or`
    /// - `-tag` exclusions → always applied
    /// - explicit names → OR-ed with the tag match
    ///
    /// Results are ordered by name, then id, so resolution is
    /// deterministic across calls.
    pub fn resolve(
        &self,
        selector: &CheckSelector,
        combine_tags_with_or: bool,
    ) -> Vec<RegisteredCheck> {
        let checks = self.checks.read().expect("registry lock poisoned");

        let mut matched: Vec<RegisteredCheck> = checks
            .values()
            .filter(|check| Self::matches(&check.metadata, selector, combine_tags_with_or))
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            (a.metadata.name.as_str(), a.metadata.id.as_str())
                .cmp(&(b.metadata.name.as_str(), b.metadata.id.as_str()))
        });

        debug!(
            matched = matched.len(),
            total = checks.len(),
            ?selector,
            "selector resolved"
        );
        matched
    }

    fn matches(
        metadata: &CheckMetadata,
        selector: &CheckSelector,
        combine_tags_with_or: bool,
    ) -> bool {
        // Exclusions veto everything, including name matches.
        if selector.excluded_tags().any(|tag| metadata.has_tag(tag)) {
            return false;
        }

        let mut included = selector.included_tags().peekable();
        let has_includes = included.peek().is_some();

        // Exclusion-only (or empty) selectors match everything left.
        if !has_includes && selector.names.is_empty() {
            return true;
        }

        let name_match = selector.names.iter().any(|n| *n == metadata.name);

        let tag_match = if !has_includes {
            false
        } else if combine_tags_with_or {
            included.any(|tag| metadata.has_tag(tag))
        } else {
            included.all(|tag| metadata.has_tag(tag))
        };

        name_match || tag_match
    }
}
