//! Batch orchestration — the engine's top level.
//!
//! A `run` resolves the selector, serves what it can from cache,
//! spawns (or attaches to) a task per remaining check, waits for each
//! task up to its own timeout, then layers stickiness and grace-period
//! escalation over the merged batch. A misbehaving check never aborts
//! the batch: every resolved check yields exactly one result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use vigil_core::{CheckSelector, ResultLog};
use vigil_registry::{CheckRegistry, RegisteredCheck};

use crate::cache::ResultCache;
use crate::config::{ExecutionOptions, ExecutorConfig};
use crate::error::{ExecutorError, ExecutorResult};
use crate::grace::GracePeriodEvaluator;
use crate::result::{CombinedResult, ExecutionResult};
use crate::task::{self, TaskContext, TaskHandle};

/// Lookback used to fetch the previous result's log for a timed-out
/// check: effectively "whatever the cache still holds".
const LAST_RESULT_LOOKBACK_MS: u64 = 365 * 24 * 60 * 60 * 1_000;

/// Concurrent health-check executor.
///
/// Owns the result cache, the grace-period state, and the running-task
/// map; nothing outside the executor mutates them. Cheap to clone per
/// caller is a non-goal — construct one per engine instance and share
/// it behind an `Arc`.
pub struct Executor {
    config: ExecutorConfig,
    registry: CheckRegistry,
    tasks: TaskContext,
}

impl Executor {
    pub fn new(registry: CheckRegistry, config: ExecutorConfig) -> Self {
        let permits = config.max_parallel_checks.max(1);
        let tasks = TaskContext {
            semaphore: Arc::new(Semaphore::new(permits)),
            cache: ResultCache::new(),
            grace: GracePeriodEvaluator::new(),
            running: Arc::new(DashMap::new()),
        };
        Self {
            config,
            registry,
            tasks,
        }
    }

    pub fn with_defaults(registry: CheckRegistry) -> Self {
        Self::new(registry, ExecutorConfig::default())
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// Execute every check the selector resolves to and return one
    /// result per check, most severe first.
    ///
    /// The only error is an invalid selector, raised before anything is
    /// dispatched. Routine failures, panics, and timeouts all come back
    /// as results.
    pub async fn run(
        &self,
        selector: &CheckSelector,
        options: &ExecutionOptions,
    ) -> ExecutorResult<Vec<ExecutionResult>> {
        selector.validate()?;

        let batch_started = Instant::now();

        let fallback;
        let selector = if selector.is_empty() && !self.config.default_tags.is_empty() {
            debug!(tags = ?self.config.default_tags, "empty selector, using default tags");
            fallback = CheckSelector::tags(self.config.default_tags.clone());
            &fallback
        } else {
            selector
        };

        let resolved = self.registry.resolve(selector, options.combine_tags_with_or);
        debug!(checks = resolved.len(), "batch run starting");

        let grace_by_id: HashMap<String, u64> = resolved
            .iter()
            .map(|check| {
                (
                    check.metadata.id.clone(),
                    self.config.effective_grace_period_ms(&check.metadata.policy),
                )
            })
            .collect();

        // Partition into cache hits and checks needing execution.
        let mut results: Vec<ExecutionResult> = Vec::with_capacity(resolved.len());
        let mut to_execute: Vec<RegisteredCheck> = Vec::new();
        for check in resolved {
            if !options.force_instant_execution {
                let ttl_ms = self.config.effective_cache_ttl_ms(&check.metadata.policy);
                if let Some(hit) = self.tasks.cache.get(&check.metadata.id, ttl_ms) {
                    debug!(check_id = %check.metadata.id, "served from cache");
                    results.push(hit);
                    continue;
                }
            }
            to_execute.push(check);
        }

        // Spawn (or attach to) each remaining task, then wait for all
        // of them concurrently — each against its own timeout, so one
        // straggler cannot delay the others' collection.
        let waits: Vec<_> = to_execute
            .iter()
            .map(|check| {
                let handle = task::spawn_or_reuse(check, &self.tasks);
                let timeout_ms = self
                    .config
                    .effective_timeout_ms(&check.metadata.policy, options);
                let threshold_ms = self
                    .config
                    .effective_critical_threshold_ms(&check.metadata.policy);
                let cache = self.tasks.cache.clone();
                async move {
                    match handle.wait(timeout_ms).await {
                        Some(result) => result,
                        None => synthetic_timeout_result(&handle, threshold_ms, &cache),
                    }
                }
            })
            .collect();
        let fresh = futures::future::join_all(waits).await;

        // Sticky annotations apply to fresh results only; cache hits
        // were annotated when they were fresh.
        for (check, result) in to_execute.iter().zip(fresh) {
            let window = self
                .config
                .effective_sticky_window_minutes(&check.metadata.policy);
            let result = if window > 0 {
                self.tasks.cache.with_sticky_annotations(&result, window)
            } else {
                result
            };
            results.push(result);
        }

        // Grace-period escalation over the merged set, cache hits
        // included — a streak can expire while its result is cached.
        let mut results: Vec<ExecutionResult> = results
            .into_iter()
            .map(|result| {
                let grace_ms = grace_by_id
                    .get(&result.check_id)
                    .copied()
                    .unwrap_or(self.config.grace_period_ms);
                self.tasks.grace.apply(result, grace_ms)
            })
            .collect();

        ExecutionResult::sort_batch(&mut results);
        debug!(
            checks = results.len(),
            elapsed_ms = batch_started.elapsed().as_millis() as u64,
            "batch run finished"
        );
        Ok(results)
    }

    /// Execute a single check by id, honoring its cache TTL.
    pub async fn run_check(&self, id: &str) -> ExecutorResult<ExecutionResult> {
        let Some(check) = self.registry.get(id) else {
            return Err(ExecutorError::CheckNotFound(id.to_string()));
        };
        let policy = &check.metadata.policy;
        let grace_ms = self.config.effective_grace_period_ms(policy);

        let ttl_ms = self.config.effective_cache_ttl_ms(policy);
        if let Some(hit) = self.tasks.cache.get(id, ttl_ms) {
            return Ok(self.tasks.grace.apply(hit, grace_ms));
        }

        let options = ExecutionOptions::default();
        let timeout_ms = self.config.effective_timeout_ms(policy, &options);
        let threshold_ms = self.config.effective_critical_threshold_ms(policy);

        let handle = task::spawn_or_reuse(&check, &self.tasks);
        let result = match handle.wait(timeout_ms).await {
            Some(result) => result,
            None => synthetic_timeout_result(&handle, threshold_ms, &self.tasks.cache),
        };

        let window = self.config.effective_sticky_window_minutes(policy);
        let result = if window > 0 {
            self.tasks.cache.with_sticky_annotations(&result, window)
        } else {
            result
        };
        Ok(self.tasks.grace.apply(result, grace_ms))
    }

    /// Drop all executor-held state for a check (deregistration).
    pub fn invalidate(&self, id: &str) {
        self.tasks.cache.remove(id);
        self.tasks.grace.remove(id);
        info!(check_id = %id, "executor state invalidated");
    }

    /// Fold a batch into one most-severe-wins summary.
    pub fn combine(results: Vec<ExecutionResult>) -> CombinedResult {
        CombinedResult::combine(results)
    }
}

/// Build the WARN/CRITICAL stand-in for a check the caller stopped
/// waiting for. The task is left running; its age decides the severity.
fn synthetic_timeout_result(
    handle: &TaskHandle,
    threshold_ms: u64,
    cache: &ResultCache,
) -> ExecutionResult {
    let elapsed_ms = handle.age_ms();
    let mut log = ResultLog::new();
    if elapsed_ms < threshold_ms {
        log.warn(format!("Timeout: check still running after {elapsed_ms} ms"));
    } else {
        log.critical(format!(
            "Timeout: check still running after {elapsed_ms} ms \
             (exceeding the threshold for CRITICAL: {threshold_ms} ms)"
        ));
    }

    // Show the previous outcome alongside the timeout for diagnosis.
    if let Some(last) = cache.get(&handle.metadata.id, LAST_RESULT_LOOKBACK_MS) {
        log.info(format!(
            "*** Result log of last execution, finished at {} after {} ms ***",
            last.finished_at.format("%H:%M:%S%.3f"),
            last.elapsed_ms
        ));
        log.extend_from(&last.log);
    }

    warn!(check_id = %handle.metadata.id, elapsed_ms, "check timed out, no longer waiting");
    ExecutionResult::from_log(&handle.metadata, log, elapsed_ms, true)
}
