//! Check task spawning and completion plumbing.
//!
//! Every check routine runs in its own spawned task, gated by the
//! executor's semaphore. Completion is published through a `watch`
//! channel so any number of callers can wait — and stop waiting —
//! independently; the completion path (grace ingestion, cache update,
//! running-map removal) runs exactly once whether or not anyone is
//! still listening. There is no cancellation: a caller timing out
//! leaves the task running.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::{DashMap, Entry};
use tokio::sync::{Semaphore, watch};
use tracing::{debug, warn};

use vigil_core::{CheckId, CheckMetadata, ResultLog};
use vigil_registry::RegisteredCheck;

use crate::cache::ResultCache;
use crate::grace::GracePeriodEvaluator;
use crate::result::ExecutionResult;

/// Shared executor state a task needs to complete itself.
#[derive(Clone)]
pub(crate) struct TaskContext {
    pub semaphore: Arc<Semaphore>,
    pub cache: ResultCache,
    pub grace: GracePeriodEvaluator,
    pub running: Arc<DashMap<CheckId, TaskHandle>>,
}

/// Handle to a spawned (possibly still running) check task.
#[derive(Clone)]
pub(crate) struct TaskHandle {
    pub metadata: CheckMetadata,
    /// When the task was created — synthetic timeout results measure
    /// their elapsed time from here, across caller attach/detach.
    pub created_at: Instant,
    receiver: watch::Receiver<Option<ExecutionResult>>,
}

impl TaskHandle {
    /// Milliseconds since the task was created.
    pub fn age_ms(&self) -> u64 {
        self.created_at.elapsed().as_millis() as u64
    }

    /// Wait up to `timeout_ms` for the task's result. `None` means the
    /// caller gave up; the task itself keeps running.
    pub async fn wait(&self, timeout_ms: u64) -> Option<ExecutionResult> {
        let mut receiver = self.receiver.clone();
        let outcome = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            receiver.wait_for(|published| published.is_some()),
        )
        .await;

        match outcome {
            Ok(Ok(published)) => published.clone(),
            // Sender dropped without publishing (runtime teardown) —
            // indistinguishable from a timeout for the caller.
            Ok(Err(_)) => None,
            Err(_) => None,
        }
    }
}

/// Attach to the still-running task for this check, or spawn a new one.
///
/// Reuse matters for slow checks: overlapping runs must not stack up
/// duplicate executions of a routine that is already in flight.
pub(crate) fn spawn_or_reuse(check: &RegisteredCheck, ctx: &TaskContext) -> TaskHandle {
    let id = check.metadata.id.clone();
    match ctx.running.entry(id) {
        Entry::Occupied(entry) => {
            debug!(check_id = %check.metadata.id, "attaching to task already in flight");
            entry.get().clone()
        }
        Entry::Vacant(entry) => {
            let (sender, receiver) = watch::channel(None);
            let handle = TaskHandle {
                metadata: check.metadata.clone(),
                created_at: Instant::now(),
                receiver,
            };
            entry.insert(handle.clone());
            spawn_task(check.clone(), sender, ctx.clone());
            handle
        }
    }
}

fn spawn_task(
    check: RegisteredCheck,
    sender: watch::Sender<Option<ExecutionResult>>,
    ctx: TaskContext,
) {
    tokio::spawn(async move {
        let metadata = check.metadata.clone();

        let permit = match ctx.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(check_id = %metadata.id, "worker pool closed before execution");
                ctx.running.remove(&metadata.id);
                return;
            }
        };

        debug!(check_id = %metadata.id, "check executing");
        let started = Instant::now();
        let routine = Arc::clone(&check.routine);
        let outcome = tokio::spawn(async move { routine.execute().await }).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        drop(permit);

        let log = match outcome {
            Ok(Ok(log)) => log,
            Ok(Err(error)) => {
                warn!(check_id = %metadata.id, error = %error, "check routine failed");
                let mut log = ResultLog::new();
                log.health_check_error(format!("Check failed: {error:#}"));
                log
            }
            Err(join_error) if join_error.is_panic() => {
                warn!(check_id = %metadata.id, "check routine panicked");
                let mut log = ResultLog::new();
                log.health_check_error(format!("Check panicked: {join_error}"));
                log
            }
            Err(join_error) => {
                warn!(check_id = %metadata.id, error = %join_error, "check task aborted");
                let mut log = ResultLog::new();
                log.health_check_error(format!("Check aborted: {join_error}"));
                log
            }
        };

        let result = ExecutionResult::from_log(&metadata, log, elapsed_ms, false);

        // Completion path, exactly once: feed the grace state machine,
        // land in the cache, free the slot, then publish to waiters.
        ctx.grace.ingest(&result);
        ctx.cache.put(result.clone());
        ctx.running.remove(&metadata.id);
        let _ = sender.send(Some(result));
        debug!(check_id = %metadata.id, elapsed_ms, "check finished");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vigil_core::{HealthCheck, Severity};

    fn context(pool: usize) -> TaskContext {
        TaskContext {
            semaphore: Arc::new(Semaphore::new(pool)),
            cache: ResultCache::new(),
            grace: GracePeriodEvaluator::new(),
            running: Arc::new(DashMap::new()),
        }
    }

    struct SleepCheck {
        sleep_ms: u64,
        executions: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HealthCheck for SleepCheck {
        async fn execute(&self) -> anyhow::Result<ResultLog> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.sleep_ms)).await;
            Ok(ResultLog::single(Severity::Ok, "slept well"))
        }
    }

    struct FailingCheck;

    #[async_trait]
    impl HealthCheck for FailingCheck {
        async fn execute(&self) -> anyhow::Result<ResultLog> {
            anyhow::bail!("backend unreachable")
        }
    }

    struct PanickingCheck;

    #[async_trait]
    impl HealthCheck for PanickingCheck {
        async fn execute(&self) -> anyhow::Result<ResultLog> {
            panic!("boom")
        }
    }

    fn registered(id: &str, routine: Arc<dyn HealthCheck>) -> RegisteredCheck {
        RegisteredCheck {
            metadata: CheckMetadata::new(id, id),
            routine,
        }
    }

    #[tokio::test]
    async fn fast_check_completes_within_wait() {
        let ctx = context(2);
        let executions = Arc::new(AtomicUsize::new(0));
        let check = registered(
            "fast",
            Arc::new(SleepCheck {
                sleep_ms: 10,
                executions: executions.clone(),
            }),
        );

        let handle = spawn_or_reuse(&check, &ctx);
        let result = handle.wait(1_000).await.expect("should complete");
        assert_eq!(result.severity, Severity::Ok);
        assert!(!result.timed_out);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
        // Slot freed and cache updated.
        assert!(ctx.running.is_empty());
        assert!(ctx.cache.get("fast", 60_000).is_some());
    }

    #[tokio::test]
    async fn slow_check_outlives_waiter_and_still_lands_in_cache() {
        let ctx = context(2);
        let check = registered(
            "slow",
            Arc::new(SleepCheck {
                sleep_ms: 200,
                executions: Arc::new(AtomicUsize::new(0)),
            }),
        );

        let handle = spawn_or_reuse(&check, &ctx);
        assert!(handle.wait(20).await.is_none());
        // Caller gave up; the task is still in flight.
        assert!(ctx.running.contains_key("slow"));
        assert!(ctx.cache.get("slow", 60_000).is_none());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(ctx.running.is_empty());
        let cached = ctx.cache.get("slow", 60_000).expect("late completion cached");
        assert_eq!(cached.severity, Severity::Ok);
    }

    #[tokio::test]
    async fn overlapping_waits_share_one_task() {
        let ctx = context(2);
        let executions = Arc::new(AtomicUsize::new(0));
        let check = registered(
            "shared",
            Arc::new(SleepCheck {
                sleep_ms: 100,
                executions: executions.clone(),
            }),
        );

        let first = spawn_or_reuse(&check, &ctx);
        let second = spawn_or_reuse(&check, &ctx);
        assert_eq!(ctx.running.len(), 1);

        let (a, b) = tokio::join!(first.wait(1_000), second.wait(1_000));
        assert_eq!(a, b);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn routine_error_becomes_health_check_error_result() {
        let ctx = context(1);
        let check = registered("failing", Arc::new(FailingCheck));

        let result = spawn_or_reuse(&check, &ctx).wait(1_000).await.unwrap();
        assert_eq!(result.severity, Severity::HealthCheckError);
        assert!(result.log.entries()[0].message.contains("backend unreachable"));
    }

    #[tokio::test]
    async fn routine_panic_is_contained() {
        let ctx = context(1);
        let check = registered("panicking", Arc::new(PanickingCheck));

        let result = spawn_or_reuse(&check, &ctx).wait(1_000).await.unwrap();
        assert_eq!(result.severity, Severity::HealthCheckError);
        assert!(result.log.entries()[0].message.contains("panicked"));
        // The pool survives for the next check.
        let ok = registered(
            "after",
            Arc::new(SleepCheck {
                sleep_ms: 1,
                executions: Arc::new(AtomicUsize::new(0)),
            }),
        );
        let result = spawn_or_reuse(&ok, &ctx).wait(1_000).await.unwrap();
        assert_eq!(result.severity, Severity::Ok);
    }

    #[tokio::test]
    async fn semaphore_bounds_parallelism() {
        let ctx = context(1);
        let executions = Arc::new(AtomicUsize::new(0));
        let first = registered(
            "one",
            Arc::new(SleepCheck {
                sleep_ms: 100,
                executions: executions.clone(),
            }),
        );
        let second = registered(
            "two",
            Arc::new(SleepCheck {
                sleep_ms: 100,
                executions: executions.clone(),
            }),
        );

        let started = Instant::now();
        let a = spawn_or_reuse(&first, &ctx);
        let b = spawn_or_reuse(&second, &ctx);
        tokio::join!(a.wait(5_000), b.wait(5_000));
        // With one permit the sleeps serialize.
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
