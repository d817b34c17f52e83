//! Health monitor — background task that keeps a combined result warm.
//!
//! Runs a fixed selector through the executor on an interval and
//! publishes the latest [`CombinedResult`] through a `watch` channel,
//! so hosts can read overall health without paying for a run on every
//! query.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use vigil_core::CheckSelector;

use crate::config::ExecutionOptions;
use crate::executor::Executor;
use crate::result::CombinedResult;

/// Periodic runner over one selector.
pub struct HealthMonitor {
    executor: Arc<Executor>,
    selector: CheckSelector,
    options: ExecutionOptions,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(executor: Arc<Executor>, selector: CheckSelector, interval: Duration) -> Self {
        Self {
            executor,
            selector,
            options: ExecutionOptions::default(),
            interval,
        }
    }

    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// Spawn the monitor loop. The first run happens immediately.
    pub fn start(self) -> MonitorHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (latest_tx, latest_rx) = watch::channel(None);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            debug!(interval_ms = self.interval.as_millis() as u64, "health monitor starting");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.executor.run(&self.selector, &self.options).await {
                            Ok(results) => {
                                let combined = CombinedResult::combine(results);
                                debug!(severity = %combined.severity, "health monitor tick");
                                let _ = latest_tx.send(Some(combined));
                            }
                            Err(e) => {
                                error!(error = %e, "health monitor run failed");
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("health monitor shutting down");
                        break;
                    }
                }
            }
        });

        info!("health monitor started");
        MonitorHandle {
            handle,
            shutdown_tx,
            latest: latest_rx,
        }
    }
}

/// Handle to a running monitor loop.
pub struct MonitorHandle {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    latest: watch::Receiver<Option<CombinedResult>>,
}

impl MonitorHandle {
    /// Most recent combined result, if a tick has completed yet.
    pub fn latest(&self) -> Option<CombinedResult> {
        self.latest.borrow().clone()
    }

    /// Subscribe to combined-result updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<CombinedResult>> {
        self.latest.clone()
    }

    /// Signal shutdown and wait for the loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
        info!("health monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use vigil_core::{CheckMetadata, HealthCheck, ResultLog, Severity};
    use vigil_registry::CheckRegistry;

    use crate::config::ExecutorConfig;

    struct StaticCheck(Severity);

    #[async_trait]
    impl HealthCheck for StaticCheck {
        async fn execute(&self) -> anyhow::Result<ResultLog> {
            Ok(ResultLog::single(self.0, "static"))
        }
    }

    fn executor(severity: Severity) -> Arc<Executor> {
        let registry = CheckRegistry::new();
        registry
            .register(CheckMetadata::new("static", "Static"), Arc::new(StaticCheck(severity)))
            .unwrap();
        Arc::new(Executor::new(registry, ExecutorConfig::default()))
    }

    #[tokio::test]
    async fn monitor_publishes_combined_result() {
        let monitor = HealthMonitor::new(
            executor(Severity::Warn),
            CheckSelector::all(),
            Duration::from_millis(50),
        );
        let handle = monitor.start();

        let mut updates = handle.subscribe();
        updates
            .wait_for(|latest| latest.is_some())
            .await
            .expect("monitor should publish");

        let combined = handle.latest().unwrap();
        assert_eq!(combined.severity, Severity::Warn);
        assert_eq!(combined.results.len(), 1);

        handle.stop().await;
    }

    #[tokio::test]
    async fn monitor_stops_cleanly() {
        let monitor = HealthMonitor::new(
            executor(Severity::Ok),
            CheckSelector::all(),
            Duration::from_millis(10),
        );
        let handle = monitor.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        // Returns only after the loop exits.
        handle.stop().await;
    }
}
