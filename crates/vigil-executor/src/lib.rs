//! vigil-executor — concurrent health-check execution.
//!
//! Runs registered checks with bounded parallelism, a per-check wait
//! timeout, result caching, and two time-based escalation policies:
//! a grace period for the transient status and sticky windows for past
//! bad results.
//!
//! # Architecture
//!
//! ```text
//! Executor::run(selector, options)
//!   ├── CheckRegistry::resolve          → which checks to consider
//!   ├── ResultCache::get                → cache hits skip execution
//!   ├── task::spawn_or_reuse            → one bounded task per check
//!   │     └── completion: grace.ingest → cache.put → publish
//!   ├── per-task timeout wait           → real or synthetic result
//!   ├── ResultCache::with_sticky_annotations
//!   ├── GracePeriodEvaluator::apply
//!   └── sort (severity desc, name)
//! ```
//!
//! # Timeouts are not cancellation
//!
//! A caller that stops waiting gets a synthetic WARN (or CRITICAL, once
//! the task is old enough) result; the task itself keeps running and
//! its eventual outcome still lands in the cache for later runs.

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod grace;
pub mod monitor;
pub mod result;

mod task;

pub use cache::ResultCache;
pub use config::{ExecutionOptions, ExecutorConfig};
pub use error::{ExecutorError, ExecutorResult};
pub use executor::Executor;
pub use grace::GracePeriodEvaluator;
pub use monitor::{HealthMonitor, MonitorHandle};
pub use result::{CombinedResult, ExecutionResult};
