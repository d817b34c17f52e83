//! vigil-core — foundational types for the Vigil health-check engine.
//!
//! Defines the vocabulary shared by the registry and the executor:
//!
//! - [`Severity`] — the ordered status scale, most-severe-wins
//! - [`ResultLog`] / [`LogEntry`] — the structured diagnostic trail a
//!   check produces
//! - [`HealthCheck`] — the async trait a pluggable check routine
//!   implements
//! - [`CheckMetadata`] / [`CheckPolicy`] — identity, tags, and per-check
//!   configuration overrides
//! - [`CheckSelector`] — which checks a caller wants to run

pub mod check;
pub mod log;
pub mod selector;
pub mod severity;

pub use check::{CheckId, CheckMetadata, CheckPolicy, HealthCheck};
pub use log::{LogEntry, ResultLog};
pub use selector::{CheckSelector, SelectorError};
pub use severity::Severity;
