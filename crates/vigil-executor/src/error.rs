//! Executor error types.
//!
//! A misbehaving check never surfaces here — routine failures and
//! timeouts become results. The only errors are programmer errors,
//! raised before any task is dispatched.

use thiserror::Error;

use vigil_core::{CheckId, SelectorError};

/// Errors that can occur when invoking the executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("invalid selector: {0}")]
    InvalidSelector(#[from] SelectorError),

    #[error("check not found: {0}")]
    CheckNotFound(CheckId),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
