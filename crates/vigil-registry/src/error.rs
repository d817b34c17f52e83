//! Registry error types.

use thiserror::Error;

use vigil_core::CheckId;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("check already registered: {0}")]
    DuplicateCheck(CheckId),

    #[error("check not found: {0}")]
    CheckNotFound(CheckId),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
