//! vigil-registry — the registry collaborator consumed by the executor.
//!
//! Holds registered checks in memory and resolves a [`CheckSelector`]
//! to the concrete set of checks it matches. Tag matching is AND by
//! default, OR on request; `-tag` exclusions always apply; explicit
//! names are OR-ed with the tag match.

pub mod error;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use registry::{CheckRegistry, RegisteredCheck};
