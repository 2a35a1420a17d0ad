//! Crate-level error type and `Result` alias
//!
//! Subsystems define their own typed errors (`RegistryError`, `ArgError`,
//! `DriverError`, `CaseError`); this module folds them into one harness-level
//! error for main/CLI propagation.

use thiserror::Error;

use crate::args::ArgError;
use crate::registry::{Backend, RegistryError};

/// Harness-level errors
#[derive(Debug, Error)]
pub enum MedirError {
    /// Benchmark registration conflict detected at startup
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Requested benchmark name is not registered at all
    #[error("Unknown benchmark: {0}")]
    UnknownBenchmark(String),

    /// Benchmark exists but has no implementation for the requested backend
    #[error("Benchmark {name} is not implemented for backend {backend}")]
    NotImplemented {
        /// Benchmark name
        name: String,
        /// Requested backend
        backend: Backend,
    },

    /// Malformed benchmark arguments
    #[error(transparent)]
    Args(#[from] ArgError),

    /// Report or output file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Crate-level result alias
pub type Result<T> = std::result::Result<T, MedirError>;
