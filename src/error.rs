//! Error types for cyclefit
//!
//! Clear error messages with actionable guidance. Numeric routines do not use
//! this type: they return typed outcomes (see [`crate::metrics`]).

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// cyclefit error types
#[derive(Error, Debug)]
pub enum Error {
    /// A parameter value is negative, NaN or infinite
    #[error("Invalid parameter {field}: must be a finite real number >= 0 or absent, got {value}")]
    Validation {
        /// Internal field name
        field: String,
        /// Offending value
        value: f64,
    },

    /// Parameter name or key not present in any schema table
    #[error("Unknown parameter: {0}\nUse an internal field name or its unit-annotated key")]
    UnknownParameter(String),

    /// Ledger append at anything other than the next free index
    #[error("Ledger order violation: expected index {expected}, got {got}\nRecords must be appended contiguously starting at 0")]
    LedgerOrder {
        /// Index that would have been legal (current length)
        expected: usize,
        /// Index that was requested
        got: usize,
    },

    /// Ledger lookup outside `[0, len)`
    #[error("Ledger index {index} out of range (length {len})")]
    LedgerRange {
        /// Requested index
        index: usize,
        /// Ledger length at the time of the lookup
        len: usize,
    },

    /// Trajectory columns are inconsistent
    #[error("Invalid trajectory: {0}")]
    InvalidTrajectory(String),

    /// Missing or invalid run configuration (fatal before any worker starts)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error (ledger snapshot, Parquet files)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Worker sent something that is not a valid response document
    #[error("Worker protocol error: {0}")]
    Protocol(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
