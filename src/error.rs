//! Error types for proturn-impute

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for proturn-impute operations
pub type Result<T> = std::result::Result<T, ImputeError>;

/// Main error type for the evaluation pipeline
#[derive(Error, Debug)]
pub enum ImputeError {
    #[error("File not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Malformed table {}: {reason}", path.display())]
    MalformedTable { path: PathBuf, reason: String },

    #[error("Alignment error for series {series}: row {required} requested, true table has {available} rows")]
    Alignment {
        series: String,
        required: usize,
        available: usize,
    },

    #[error("Imputation error: {0}")]
    Imputation(String),

    #[error("Degenerate sample: {observations} total observation(s), at least 2 required")]
    DegenerateSample { observations: usize },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Evaluation cancelled")]
    Cancelled,
}

impl ImputeError {
    /// Whether the failure only invalidates one replicate or series.
    ///
    /// Recoverable errors are skipped and logged by the evaluator; everything
    /// else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ImputeError::MissingFile { .. }
                | ImputeError::MalformedTable { .. }
                | ImputeError::Alignment { .. }
                | ImputeError::Imputation(_)
        )
    }
}

impl From<polars::error::PolarsError> for ImputeError {
    fn from(err: polars::error::PolarsError) -> Self {
        ImputeError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ImputeError {
    fn from(err: serde_json::Error) -> Self {
        ImputeError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ImputeError {
    fn from(err: ndarray::ShapeError) -> Self {
        ImputeError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
