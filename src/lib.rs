//! proturn-impute - Multiple-imputation accuracy for protein turnover data
//!
//! Masked and fully observed tables of each biological replicate are split
//! into per-peptide series, every series is imputed repeatedly with a
//! posterior-sampling iterative imputer, and the squared errors are reduced
//! to one degrees-of-freedom adjusted RMSE for the experiment group.
//!
//! # Modules
//!
//! - [`data`] - Measurement tables, series extraction and CSV loading
//! - [`imputation`] - Bayesian ridge, iterative imputer and the scoring engine
//! - [`evaluation`] - Error aggregation, RMSE and the evaluation driver
//! - [`sink`] - Imputed-table export and RMSE result records
//! - [`config`] - Run configuration and file layout
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Configuration
pub mod config;

// Core modules
pub mod data;
pub mod imputation;
pub mod evaluation;

// Outputs
pub mod sink;

// Services
pub mod cli;

pub use error::{ImputeError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ImputeError, Result};

    // Configuration
    pub use crate::config::{EvaluationConfig, ExperimentType, MaskingLevel, ReplicateLayout};

    // Data
    pub use crate::data::{MeasurementTable, ReplicateDataset, SeriesExtractor, SeriesTable, TableLoader};

    // Imputation
    pub use crate::imputation::{
        FixedSeeds, ImputationEngine, ImputationModel, Imputer, IterativeImputer,
        IterativeImputerConfig, RandomSeeds, SeedSource,
    };

    // Evaluation
    pub use crate::evaluation::{
        ErrorAggregator, EvaluationReport, Evaluator, ReplicateInput, RmseComputer, RmseResult,
    };

    // Sinks
    pub use crate::sink::{CsvImputedSink, CsvResultSink, ImputedSink, ResultSink};
}
