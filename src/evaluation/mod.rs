//! Error aggregation and RMSE evaluation
//!
//! The evaluator turns replicate datasets into per-series work units, scores
//! each one with the imputation engine, folds the scores into an
//! [`ErrorAggregator`] and finishes with [`RmseComputer`].

mod aggregator;
mod report;
mod rmse;
mod runner;

pub use aggregator::{
    AggregateError, ErrorAggregator, ReplicateTotals, SeriesOutcome, SeriesScore,
    SkippedReplicate, SkippedSeries,
};
pub use report::EvaluationReport;
pub use rmse::{RmseComputer, RmseResult};
pub use runner::{Evaluator, ReplicateInput};
