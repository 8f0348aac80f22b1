//! Multiple imputation of masked series
//!
//! Provides:
//! - Bayesian ridge regression with predictive uncertainty
//! - Iterative (chained-equation) imputer with posterior sampling
//! - Injectable seed streams
//! - The repeated-imputation scoring engine

mod bayesian_ridge;
mod engine;
mod iterative;
mod seeds;

pub use bayesian_ridge::BayesianRidge;
pub use engine::{ImputationEngine, ImputationRun};
pub use iterative::{IterativeImputer, IterativeImputerConfig};
pub use seeds::{FixedSeeds, RandomSeeds, SeedSource};

use crate::error::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Strategy for initial imputation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialStrategy {
    /// Mean imputation
    Mean,
    /// Median imputation
    Median,
    /// Constant value (0)
    Constant,
}

/// Trait for imputers
pub trait Imputer: Send + Sync {
    /// Fit the imputer on data with missing values
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Transform data by imputing missing values
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Fit and transform in one step
    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// A stochastic imputation procedure driven by an explicit seed.
///
/// The same `(data, seed)` pair must always produce the same output.
pub trait ImputationModel: Send + Sync {
    /// Return a fully observed copy of `data`
    fn impute(&self, data: &Array2<f64>, seed: u64) -> Result<Array2<f64>>;
}

/// Check if value is missing (NaN)
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}
