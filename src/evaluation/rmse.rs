//! Final RMSE computation

use crate::config::{ExperimentType, MaskingLevel};
use crate::error::{ImputeError, Result};
use serde::{Deserialize, Serialize};

/// Degrees-of-freedom adjusted RMSE over grand totals
#[derive(Debug, Clone, Copy, Default)]
pub struct RmseComputer;

impl RmseComputer {
    /// Degrees of freedom lost to estimation
    pub const DEGREES_LOST: usize = 1;

    pub fn new() -> Self {
        Self
    }

    /// `sqrt(total_squared_error / (total_observations - 1))`
    pub fn compute(&self, total_squared_error: f64, total_observations: usize) -> Result<f64> {
        if total_observations <= Self::DEGREES_LOST {
            return Err(ImputeError::DegenerateSample {
                observations: total_observations,
            });
        }
        if !total_squared_error.is_finite() || total_squared_error < 0.0 {
            return Err(ImputeError::ComputationError(format!(
                "total squared error must be finite and non-negative, got {}",
                total_squared_error
            )));
        }

        let divisor = (total_observations - Self::DEGREES_LOST) as f64;
        Ok((total_squared_error / divisor).sqrt())
    }
}

/// Reported metric of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RmseResult {
    pub rmse: f64,
    pub masking_level: MaskingLevel,
    pub experiment: ExperimentType,
    pub method_label: String,
    pub total_squared_error: f64,
    pub total_observations: usize,
}
