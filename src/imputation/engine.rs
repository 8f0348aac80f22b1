//! Repeated imputation and squared-error scoring of one series

use crate::data::{SeriesTable, VALUE_COL};
use crate::error::{ImputeError, Result};
use crate::imputation::{ImputationModel, SeedSource};
use crate::sink::{ImputedSink, NullSink, SinkContext};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// One stochastic imputation of a series
#[derive(Debug, Clone)]
pub struct ImputationRun {
    /// 1-based repetition number
    pub repetition: usize,
    pub seed: u64,
    /// Imputed `[t, A0]` table
    pub imputed: Array2<f64>,
    /// Sum over rows of `(imputed - true)^2`
    pub squared_error: f64,
}

/// Runs a model repeatedly on one series and averages its squared error.
///
/// The average is taken over repetitions of the per-series sum, not over
/// rows, so longer series weigh proportionally more in later aggregation.
pub struct ImputationEngine<M: ImputationModel> {
    model: M,
    repetitions: usize,
    parallel: bool,
    sink: Arc<dyn ImputedSink>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<M: ImputationModel> ImputationEngine<M> {
    pub fn new(model: M, repetitions: usize) -> Result<Self> {
        if repetitions == 0 {
            return Err(ImputeError::InvalidParameter {
                name: "repetitions".to_string(),
                value: "0".to_string(),
                reason: "at least one repetition is required".to_string(),
            });
        }
        Ok(Self {
            model,
            repetitions,
            parallel: false,
            sink: Arc::new(NullSink),
            cancel: None,
        })
    }

    /// Run repetitions on the rayon pool
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Export every imputed table to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn ImputedSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Abort between repetitions once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn repetitions(&self) -> usize {
        self.repetitions
    }

    /// Draw one seed per repetition and score the series
    pub fn impute_and_score(
        &self,
        masked: &SeriesTable,
        truth: &SeriesTable,
        seeds: &mut dyn SeedSource,
        context: &SinkContext,
    ) -> Result<f64> {
        let seeds = seeds.take_seeds(self.repetitions);
        self.score_with_seeds(masked, truth, &seeds, context)
    }

    /// Score the series with one repetition per given seed
    pub fn score_with_seeds(
        &self,
        masked: &SeriesTable,
        truth: &SeriesTable,
        seeds: &[u64],
        context: &SinkContext,
    ) -> Result<f64> {
        if seeds.is_empty() {
            return Err(ImputeError::InvalidParameter {
                name: "seeds".to_string(),
                value: "[]".to_string(),
                reason: "at least one repetition is required".to_string(),
            });
        }
        if masked.len() != truth.len() {
            return Err(ImputeError::Alignment {
                series: masked.id().to_string(),
                required: masked.len(),
                available: truth.len(),
            });
        }

        let true_values = truth.value_vector();
        let run = |(i, &seed): (usize, &u64)| -> Result<f64> {
            let outcome = self.run_once(masked, &true_values, i + 1, seed)?;
            self.export(&outcome, context);
            Ok(outcome.squared_error)
        };

        let errors: Vec<f64> = if self.parallel {
            seeds.par_iter().enumerate().map(run).collect::<Result<_>>()?
        } else {
            seeds.iter().enumerate().map(run).collect::<Result<_>>()?
        };

        let average = errors.iter().sum::<f64>() / errors.len() as f64;
        debug!(
            series = %masked.id(),
            repetitions = errors.len(),
            average_squared_error = average,
            "Scored series"
        );
        Ok(average)
    }

    /// Impute once with `seed` and score against `true_values`
    pub fn run_once(
        &self,
        masked: &SeriesTable,
        true_values: &Array1<f64>,
        repetition: usize,
        seed: u64,
    ) -> Result<ImputationRun> {
        if self.is_cancelled() {
            return Err(ImputeError::Cancelled);
        }

        let imputed = self.model.impute(masked.data(), seed)?;
        if imputed.nrows() != true_values.len() || imputed.ncols() <= VALUE_COL {
            return Err(ImputeError::ShapeError {
                expected: format!("{} rows with a value column", true_values.len()),
                actual: format!("{:?}", imputed.shape()),
            });
        }

        let squared_error: f64 = imputed
            .column(VALUE_COL)
            .iter()
            .zip(true_values.iter())
            .map(|(&imputed, &truth)| (imputed - truth).powi(2))
            .sum();

        if !squared_error.is_finite() {
            return Err(ImputeError::Imputation(format!(
                "non-finite squared error for series {} (repetition {})",
                masked.id(),
                repetition
            )));
        }

        Ok(ImputationRun {
            repetition,
            seed,
            imputed,
            squared_error,
        })
    }

    fn export(&self, run: &ImputationRun, context: &SinkContext) {
        if let Err(e) = self.sink.write(&run.imputed, run.repetition, context) {
            warn!(
                replicate = %context.replicate,
                series = %context.series,
                repetition = run.repetition,
                error = %e,
                "Failed to export imputed table"
            );
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}
