//! Experiment-level evaluation driver

use crate::config::EvaluationConfig;
use crate::data::{ReplicateDataset, ReplicatePaths, SeriesExtractor, SeriesTable, TableLoader};
use crate::error::{ImputeError, Result};
use crate::evaluation::aggregator::{
    ErrorAggregator, SeriesOutcome, SeriesScore, SkippedReplicate, SkippedSeries,
};
use crate::evaluation::report::EvaluationReport;
use crate::evaluation::rmse::{RmseComputer, RmseResult};
use crate::imputation::{ImputationEngine, ImputationModel, IterativeImputer, SeedSource};
use crate::sink::{CsvImputedSink, SinkContext};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A replicate as handed to the evaluator: loaded, or failed to load
#[derive(Debug)]
pub enum ReplicateInput {
    Loaded(ReplicateDataset),
    Failed { name: String, error: ImputeError },
}

impl ReplicateInput {
    /// Load both tables, capturing any failure
    pub fn load(loader: &TableLoader, paths: &ReplicatePaths) -> Self {
        match loader.load_replicate(paths) {
            Ok(dataset) => ReplicateInput::Loaded(dataset),
            Err(error) => ReplicateInput::Failed {
                name: paths.name.clone(),
                error,
            },
        }
    }
}

impl From<ReplicateDataset> for ReplicateInput {
    fn from(dataset: ReplicateDataset) -> Self {
        ReplicateInput::Loaded(dataset)
    }
}

/// One series with its pre-drawn seeds
struct WorkUnit {
    replicate: String,
    masked: SeriesTable,
    truth: SeriesTable,
    seeds: Vec<u64>,
}

/// Runs imputation over every series of every replicate and reduces the
/// squared errors to one RMSE.
///
/// Seeds are drawn in (replicate, series, repetition) order before any work
/// is dispatched, and outcomes are folded back in that order, so parallel and
/// sequential runs agree exactly.
pub struct Evaluator<M: ImputationModel> {
    config: EvaluationConfig,
    engine: ImputationEngine<M>,
    extractor: SeriesExtractor,
    cancel: Arc<AtomicBool>,
    pool: Option<rayon::ThreadPool>,
}

impl Evaluator<IterativeImputer> {
    /// Evaluator using the configured iterative imputer
    pub fn from_config(config: EvaluationConfig) -> Result<Self> {
        let model = IterativeImputer::new(config.imputer.clone());
        Self::new(config, model)
    }
}

impl<M: ImputationModel> Evaluator<M> {
    pub fn new(config: EvaluationConfig, model: M) -> Result<Self> {
        config.validate()?;

        let cancel = Arc::new(AtomicBool::new(false));
        let mut engine = ImputationEngine::new(model, config.repetitions)?
            .with_parallel(config.parallel_repetitions)
            .with_cancel_flag(cancel.clone());
        if config.export.enabled {
            engine = engine.with_sink(Arc::new(CsvImputedSink::new(
                config.export.imputed_dir.clone(),
            )));
        }

        let pool = match config.n_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| ImputeError::ConfigError(format!("thread pool: {}", e)))?,
            ),
            None => None,
        };

        Ok(Self {
            config,
            engine,
            extractor: SeriesExtractor::new(),
            cancel,
            pool,
        })
    }

    /// Setting this flag stops the run before the next repetition
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Load every replicate named by the configured layout
    pub fn load_replicates(&self, loader: &TableLoader) -> Vec<ReplicateInput> {
        self.config
            .layout
            .resolve_all(self.config.experiment, self.config.masking_level)
            .iter()
            .map(|paths| ReplicateInput::load(loader, paths))
            .collect()
    }

    /// Accumulate squared errors over all replicates
    pub fn aggregate(
        &self,
        replicates: Vec<ReplicateInput>,
        seeds: &mut dyn SeedSource,
    ) -> Result<ErrorAggregator> {
        let mut aggregator = ErrorAggregator::new();
        let mut units = Vec::new();

        for input in replicates {
            let dataset = match input {
                ReplicateInput::Loaded(dataset) => dataset,
                ReplicateInput::Failed { name, error } => {
                    warn!(replicate = %name, error = %error, "Skipping replicate");
                    aggregator.skip_replicate(SkippedReplicate {
                        replicate: name,
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            let series_ids = dataset.masked.series_ids();
            info!(
                replicate = %dataset.name,
                rows = dataset.observations(),
                series = series_ids.len(),
                "Imputing replicate"
            );
            aggregator.begin_replicate(&dataset.name);

            for id in series_ids {
                match self.extractor.extract(&dataset.masked, &dataset.truth, id) {
                    Ok((masked, truth)) => {
                        if self.config.exclude_complete_series && masked.missing_count() == 0 {
                            debug!(replicate = %dataset.name, series = %id, "Excluding complete series");
                            continue;
                        }
                        units.push(WorkUnit {
                            replicate: dataset.name.clone(),
                            masked,
                            truth,
                            seeds: seeds.take_seeds(self.engine.repetitions()),
                        });
                    }
                    Err(error) => {
                        warn!(replicate = %dataset.name, series = %id, error = %error, "Skipping series");
                        aggregator.skip_series(SkippedSeries {
                            replicate: dataset.name.clone(),
                            series_id: id.to_string(),
                            reason: error.to_string(),
                        });
                    }
                }
            }
        }

        for outcome in self.run_units(&units)? {
            aggregator.record(outcome);
        }

        Ok(aggregator)
    }

    /// Aggregate and compute the final RMSE
    pub fn evaluate(
        &self,
        replicates: Vec<ReplicateInput>,
        seeds: &mut dyn SeedSource,
    ) -> Result<EvaluationReport> {
        let start = Instant::now();
        let aggregator = self.aggregate(replicates, seeds)?;

        let rmse = RmseComputer::new().compute(
            aggregator.total_squared_error(),
            aggregator.total_observations(),
        )?;

        let result = RmseResult {
            rmse,
            masking_level: self.config.masking_level,
            experiment: self.config.experiment,
            method_label: self.config.method_label.clone(),
            total_squared_error: aggregator.total_squared_error(),
            total_observations: aggregator.total_observations(),
        };

        info!(
            rmse,
            masking_level = %self.config.masking_level,
            experiment = %self.config.experiment,
            observations = result.total_observations,
            "Evaluation complete"
        );

        Ok(EvaluationReport {
            result,
            replicates: aggregator.replicates().to_vec(),
            skipped_replicates: aggregator.skipped_replicates().to_vec(),
            skipped_series: aggregator.skipped_series().to_vec(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Resolve, load and evaluate every replicate of the configured layout
    pub fn evaluate_experiment(
        &self,
        loader: &TableLoader,
        seeds: &mut dyn SeedSource,
    ) -> Result<EvaluationReport> {
        let replicates = self.load_replicates(loader);
        self.evaluate(replicates, seeds)
    }

    fn run_units(&self, units: &[WorkUnit]) -> Result<Vec<SeriesOutcome>> {
        match &self.pool {
            Some(pool) => pool.install(|| self.dispatch(units)),
            None => self.dispatch(units),
        }
    }

    fn dispatch(&self, units: &[WorkUnit]) -> Result<Vec<SeriesOutcome>> {
        if self.config.parallel {
            units.par_iter().map(|unit| self.run_unit(unit)).collect()
        } else {
            units.iter().map(|unit| self.run_unit(unit)).collect()
        }
    }

    /// Score one series; recoverable failures become a skip
    fn run_unit(&self, unit: &WorkUnit) -> Result<SeriesOutcome> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(ImputeError::Cancelled);
        }

        let context = SinkContext::new(unit.replicate.clone(), unit.masked.id());
        match self
            .engine
            .score_with_seeds(&unit.masked, &unit.truth, &unit.seeds, &context)
        {
            Ok(average_squared_error) => Ok(SeriesOutcome::Scored(SeriesScore {
                replicate: unit.replicate.clone(),
                series_id: unit.masked.id().to_string(),
                average_squared_error,
                observations: unit.masked.len(),
                repetitions: unit.seeds.len(),
            })),
            Err(error) if error.is_recoverable() => {
                warn!(
                    replicate = %unit.replicate,
                    series = %unit.masked.id(),
                    error = %error,
                    "Skipping series"
                );
                Ok(SeriesOutcome::Skipped(SkippedSeries {
                    replicate: unit.replicate.clone(),
                    series_id: unit.masked.id().to_string(),
                    reason: error.to_string(),
                }))
            }
            Err(error) => Err(error),
        }
    }
}
