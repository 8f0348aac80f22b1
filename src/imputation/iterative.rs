//! Iterative imputer using chained Bayesian ridge regressions

use crate::error::{ImputeError, Result};
use crate::imputation::bayesian_ridge::BayesianRidge;
use crate::imputation::{is_missing, ImputationModel, Imputer, InitialStrategy};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Settings for [`IterativeImputer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterativeImputerConfig {
    /// Round-robin passes over the columns
    pub max_iter: usize,
    /// Early-stopping tolerance, only used without posterior sampling
    pub tol: f64,
    /// Draw imputations from the predictive distribution instead of its mean
    pub sample_posterior: bool,
    /// Fill used before the first pass
    pub initial_strategy: InitialStrategy,
}

impl Default for IterativeImputerConfig {
    fn default() -> Self {
        Self {
            max_iter: 10,
            tol: 1e-3,
            sample_posterior: true,
            initial_strategy: InitialStrategy::Mean,
        }
    }
}

/// Iterative imputer (round-robin conditional regression)
///
/// Each pass regresses every incomplete column on all other columns with a
/// [`BayesianRidge`] model and refills that column's missing cells. Columns
/// are visited in ascending order of their missing fraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterativeImputer {
    config: IterativeImputerConfig,
    /// Random seed
    seed: Option<u64>,
    /// Initial fill per column
    initial_values: Option<Array1<f64>>,
    /// Column visiting order
    imputation_order: Option<Vec<usize>>,
}

impl IterativeImputer {
    /// Create new iterative imputer
    pub fn new(config: IterativeImputerConfig) -> Self {
        Self {
            config,
            seed: None,
            initial_values: None,
            imputation_order: None,
        }
    }

    /// Set max iterations
    pub fn with_max_iter(mut self, n: usize) -> Self {
        self.config.max_iter = n.max(1);
        self
    }

    /// Toggle posterior sampling
    pub fn with_sample_posterior(mut self, sample: bool) -> Self {
        self.config.sample_posterior = sample;
        self
    }

    /// Set initial strategy
    pub fn with_initial_strategy(mut self, strategy: InitialStrategy) -> Self {
        self.config.initial_strategy = strategy;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Initial value for a column
    fn initial_value(&self, observed: &[f64]) -> f64 {
        match self.config.initial_strategy {
            InitialStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
            InitialStrategy::Median => {
                let mut sorted = observed.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            InitialStrategy::Constant => 0.0,
        }
    }

    /// Refill one column from a regression on the others
    fn impute_column(
        &self,
        data: &mut Array2<f64>,
        missing: &Array2<bool>,
        target_col: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        let n_features = data.ncols();
        let feature_cols: Vec<usize> = (0..n_features).filter(|&c| c != target_col).collect();

        let (missing_indices, observed_indices): (Vec<usize>, Vec<usize>) =
            (0..data.nrows()).partition(|&row| missing[[row, target_col]]);

        let x_train = Array2::from_shape_fn(
            (observed_indices.len(), feature_cols.len()),
            |(i, j)| data[[observed_indices[i], feature_cols[j]]],
        );
        let y_train: Array1<f64> = observed_indices
            .iter()
            .map(|&row| data[[row, target_col]])
            .collect();

        let mut estimator = BayesianRidge::new();
        estimator.fit(&x_train, &y_train)?;

        let x_test = Array2::from_shape_fn(
            (missing_indices.len(), feature_cols.len()),
            |(i, j)| data[[missing_indices[i], feature_cols[j]]],
        );

        let imputed = if self.config.sample_posterior {
            let (means, stds) = estimator.predict_with_std(&x_test)?;
            means
                .iter()
                .zip(stds.iter())
                .map(|(&mu, &sigma)| {
                    if sigma > 0.0 {
                        let z: f64 = rng.sample(StandardNormal);
                        mu + sigma * z
                    } else {
                        mu
                    }
                })
                .collect::<Vec<f64>>()
        } else {
            estimator.predict(&x_test)?.to_vec()
        };

        for (&row, value) in missing_indices.iter().zip(imputed) {
            if !value.is_finite() {
                return Err(ImputeError::Imputation(format!(
                    "non-finite imputation in column {} row {}",
                    target_col, row
                )));
            }
            data[[row, target_col]] = value;
        }

        Ok(())
    }
}

impl Default for IterativeImputer {
    fn default() -> Self {
        Self::new(IterativeImputerConfig::default())
    }
}

impl Imputer for IterativeImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let n_features = x.ncols();
        let n_rows = x.nrows().max(1) as f64;

        let mut initial_values = Vec::with_capacity(n_features);
        let mut missing_fraction = Vec::with_capacity(n_features);

        for col_idx in 0..n_features {
            let observed: Vec<f64> = x
                .column(col_idx)
                .iter()
                .filter(|v| !is_missing(**v))
                .copied()
                .collect();
            let n_missing = x.nrows() - observed.len();

            if observed.is_empty() && n_missing > 0 {
                return Err(ImputeError::Imputation(format!(
                    "column {} has no observed values",
                    col_idx
                )));
            }

            let initial = if observed.is_empty() {
                0.0
            } else {
                self.initial_value(&observed)
            };
            initial_values.push(initial);
            missing_fraction.push(n_missing as f64 / n_rows);
        }

        // Ascending by missing fraction; complete columns have nothing to refill
        let mut order: Vec<usize> = (0..n_features)
            .filter(|&c| missing_fraction[c] > 0.0)
            .collect();
        order.sort_by(|&a, &b| {
            missing_fraction[a]
                .partial_cmp(&missing_fraction[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        self.initial_values = Some(Array1::from_vec(initial_values));
        self.imputation_order = Some(order);

        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (initial_values, order) = match (&self.initial_values, &self.imputation_order) {
            (Some(values), Some(order)) => (values, order),
            _ => {
                return Err(ImputeError::Imputation("Imputer not fitted".to_string()));
            }
        };

        if x.ncols() != initial_values.len() {
            return Err(ImputeError::ShapeError {
                expected: format!("{} columns", initial_values.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let missing = x.mapv(is_missing);
        let mut result = x.clone();

        // Initial imputation
        for ((_, col_idx), value) in result.indexed_iter_mut() {
            if is_missing(*value) {
                *value = initial_values[col_idx];
            }
        }

        if order.is_empty() {
            return Ok(result);
        }

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let observed_scale = x
            .iter()
            .filter(|v| !is_missing(**v))
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let tolerance = self.config.tol * observed_scale;

        for _ in 0..self.config.max_iter {
            let previous = result.clone();
            for &target_col in order {
                self.impute_column(&mut result, &missing, target_col, &mut rng)?;
            }

            if !self.config.sample_posterior {
                let change = result
                    .iter()
                    .zip(previous.iter())
                    .fold(0.0_f64, |acc, (a, b)| acc.max((a - b).abs()));
                if change < tolerance {
                    break;
                }
            }
        }

        Ok(result)
    }
}

impl ImputationModel for IterativeImputer {
    fn impute(&self, data: &Array2<f64>, seed: u64) -> Result<Array2<f64>> {
        let mut imputer = IterativeImputer::new(self.config.clone()).with_seed(seed);
        imputer.fit_transform(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_with_gap() -> Array2<f64> {
        Array2::from_shape_vec(
            (5, 2),
            vec![
                0.0, 0.10,
                1.0, 0.35,
                2.0, f64::NAN,
                4.0, 0.70,
                8.0, 0.90,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_iterative_fills_missing() {
        let data = series_with_gap();
        let mut imputer = IterativeImputer::default().with_seed(42);

        let result = imputer.fit_transform(&data).unwrap();
        assert!(!result.iter().any(|v| v.is_nan()));
        // Observed cells are untouched
        assert_eq!(result[[0, 1]], 0.10);
        assert_eq!(result[[4, 0]], 8.0);
    }

    #[test]
    fn test_iterative_same_seed_is_reproducible() {
        let data = series_with_gap();
        let a = IterativeImputer::default().impute(&data, 7).unwrap();
        let b = IterativeImputer::default().impute(&data, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_iterative_seed_changes_draw() {
        let data = series_with_gap();
        let a = IterativeImputer::default().impute(&data, 1).unwrap();
        let b = IterativeImputer::default().impute(&data, 2).unwrap();
        assert_ne!(a[[2, 1]], b[[2, 1]]);
    }

    #[test]
    fn test_iterative_point_estimate_is_deterministic() {
        let data = series_with_gap();
        let imputer = IterativeImputer::default().with_sample_posterior(false);
        let a = imputer.impute(&data, 1).unwrap();
        let b = imputer.impute(&data, 2).unwrap();
        assert_eq!(a, b);
        // Linear-ish trend: the gap at t = 2 sits between its neighbours
        assert!(a[[2, 1]] > 0.10 && a[[2, 1]] < 0.90);
    }

    #[test]
    fn test_iterative_complete_data_unchanged() {
        let data = Array2::from_shape_vec((3, 2), vec![0.0, 1.0, 1.0, 2.0, 2.0, 3.0]).unwrap();
        let result = IterativeImputer::default().impute(&data, 3).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn test_iterative_all_missing_column_errors() {
        let data = Array2::from_shape_vec(
            (3, 2),
            vec![0.0, f64::NAN, 1.0, f64::NAN, 2.0, f64::NAN],
        )
        .unwrap();
        let result = IterativeImputer::default().impute(&data, 3);
        assert!(matches!(result, Err(ImputeError::Imputation(_))));
    }

    #[test]
    fn test_iterative_median_initial() {
        let data = Array2::from_shape_vec(
            (4, 2),
            vec![
                1.0, 10.0,
                2.0, f64::NAN,
                f64::NAN, 30.0,
                4.0, 40.0,
            ],
        )
        .unwrap();

        let mut imputer = IterativeImputer::default()
            .with_initial_strategy(InitialStrategy::Median)
            .with_max_iter(3)
            .with_seed(11);

        let result = imputer.fit_transform(&data).unwrap();
        assert!(!result.iter().any(|v| v.is_nan()));
    }

    #[test]
    fn test_transform_unfitted() {
        let imputer = IterativeImputer::default();
        assert!(imputer.transform(&series_with_gap()).is_err());
    }
}
