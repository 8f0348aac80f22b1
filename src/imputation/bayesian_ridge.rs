//! Bayesian ridge regression with predictive uncertainty
//!
//! Evidence maximisation over the noise precision `alpha` and the weight
//! precision `lambda`, each with a Gamma prior. The fitted posterior covariance
//! gives a predictive standard deviation, which is what posterior-sampling
//! imputation draws from.

use crate::error::{ImputeError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

const JACOBI_SWEEPS: usize = 64;

/// Bayesian ridge regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesianRidge {
    /// Maximum evidence-maximisation iterations
    max_iter: usize,
    /// Stop once the L1 change in coefficients falls below this
    tol: f64,
    /// Gamma prior shape over alpha
    alpha_1: f64,
    /// Gamma prior rate over alpha
    alpha_2: f64,
    /// Gamma prior shape over lambda
    lambda_1: f64,
    /// Gamma prior rate over lambda
    lambda_2: f64,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
    alpha: f64,
    lambda: f64,
    sigma: Option<Array2<f64>>,
}

impl Default for BayesianRidge {
    fn default() -> Self {
        Self::new()
    }
}

impl BayesianRidge {
    pub fn new() -> Self {
        Self {
            max_iter: 300,
            tol: 1e-3,
            alpha_1: 1e-6,
            alpha_2: 1e-6,
            lambda_1: 1e-6,
            lambda_2: 1e-6,
            coefficients: None,
            intercept: 0.0,
            alpha: 1.0,
            lambda: 1.0,
            sigma: None,
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Estimated noise precision
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Estimated weight precision
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 {
            return Err(ImputeError::Imputation(
                "cannot fit regression on zero samples".to_string(),
            ));
        }
        if y.len() != n_samples {
            return Err(ImputeError::ShapeError {
                expected: format!("{} targets", n_samples),
                actual: format!("{} targets", y.len()),
            });
        }

        let x_offset = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let y_offset = y.mean().unwrap_or(0.0);
        let xc = x - &x_offset;
        let yc = y - y_offset;

        let gram = xc.t().dot(&xc);
        let xty = xc.t().dot(&yc);
        let (mut eigenvalues, eigenvectors) = symmetric_eigen(&gram);
        eigenvalues.mapv_inplace(|e| e.max(0.0));

        let n = n_samples as f64;
        let var_y = yc.dot(&yc) / n;
        let mut alpha = 1.0 / (var_y + f64::EPSILON);
        let mut lambda = 1.0;

        let mut coef_old: Option<Array1<f64>> = None;
        let mut coef = Array1::zeros(n_features);

        for _ in 0..self.max_iter {
            coef = ridge_coefficients(&eigenvalues, &eigenvectors, &xty, lambda / alpha);
            let residual_ss = residual_sum_of_squares(&xc, &yc, &coef);

            let gamma: f64 = eigenvalues
                .iter()
                .map(|&e| alpha * e / (lambda + alpha * e))
                .sum();
            lambda = (gamma + 2.0 * self.lambda_1) / (coef.dot(&coef) + 2.0 * self.lambda_2);
            alpha = (n - gamma + 2.0 * self.alpha_1) / (residual_ss + 2.0 * self.alpha_2);

            if let Some(old) = &coef_old {
                let change: f64 = old.iter().zip(coef.iter()).map(|(a, b)| (a - b).abs()).sum();
                if change < self.tol {
                    break;
                }
            }
            coef_old = Some(coef.clone());
        }

        if n_features > 0 {
            coef = ridge_coefficients(&eigenvalues, &eigenvectors, &xty, lambda / alpha);
        }

        if !alpha.is_finite() || !lambda.is_finite() || coef.iter().any(|c| !c.is_finite()) {
            return Err(ImputeError::Imputation(format!(
                "bayesian ridge diverged (alpha = {}, lambda = {})",
                alpha, lambda
            )));
        }

        // Posterior covariance over the data-supported directions only
        let rank = n_samples.min(n_features);
        let mut order: Vec<usize> = (0..n_features).collect();
        order.sort_by(|&a, &b| {
            eigenvalues[b]
                .partial_cmp(&eigenvalues[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut sigma = Array2::zeros((n_features, n_features));
        for &k in order.iter().take(rank) {
            let v = eigenvectors.column(k);
            let weight = 1.0 / (alpha * eigenvalues[k] + lambda);
            for i in 0..n_features {
                for j in 0..n_features {
                    sigma[[i, j]] += weight * v[i] * v[j];
                }
            }
        }

        self.intercept = y_offset - x_offset.dot(&coef);
        self.coefficients = Some(coef);
        self.alpha = alpha;
        self.lambda = lambda;
        self.sigma = Some(sigma);

        Ok(())
    }

    /// Predictive mean
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coef = self.coefficients.as_ref().ok_or_else(|| {
            ImputeError::Imputation("regression model not fitted".to_string())
        })?;
        if x.ncols() != coef.len() {
            return Err(ImputeError::ShapeError {
                expected: format!("{} features", coef.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coef) + self.intercept)
    }

    /// Predictive mean and standard deviation
    pub fn predict_with_std(&self, x: &Array2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        let mean = self.predict(x)?;
        let sigma = self.sigma.as_ref().ok_or_else(|| {
            ImputeError::Imputation("regression model not fitted".to_string())
        })?;

        let noise_var = 1.0 / self.alpha;
        let std = x
            .outer_iter()
            .map(|row| (row.dot(&sigma.dot(&row)) + noise_var).max(0.0).sqrt())
            .collect::<Array1<f64>>();

        Ok((mean, std))
    }
}

/// `(X^T X + ratio * I)^-1 X^T y` in the eigenbasis of `X^T X`
fn ridge_coefficients(
    eigenvalues: &Array1<f64>,
    eigenvectors: &Array2<f64>,
    xty: &Array1<f64>,
    ratio: f64,
) -> Array1<f64> {
    let projected = eigenvectors.t().dot(xty);
    let scaled: Array1<f64> = projected
        .iter()
        .zip(eigenvalues.iter())
        .map(|(&p, &e)| p / (e + ratio))
        .collect();
    eigenvectors.dot(&scaled)
}

fn residual_sum_of_squares(x: &Array2<f64>, y: &Array1<f64>, coef: &Array1<f64>) -> f64 {
    let fitted = x.dot(coef);
    y.iter().zip(fitted.iter()).map(|(&yi, &fi)| (yi - fi).powi(2)).sum()
}

/// Cyclic Jacobi eigendecomposition of a small symmetric matrix.
///
/// Returns eigenvalues and the matrix whose columns are the matching
/// eigenvectors.
fn symmetric_eigen(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut m = a.clone();
    let mut v = Array2::eye(n);

    let scale: f64 = a.iter().map(|x| x * x).sum::<f64>().max(f64::MIN_POSITIVE);

    for _ in 0..JACOBI_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += m[[p, q]] * m[[p, q]];
            }
        }
        if off <= 1e-30 * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = m[[p, q]];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (m[[q, q]] - m[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let mkp = m[[k, p]];
                    let mkq = m[[k, q]];
                    m[[k, p]] = c * mkp - s * mkq;
                    m[[k, q]] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let mpk = m[[p, k]];
                    let mqk = m[[q, k]];
                    m[[p, k]] = c * mpk - s * mqk;
                    m[[q, k]] = s * mpk + c * mqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    (m.diag().to_owned(), v)
}
