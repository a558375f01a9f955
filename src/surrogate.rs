//! Gaussian-process surrogate model.
//!
//! The surrogate is the crate's model of the scoring function: a GP over
//! unit-space inputs, fitted by Cholesky decomposition and queried for a
//! posterior mean and variance at arbitrary points. It is rebuilt from the
//! full observation history on every refit and never patched in place.
//!
//! # Fitting
//!
//! 1. Scores are standardized to zero mean and unit variance (standard
//!    deviation floored at `1e-10`), so the kernel works on a stable scale
//!    regardless of the objective's units.
//! 2. Hyperparameters come from [`Tuning`]: either the per-dimension
//!    input standard deviation clamped to `>= 0.01` ([`Tuning::Defaults`]),
//!    or log-marginal-likelihood maximization by multi-start compass search
//!    ([`Tuning::MarginalLikelihood`]).
//! 3. `K = k(X, X) + (noise + jitter) I` is factorized with
//!    [`nalgebra::linalg::Cholesky`]. When the factorization fails the
//!    jitter escalates through a fixed ladder (`1e-10`, `1e-9`, ... up to
//!    [`SurrogateConfig::max_jitter`]); only an exhausted ladder is an
//!    error.
//!
//! # Prediction
//!
//! [`GaussianProcess::predict`] returns the posterior mean and variance
//! mapped back to the original score scale. Variance is clamped to `>= 0`;
//! at a training point it tends to the noise floor.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::kernel::{Kernel, SquaredExponential};

/// Default observation-noise variance added to the kernel diagonal.
pub const DEFAULT_NOISE_VARIANCE: f64 = 1e-6;
/// Default ceiling for the jitter escalation ladder.
pub const DEFAULT_MAX_JITTER: f64 = 1e-2;
/// First rung of the jitter ladder; each retry multiplies by 10.
const BASE_JITTER: f64 = 1e-10;
/// Floor for the standard deviation used to standardize scores.
const MIN_Y_STD: f64 = 1e-10;
/// Floor for heuristic ARD lengthscales.
const MIN_LENGTHSCALE: f64 = 0.01;

/// How kernel hyperparameters are chosen during a fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tuning {
    /// Heuristic lengthscales: per-dimension standard deviation of the
    /// training inputs, clamped to `>= 0.01`. Cheap and robust.
    #[default]
    Defaults,
    /// Maximize the log marginal likelihood over per-dimension log
    /// lengthscales with a deterministic multi-start compass search.
    /// Costs one Cholesky factorization per probed point.
    MarginalLikelihood,
}

/// Configuration for [`GaussianProcess::fit`].
///
/// Assembled by
/// [`BayesOptBuilder`](crate::optimizer::BayesOptBuilder); usable directly
/// when driving the surrogate by hand.
#[derive(Clone)]
pub struct SurrogateConfig {
    /// Covariance function. Default: [`SquaredExponential`].
    pub kernel: Arc<dyn Kernel>,
    /// Observation-noise variance added to the kernel diagonal.
    pub noise_variance: f64,
    /// Largest diagonal jitter the escalation ladder may reach.
    pub max_jitter: f64,
    /// Hyperparameter selection strategy.
    pub tuning: Tuning,
    /// Number of compass-search restarts for [`Tuning::MarginalLikelihood`].
    pub tuning_restarts: usize,
}

impl Default for SurrogateConfig {
    fn default() -> Self {
        Self {
            kernel: Arc::new(SquaredExponential),
            noise_variance: DEFAULT_NOISE_VARIANCE,
            max_jitter: DEFAULT_MAX_JITTER,
            tuning: Tuning::Defaults,
            tuning_restarts: 3,
        }
    }
}

impl core::fmt::Debug for SurrogateConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SurrogateConfig")
            .field("noise_variance", &self.noise_variance)
            .field("max_jitter", &self.max_jitter)
            .field("tuning", &self.tuning)
            .field("tuning_restarts", &self.tuning_restarts)
            .finish_non_exhaustive()
    }
}

/// A fit attempt that exhausted the jitter ladder (or had no data).
///
/// Carries no loop context; the optimization loop maps it to
/// [`Error::SurrogateFit`](crate::error::Error::SurrogateFit) with the
/// iteration and retry count filled in.
#[derive(Clone, Copy, Debug, thiserror::Error)]
#[error("covariance matrix not positive definite with jitter up to {max_jitter:e}")]
pub struct FitFailure {
    /// The largest jitter that was attempted.
    pub max_jitter: f64,
}

/// A fitted Gaussian process, ready for prediction.
///
/// Holds the Cholesky factor of `K + (noise + jitter) I`, the weight vector
/// `alpha = (K + (noise + jitter) I)^-1 y`, the training inputs, and the
/// standardization constants needed to report predictions on the original
/// score scale.
pub struct GaussianProcess {
    kernel: Arc<dyn Kernel>,
    x_train: Vec<Vec<f64>>,
    y_train: Vec<f64>,
    lengthscales: Vec<f64>,
    signal_var: f64,
    noise_var: f64,
    jitter: f64,
    max_jitter: f64,
    cholesky: nalgebra::linalg::Cholesky<f64, nalgebra::Dyn>,
    alpha: DVector<f64>,
    y_mean: f64,
    y_std: f64,
    best_score: f64,
    log_marginal: f64,
}

impl core::fmt::Debug for GaussianProcess {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GaussianProcess")
            .field("n_train", &self.x_train.len())
            .field("lengthscales", &self.lengthscales)
            .field("noise_var", &self.noise_var)
            .field("jitter", &self.jitter)
            .field("log_marginal", &self.log_marginal)
            .finish_non_exhaustive()
    }
}

impl GaussianProcess {
    /// Fits a GP to unit-space inputs and raw scores.
    ///
    /// `x` rows are points in `[0, 1]^d`; `y` holds one finite score per
    /// row. The jitter ladder is walked automatically.
    ///
    /// # Errors
    ///
    /// Returns [`FitFailure`] if `x` is empty or no rung of the jitter
    /// ladder yields a positive-definite covariance matrix.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        config: &SurrogateConfig,
    ) -> Result<Self, FitFailure> {
        if x.is_empty() || x.len() != y.len() {
            return Err(FitFailure {
                max_jitter: config.max_jitter,
            });
        }

        let standardized = Standardized::from_scores(y);
        let heuristic = heuristic_lengthscales(x);
        let lengthscales = match config.tuning {
            Tuning::Defaults => heuristic,
            Tuning::MarginalLikelihood => tune_lengthscales(
                config.kernel.as_ref(),
                x,
                &standardized.values,
                config.noise_variance,
                &heuristic,
                config.tuning_restarts,
            ),
        };

        Self::assemble(
            Arc::clone(&config.kernel),
            x.to_vec(),
            lengthscales,
            1.0,
            config.noise_variance,
            config.max_jitter,
            standardized,
        )
    }

    /// Refits on new data with this model's hyperparameters frozen.
    ///
    /// Used for batch decorrelation: hallucinated observations are appended
    /// and the model is rebuilt without re-tuning lengthscales, so the
    /// update costs a single factorization.
    ///
    /// # Errors
    ///
    /// Returns [`FitFailure`] when the jitter ladder is exhausted.
    pub fn refit_frozen(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Self, FitFailure> {
        if x.is_empty() || x.len() != y.len() {
            return Err(FitFailure {
                max_jitter: self.max_jitter,
            });
        }
        Self::assemble(
            Arc::clone(&self.kernel),
            x.to_vec(),
            self.lengthscales.clone(),
            self.signal_var,
            self.noise_var,
            self.max_jitter,
            Standardized::from_scores(y),
        )
    }

    /// Builds the model for fixed hyperparameters, walking the jitter ladder.
    fn assemble(
        kernel: Arc<dyn Kernel>,
        x_train: Vec<Vec<f64>>,
        lengthscales: Vec<f64>,
        signal_var: f64,
        noise_var: f64,
        max_jitter: f64,
        standardized: Standardized,
    ) -> Result<Self, FitFailure> {
        let (cholesky, jitter) = factorize_with_ladder(
            kernel.as_ref(),
            &x_train,
            &lengthscales,
            signal_var,
            noise_var,
            max_jitter,
        )
        .ok_or(FitFailure { max_jitter })?;

        let y_vec = DVector::from_column_slice(&standardized.values);
        let alpha = cholesky.solve(&y_vec);
        let log_marginal = log_marginal_likelihood(&cholesky, &y_vec, &alpha);
        let best_score = standardized.raw_max;

        Ok(Self {
            kernel,
            x_train,
            y_train: standardized.raw,
            lengthscales,
            signal_var,
            noise_var,
            jitter,
            max_jitter,
            cholesky,
            alpha,
            y_mean: standardized.mean,
            y_std: standardized.std,
            best_score,
            log_marginal,
        })
    }

    /// Posterior mean and variance at a unit-space point, on the original
    /// score scale. Variance is clamped to `>= 0`.
    #[must_use]
    pub fn predict(&self, unit: &[f64]) -> (f64, f64) {
        let k_star = kernel_vector(
            self.kernel.as_ref(),
            unit,
            &self.x_train,
            &self.lengthscales,
            self.signal_var,
        );

        let mean = k_star.dot(&self.alpha);

        let k_self = self
            .kernel
            .covariance(unit, unit, &self.lengthscales, self.signal_var);
        let v = self.cholesky.solve(&k_star);
        let var = (k_self - k_star.dot(&v)).max(0.0);

        (
            self.y_mean + self.y_std * mean,
            self.y_std * self.y_std * var,
        )
    }

    /// Largest score in the training data, on the original scale.
    ///
    /// The acquisition functions take this as the incumbent to improve on.
    #[must_use]
    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    /// Log marginal likelihood of the standardized training data under the
    /// fitted hyperparameters.
    #[must_use]
    pub fn log_marginal_likelihood(&self) -> f64 {
        self.log_marginal
    }

    /// Fitted per-dimension ARD lengthscales.
    #[must_use]
    pub fn lengthscales(&self) -> &[f64] {
        &self.lengthscales
    }

    /// Diagonal jitter the successful factorization used (0 when none was
    /// needed).
    #[must_use]
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Number of training points.
    #[must_use]
    pub fn train_len(&self) -> usize {
        self.x_train.len()
    }

    /// The unit-space inputs this model was fitted on.
    pub(crate) fn training_inputs(&self) -> &[Vec<f64>] {
        &self.x_train
    }

    /// The raw scores this model was fitted on.
    pub(crate) fn training_scores(&self) -> &[f64] {
        &self.y_train
    }
}

/// Scores shifted to zero mean and unit variance, with the raw values kept
/// for the training-data accessors.
struct Standardized {
    values: Vec<f64>,
    raw: Vec<f64>,
    mean: f64,
    std: f64,
    raw_max: f64,
}

impl Standardized {
    #[allow(clippy::cast_precision_loss)]
    fn from_scores(y: &[f64]) -> Self {
        let n = y.len();
        let mean = y.iter().sum::<f64>() / n as f64;
        let var = if n > 1 {
            y.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            1.0
        };
        let std = var.sqrt().max(MIN_Y_STD);
        Self {
            values: y.iter().map(|&v| (v - mean) / std).collect(),
            raw: y.to_vec(),
            mean,
            std,
            raw_max: y.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Per-dimension standard deviation of the inputs, clamped to
/// [`MIN_LENGTHSCALE`].
#[allow(clippy::cast_precision_loss)]
fn heuristic_lengthscales(x: &[Vec<f64>]) -> Vec<f64> {
    let n = x.len();
    let d = x[0].len();
    (0..d)
        .map(|j| {
            let mean = x.iter().map(|row| row[j]).sum::<f64>() / n as f64;
            let var = x.iter().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / n as f64;
            var.sqrt().max(MIN_LENGTHSCALE)
        })
        .collect()
}

/// Builds `K + (noise + jitter) I`.
fn kernel_matrix(
    kernel: &dyn Kernel,
    x: &[Vec<f64>],
    lengthscales: &[f64],
    signal_var: f64,
    diag: f64,
) -> DMatrix<f64> {
    let n = x.len();
    DMatrix::from_fn(n, n, |i, j| {
        let k = kernel.covariance(&x[i], &x[j], lengthscales, signal_var);
        if i == j { k + diag } else { k }
    })
}

/// Computes `k(x*, X)` for a test point.
fn kernel_vector(
    kernel: &dyn Kernel,
    x_star: &[f64],
    x_train: &[Vec<f64>],
    lengthscales: &[f64],
    signal_var: f64,
) -> DVector<f64> {
    DVector::from_fn(x_train.len(), |i, _| {
        kernel.covariance(x_star, &x_train[i], lengthscales, signal_var)
    })
}

/// Tries the base noise first, then walks the jitter ladder until the
/// factorization succeeds or `max_jitter` is passed.
fn factorize_with_ladder(
    kernel: &dyn Kernel,
    x: &[Vec<f64>],
    lengthscales: &[f64],
    signal_var: f64,
    noise_var: f64,
    max_jitter: f64,
) -> Option<(nalgebra::linalg::Cholesky<f64, nalgebra::Dyn>, f64)> {
    let mut jitter = 0.0;
    loop {
        let k = kernel_matrix(kernel, x, lengthscales, signal_var, noise_var + jitter);
        if let Some(chol) = nalgebra::linalg::Cholesky::new(k) {
            return Some((chol, jitter));
        }
        jitter = if jitter == 0.0 {
            BASE_JITTER
        } else {
            jitter * 10.0
        };
        if jitter > max_jitter {
            return None;
        }
    }
}

/// `log p(y | X, theta) = -0.5 y^T alpha - sum(ln L_ii) - n/2 ln(2 pi)`.
#[allow(clippy::cast_precision_loss)]
fn log_marginal_likelihood(
    cholesky: &nalgebra::linalg::Cholesky<f64, nalgebra::Dyn>,
    y: &DVector<f64>,
    alpha: &DVector<f64>,
) -> f64 {
    const LN_2PI: f64 = 1.837_877_066_409_345_5;
    let n = y.len();
    let l = cholesky.l();
    let log_det_half: f64 = (0..n).map(|i| l[(i, i)].ln()).sum();
    -0.5 * y.dot(alpha) - log_det_half - 0.5 * n as f64 * LN_2PI
}

/// Log marginal likelihood for candidate lengthscales, `-inf` when the
/// covariance cannot be factorized (tuning never escalates jitter).
fn tuning_objective(
    kernel: &dyn Kernel,
    x: &[Vec<f64>],
    y_std: &[f64],
    noise_var: f64,
    log_ls: &[f64],
) -> f64 {
    let lengthscales: Vec<f64> = log_ls.iter().map(|v| v.exp()).collect();
    let k = kernel_matrix(kernel, x, &lengthscales, 1.0, noise_var);
    let Some(chol) = nalgebra::linalg::Cholesky::new(k) else {
        return f64::NEG_INFINITY;
    };
    let y_vec = DVector::from_column_slice(y_std);
    let alpha = chol.solve(&y_vec);
    log_marginal_likelihood(&chol, &y_vec, &alpha)
}

/// Bounds for log lengthscales during tuning, `ln(0.01)` to `ln(10)`.
const LOG_LS_MIN: f64 = -4.605_170_185_988_091;
const LOG_LS_MAX: f64 = 2.302_585_092_994_046;
/// Compass-search schedule for tuning.
const TUNING_INITIAL_STEP: f64 = 0.5;
const TUNING_MIN_STEP: f64 = 0.02;
const TUNING_MAX_ITERS: usize = 40;

/// Maximizes the log marginal likelihood over per-dimension log
/// lengthscales.
///
/// Deterministic multi-start compass search: restarts scale the heuristic
/// lengthscales geometrically (`..., 1/4, 1, 4, ...`), each start descends
/// coordinate-wise with a halving step. Falls back to the heuristic when no
/// probed point beats it.
fn tune_lengthscales(
    kernel: &dyn Kernel,
    x: &[Vec<f64>],
    y_std: &[f64],
    noise_var: f64,
    heuristic: &[f64],
    restarts: usize,
) -> Vec<f64> {
    let heuristic_log: Vec<f64> = heuristic
        .iter()
        .map(|l| l.ln().clamp(LOG_LS_MIN, LOG_LS_MAX))
        .collect();

    let mut best_log = heuristic_log.clone();
    let mut best_value = tuning_objective(kernel, x, y_std, noise_var, &heuristic_log);

    let restarts = restarts.max(1);
    #[allow(clippy::cast_precision_loss)]
    for r in 0..restarts {
        // geometric ladder of scale factors centered on the heuristic
        let offset = (r as f64 - (restarts - 1) as f64 / 2.0) * 4f64.ln();
        let start: Vec<f64> = heuristic_log
            .iter()
            .map(|v| (v + offset).clamp(LOG_LS_MIN, LOG_LS_MAX))
            .collect();

        let (log_ls, value) =
            compass_search_lml(kernel, x, y_std, noise_var, start);
        if value > best_value {
            best_value = value;
            best_log = log_ls;
        }
    }

    best_log.into_iter().map(f64::exp).collect()
}

/// Coordinate-wise pattern search over log lengthscales.
#[allow(clippy::float_cmp)]
fn compass_search_lml(
    kernel: &dyn Kernel,
    x: &[Vec<f64>],
    y_std: &[f64],
    noise_var: f64,
    mut point: Vec<f64>,
) -> (Vec<f64>, f64) {
    let mut value = tuning_objective(kernel, x, y_std, noise_var, &point);
    let mut step = TUNING_INITIAL_STEP;

    for _ in 0..TUNING_MAX_ITERS {
        let mut improved = false;
        for dim in 0..point.len() {
            for dir in [1.0, -1.0] {
                let candidate_coord =
                    (point[dim] + dir * step).clamp(LOG_LS_MIN, LOG_LS_MAX);
                if candidate_coord == point[dim] {
                    continue;
                }
                let mut candidate = point.clone();
                candidate[dim] = candidate_coord;
                let v = tuning_objective(kernel, x, y_std, noise_var, &candidate);
                if v > value {
                    value = v;
                    point = candidate;
                    improved = true;
                    break;
                }
            }
        }
        if !improved {
            step /= 2.0;
            if step < TUNING_MIN_STEP {
                break;
            }
        }
    }

    (point, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Matern52;

    fn grid_1d(n: usize) -> Vec<Vec<f64>> {
        #[allow(clippy::cast_precision_loss)]
        (0..n).map(|i| vec![i as f64 / (n - 1) as f64]).collect()
    }

    #[test]
    fn fit_rejects_empty_data() {
        let config = SurrogateConfig::default();
        assert!(GaussianProcess::fit(&[], &[], &config).is_err());
    }

    #[test]
    fn predict_recovers_training_points() {
        let x = grid_1d(6);
        let y: Vec<f64> = x.iter().map(|p| (p[0] * 4.0).sin()).collect();
        let gp = GaussianProcess::fit(&x, &y, &SurrogateConfig::default()).unwrap();

        for (xi, yi) in x.iter().zip(&y) {
            let (mean, var) = gp.predict(xi);
            assert!(
                (mean - yi).abs() < 1e-3,
                "mean {mean} should be close to {yi}"
            );
            assert!(var >= 0.0);
            assert!(var < 1e-3, "variance {var} should approach the noise floor");
        }
    }

    #[test]
    fn variance_grows_away_from_data() {
        let x = vec![vec![0.4], vec![0.5], vec![0.6]];
        let y = vec![1.0, 1.2, 1.1];
        let gp = GaussianProcess::fit(&x, &y, &SurrogateConfig::default()).unwrap();

        let (_, var_inside) = gp.predict(&[0.5]);
        let (_, var_outside) = gp.predict(&[0.05]);
        assert!(var_outside > var_inside);
    }

    #[test]
    fn predictions_are_on_the_original_scale() {
        // scores far from zero mean; a model in standardized space that
        // forgot to map back would be off by orders of magnitude
        let x = grid_1d(5);
        let y = vec![1000.0, 1001.0, 1003.0, 1002.0, 1001.5];
        let gp = GaussianProcess::fit(&x, &y, &SurrogateConfig::default()).unwrap();

        let (mean, _) = gp.predict(&[0.5]);
        assert!((mean - 1001.5).abs() < 5.0);
        assert!((gp.best_score() - 1003.0).abs() < 1e-12);
    }

    #[test]
    fn constant_scores_fit_without_failure() {
        let x = grid_1d(4);
        let y = vec![2.0; 4];
        let gp = GaussianProcess::fit(&x, &y, &SurrogateConfig::default()).unwrap();
        let (mean, var) = gp.predict(&[0.3]);
        assert!((mean - 2.0).abs() < 1e-6);
        assert!(var >= 0.0);
    }

    #[test]
    fn duplicate_rows_escalate_jitter_instead_of_failing() {
        // identical rows make K singular at zero jitter
        let x = vec![vec![0.5, 0.5]; 8];
        let y = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let config = SurrogateConfig {
            noise_variance: 0.0,
            ..SurrogateConfig::default()
        };
        let gp = GaussianProcess::fit(&x, &y, &config).unwrap();
        assert!(gp.jitter() > 0.0);
    }

    #[test]
    fn single_observation_fits() {
        let gp = GaussianProcess::fit(
            &[vec![0.5]],
            &[3.0],
            &SurrogateConfig::default(),
        )
        .unwrap();
        let (mean, var) = gp.predict(&[0.5]);
        assert!((mean - 3.0).abs() < 1e-6);
        assert!(var < 1e-6);
    }

    #[test]
    fn matern_kernel_fits_too() {
        let x = grid_1d(6);
        let y: Vec<f64> = x.iter().map(|p| -(p[0] - 0.7).powi(2)).collect();
        let config = SurrogateConfig {
            kernel: Arc::new(Matern52),
            ..SurrogateConfig::default()
        };
        let gp = GaussianProcess::fit(&x, &y, &config).unwrap();
        let (mean, _) = gp.predict(&[0.7]);
        assert!(mean > -0.05);
    }

    #[test]
    fn marginal_likelihood_tuning_never_degrades_fit_quality() {
        let x = grid_1d(10);
        let y: Vec<f64> = x.iter().map(|p| (p[0] * 6.0).sin()).collect();

        let defaults = GaussianProcess::fit(&x, &y, &SurrogateConfig::default()).unwrap();
        let config = SurrogateConfig {
            tuning: Tuning::MarginalLikelihood,
            ..SurrogateConfig::default()
        };
        let tuned = GaussianProcess::fit(&x, &y, &config).unwrap();

        assert!(tuned.log_marginal_likelihood() >= defaults.log_marginal_likelihood() - 1e-9);
    }

    #[test]
    fn refit_frozen_keeps_hyperparameters() {
        let x = grid_1d(6);
        let y: Vec<f64> = x.iter().map(|p| p[0] * 2.0).collect();
        let gp = GaussianProcess::fit(&x, &y, &SurrogateConfig::default()).unwrap();

        let mut x2 = x.clone();
        x2.push(vec![0.55]);
        let mut y2 = y.clone();
        y2.push(1.1);
        let refit = gp.refit_frozen(&x2, &y2).unwrap();

        assert_eq!(refit.lengthscales(), gp.lengthscales());
        assert_eq!(refit.train_len(), 7);
    }

    #[test]
    fn log_marginal_likelihood_is_finite() {
        let x = grid_1d(8);
        let y: Vec<f64> = x.iter().map(|p| p[0].cos()).collect();
        let gp = GaussianProcess::fit(&x, &y, &SurrogateConfig::default()).unwrap();
        assert!(gp.log_marginal_likelihood().is_finite());
    }
}
