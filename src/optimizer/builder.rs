use std::time::Duration;

use crate::acquisition::Acquisition;
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::history::History;
use crate::kernel::Kernel;
use crate::param::Pars;
use crate::proposal::SearchConfig;
use crate::surrogate::{SurrogateConfig, Tuning};
use crate::types::{InitialDesign, Phase};

use super::{BayesOpt, DEFAULT_FIT_RETRIES, DEFAULT_INIT_POINTS, DEFAULT_ITERATIONS};

/// A builder for configuring a [`BayesOpt`] run with a fluent API.
///
/// Created via [`BayesOpt::builder`]. Every knob has a default; only the
/// domain is required.
///
/// # Defaults
///
/// - `init_points`: 5, drawn by Latin hypercube
/// - `iterations`: 10, `batch_size`: 1
/// - acquisition: expected improvement (`xi = 0.01`)
/// - kernel: squared exponential, heuristic lengthscales
/// - `noise_variance`: `1e-6`, jitter ladder up to `1e-2`
/// - `dup_tolerance`: `1e-6`, `fit_retries`: 3
/// - no stop rules, no scoring retries, random seed
///
/// # Examples
///
/// ```
/// use bayesopt::kernel::Matern52;
/// use bayesopt::prelude::*;
/// use bayesopt::surrogate::Tuning;
///
/// let domain = Domain::builder()
///     .continuous("lr", 1e-4, 1e-1)
///     .integer("layers", 1, 8)
///     .build()
///     .unwrap();
///
/// let opt = BayesOpt::builder(domain)
///     .init_points(8)
///     .iterations(20)
///     .batch_size(3)
///     .acquisition(Acquisition::upper_confidence_bound(2.576))
///     .kernel(Matern52)
///     .tuning(Tuning::MarginalLikelihood)
///     .seed(42)
///     .build()
///     .unwrap();
/// # let _ = opt;
/// ```
#[must_use]
pub struct BayesOptBuilder {
    domain: Domain,
    acquisition: Acquisition,
    surrogate: SurrogateConfig,
    search: SearchConfig,
    init_points: usize,
    iterations: usize,
    batch_size: usize,
    initial_design: InitialDesign,
    seed_points: Vec<Pars>,
    fit_retries: usize,
    retry_failed_scores: bool,
    target_score: Option<f64>,
    patience: Option<usize>,
    time_budget: Option<Duration>,
    #[cfg(feature = "async")]
    concurrency: Option<usize>,
    seed: Option<u64>,
}

impl BayesOptBuilder {
    pub(super) fn new(domain: Domain) -> Self {
        Self {
            domain,
            acquisition: Acquisition::default(),
            surrogate: SurrogateConfig::default(),
            search: SearchConfig::default(),
            init_points: DEFAULT_INIT_POINTS,
            iterations: DEFAULT_ITERATIONS,
            batch_size: 1,
            initial_design: InitialDesign::default(),
            seed_points: Vec::new(),
            fit_retries: DEFAULT_FIT_RETRIES,
            retry_failed_scores: false,
            target_score: None,
            patience: None,
            time_budget: None,
            #[cfg(feature = "async")]
            concurrency: None,
            seed: None,
        }
    }

    /// Sets the size of the initial space-filling design.
    ///
    /// User seed points count toward this; the remainder is drawn according
    /// to [`initial_design`](Self::initial_design). Default: 5.
    pub fn init_points(mut self, n: usize) -> Self {
        self.init_points = n;
        self
    }

    /// Sets the number of optimization passes a [`run`](BayesOpt::run)
    /// performs. Default: 10.
    pub fn iterations(mut self, n: usize) -> Self {
        self.iterations = n;
        self
    }

    /// Sets how many candidates each pass proposes and evaluates.
    ///
    /// Values of 0 are treated as 1. Default: 1.
    pub fn batch_size(mut self, k: usize) -> Self {
        self.batch_size = k;
        self
    }

    /// Sets the acquisition function. Default: expected improvement.
    pub fn acquisition(mut self, acquisition: Acquisition) -> Self {
        self.acquisition = acquisition;
        self
    }

    /// Sets the surrogate covariance kernel. Default:
    /// [`SquaredExponential`](crate::kernel::SquaredExponential).
    pub fn kernel(mut self, kernel: impl Kernel + 'static) -> Self {
        self.surrogate.kernel = std::sync::Arc::new(kernel);
        self
    }

    /// Sets the hyperparameter selection strategy. Default:
    /// [`Tuning::Defaults`].
    pub fn tuning(mut self, tuning: Tuning) -> Self {
        self.surrogate.tuning = tuning;
        self
    }

    /// Sets the number of restarts for marginal-likelihood tuning.
    /// Default: 3.
    pub fn tuning_restarts(mut self, restarts: usize) -> Self {
        self.surrogate.tuning_restarts = restarts;
        self
    }

    /// Sets the observation-noise variance on the kernel diagonal.
    ///
    /// Raise it for noisy scoring functions. Default: `1e-6`.
    pub fn noise_variance(mut self, variance: f64) -> Self {
        self.surrogate.noise_variance = variance;
        self
    }

    /// Sets the ceiling of the jitter escalation ladder. Default: `1e-2`.
    pub fn max_jitter(mut self, jitter: f64) -> Self {
        self.surrogate.max_jitter = jitter;
        self
    }

    /// Sets how the initial design is drawn. Default: Latin hypercube.
    pub fn initial_design(mut self, design: InitialDesign) -> Self {
        self.initial_design = design;
        self
    }

    /// Adds a point to evaluate first, before any drawn design point.
    ///
    /// Must name exactly the domain's parameters with in-bounds values;
    /// [`build`](Self::build) rejects the configuration otherwise.
    pub fn seed_point(mut self, pars: Pars) -> Self {
        self.seed_points.push(pars);
        self
    }

    /// Sets the minimum distance (in the unit cube) between any two
    /// evaluated points. Default: `1e-6`.
    pub fn dup_tolerance(mut self, tolerance: f64) -> Self {
        self.search.dup_tolerance = tolerance.abs();
        self
    }

    /// Replaces the acquisition-search knobs wholesale.
    ///
    /// Note that [`dup_tolerance`](Self::dup_tolerance) lives inside
    /// [`SearchConfig`]; set it after this call if both are customized.
    pub fn search(mut self, config: SearchConfig) -> Self {
        self.search = config;
        self
    }

    /// Sets how often a failed surrogate fit is retried after perturbing
    /// the offending training inputs. Default: 3.
    pub fn fit_retries(mut self, retries: usize) -> Self {
        self.fit_retries = retries;
        self
    }

    /// Re-evaluates a failed or non-finite score once before excluding the
    /// observation. Default: off.
    pub fn retry_failed_scores(mut self, retry: bool) -> Self {
        self.retry_failed_scores = retry;
        self
    }

    /// Stops the run once the best score reaches `target`.
    pub fn target_score(mut self, target: f64) -> Self {
        self.target_score = Some(target);
        self
    }

    /// Stops the run after `iterations` consecutive passes without strict
    /// improvement of the best score.
    pub fn patience(mut self, iterations: usize) -> Self {
        self.patience = Some(iterations);
        self
    }

    /// Stops the run once it has been going for `budget`, checked between
    /// batches (a running batch is never interrupted).
    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    /// Caps how many evaluations [`run_async`](BayesOpt::run_async) keeps
    /// in flight at once. When unset, each dispatch (the initial design
    /// included) runs its whole batch concurrently.
    #[cfg(feature = "async")]
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit.max(1));
        self
    }

    /// Seeds the run's RNG for reproducibility. Default: random.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration and builds the optimizer.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidObservation`] if a seed point is misnamed or out
    ///   of bounds, or if `init_points` is 0 with no seed points (there
    ///   would be nothing to fit the surrogate on).
    pub fn build(self) -> Result<BayesOpt> {
        for pars in &self.seed_points {
            validate_seed_point(&self.domain, pars)?;
        }
        if self.init_points == 0 && self.seed_points.is_empty() {
            return Err(Error::InvalidObservation {
                iteration: 0,
                reason: "init_points is 0 and no seed points were provided".to_string(),
            });
        }

        #[allow(unused_mut)]
        let mut rng = self
            .seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        #[cfg(feature = "sobol")]
        let sobol_seed = rng.u32(..);

        Ok(BayesOpt {
            domain: self.domain,
            acquisition: self.acquisition,
            surrogate: self.surrogate,
            search: self.search,
            init_points: self.init_points,
            iterations: self.iterations,
            batch_size: self.batch_size.max(1),
            initial_design: self.initial_design,
            seed_points: self.seed_points,
            fit_retries: self.fit_retries,
            retry_failed_scores: self.retry_failed_scores,
            target_score: self.target_score,
            patience: self.patience,
            time_budget: self.time_budget,
            #[cfg(feature = "async")]
            concurrency: self.concurrency,
            #[cfg(feature = "sobol")]
            sobol_seed,
            rng,
            history: History::default(),
            warnings: Vec::new(),
            phase: Phase::Init,
            iteration: 0,
            stall_count: 0,
        })
    }
}

/// Checks that a seed point names exactly the domain's parameters with
/// in-bounds values.
fn validate_seed_point(domain: &Domain, pars: &Pars) -> Result<()> {
    for spec in domain.specs() {
        let Some(value) = pars.get(spec.name()) else {
            return Err(Error::InvalidObservation {
                iteration: 0,
                reason: format!("seed point is missing parameter '{}'", spec.name()),
            });
        };
        let v = value.as_f64();
        if !(spec.low()..=spec.high()).contains(&v) {
            return Err(Error::InvalidObservation {
                iteration: 0,
                reason: format!(
                    "seed value {v} for '{}' is outside [{}, {}]",
                    spec.name(),
                    spec.low(),
                    spec.high()
                ),
            });
        }
    }
    if pars.len() != domain.len()
        && let Some(extra) = pars.keys().find(|k| domain.spec(k).is_none())
    {
        return Err(Error::InvalidObservation {
            iteration: 0,
            reason: format!("seed point names unknown parameter '{extra}'"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamValue;

    fn domain() -> Domain {
        Domain::builder()
            .continuous("x", 0.0, 1.0)
            .integer("n", 1, 5)
            .build()
            .unwrap()
    }

    #[test]
    fn build_accepts_in_bounds_seed_points() {
        let seed: Pars = [
            ("x".to_string(), ParamValue::Float(0.5)),
            ("n".to_string(), ParamValue::Int(2)),
        ]
        .into();
        assert!(BayesOpt::builder(domain()).seed_point(seed).build().is_ok());
    }

    #[test]
    fn build_rejects_out_of_bounds_seed_points() {
        let seed: Pars = [
            ("x".to_string(), ParamValue::Float(1.5)),
            ("n".to_string(), ParamValue::Int(2)),
        ]
        .into();
        let err = BayesOpt::builder(domain()).seed_point(seed).build();
        assert!(matches!(err, Err(Error::InvalidObservation { .. })));
    }

    #[test]
    fn build_rejects_misnamed_seed_points() {
        let seed: Pars = [
            ("x".to_string(), ParamValue::Float(0.5)),
            ("bogus".to_string(), ParamValue::Int(2)),
        ]
        .into();
        let err = BayesOpt::builder(domain()).seed_point(seed).build();
        assert!(matches!(err, Err(Error::InvalidObservation { reason, .. })
            if reason.contains("missing parameter 'n'")));
    }

    #[test]
    fn build_rejects_an_empty_initial_design() {
        let err = BayesOpt::builder(domain()).init_points(0).build();
        assert!(matches!(err, Err(Error::InvalidObservation { .. })));
    }

    #[test]
    fn zero_init_points_with_seeds_is_allowed() {
        let seed: Pars = [
            ("x".to_string(), ParamValue::Float(0.5)),
            ("n".to_string(), ParamValue::Int(2)),
        ]
        .into();
        let opt = BayesOpt::builder(domain())
            .init_points(0)
            .seed_point(seed)
            .build();
        assert!(opt.is_ok());
    }

    #[test]
    fn batch_size_zero_is_clamped_to_one() {
        let opt = BayesOpt::builder(domain()).batch_size(0).build().unwrap();
        assert_eq!(opt.batch_size, 1);
    }
}
