//! The optimization loop: initial design, surrogate refits, proposals and
//! stopping.
//!
//! [`BayesOpt`] owns everything a run needs (domain, history, RNG, warnings)
//! behind `&mut self`, so there is no shared mutable state and no locking
//! anywhere in the engine. A run moves through the phases
//!
//! ```text
//! Init -> Evaluating -> Fitting -> Proposing -> Evaluating -> ... -> Done
//!                          \________________________________/     | Failed
//!                               one pass per iteration
//! ```
//!
//! - **Init** evaluates the initial design: user seed points topped up to
//!   `init_points` with space-filling draws.
//! - Each pass refits the surrogate on the full history, proposes a batch by
//!   acquisition maximization, evaluates it, and absorbs the results in
//!   submission order.
//! - The loop ends when the iteration budget is spent or a stop rule fires
//!   ([`target_score`](BayesOptBuilder::target_score),
//!   [`patience`](BayesOptBuilder::patience),
//!   [`time_budget`](BayesOptBuilder::time_budget)); the
//!   [`StopReason`](crate::types::StopReason) is returned.
//!
//! Recoverable trouble (failed or non-finite scores, near-duplicate points,
//! ill-conditioned covariance, a failed acquisition search) is repaired with
//! retries, perturbation and random fallbacks, and every repair is recorded
//! as a [`Warning`](crate::history::Warning). Only construction errors and
//! exhausted retry ceilings abort a run.
//!
//! # Examples
//!
//! ```
//! use bayesopt::prelude::*;
//!
//! let domain = Domain::builder().continuous("x", 0.0, 10.0).build().unwrap();
//! let mut opt = BayesOpt::builder(domain)
//!     .init_points(4)
//!     .iterations(6)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! let reason = opt
//!     .run(|pars: &Pars| {
//!         let x = pars["x"].as_f64();
//!         Ok::<_, Error>(-(x - 7.0).powi(2))
//!     })
//!     .unwrap();
//!
//! assert_eq!(reason, StopReason::IterationsExhausted);
//! let (best, score) = opt.best_pars().unwrap();
//! assert!((best["x"].as_f64() - 7.0).abs() < 1.5);
//! assert!(score > -2.0);
//! ```

use std::time::Duration;

use crate::acquisition::Acquisition;
use crate::domain::Domain;
use crate::history::{History, Warning};
use crate::param::Pars;
use crate::proposal::SearchConfig;
use crate::surrogate::SurrogateConfig;
use crate::types::{InitialDesign, Phase};

mod builder;
mod run;
mod summary;

#[cfg(feature = "async")]
mod async_impl;

pub use builder::BayesOptBuilder;

/// Default size of the initial space-filling design.
const DEFAULT_INIT_POINTS: usize = 5;
/// Default number of optimization passes per [`BayesOpt::run`].
const DEFAULT_ITERATIONS: usize = 10;
/// Default ceiling on perturb-and-refit attempts after a fit failure.
const DEFAULT_FIT_RETRIES: usize = 3;
/// Standard deviation of the Gaussian nudge applied to near-duplicates.
const PERTURB_SIGMA: f64 = 1e-3;
/// Perturbation attempts before a duplicate is replaced by a random draw.
const PERTURB_ATTEMPTS: usize = 10;

/// A sequential model-based optimizer over a bounded parameter domain.
///
/// Construct through [`BayesOpt::builder`], then drive with
/// [`run`](Self::run) (or [`run_async`](Self::run_async) behind the `async`
/// feature). The optimizer maximizes the score returned by the scoring
/// function; negate inside the closure to minimize.
///
/// All state lives in this struct: repeated [`run_more`](Self::run_more)
/// calls continue a finished run on the accumulated history.
pub struct BayesOpt {
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
    #[cfg(feature = "sobol")]
    sobol_seed: u32,
    rng: fastrand::Rng,
    history: History,
    warnings: Vec<Warning>,
    phase: Phase,
    iteration: usize,
    stall_count: usize,
}

impl BayesOpt {
    /// Returns a builder over the given domain.
    #[must_use]
    pub fn builder(domain: Domain) -> BayesOptBuilder {
        BayesOptBuilder::new(domain)
    }
}

impl core::fmt::Debug for BayesOpt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BayesOpt")
            .field("phase", &self.phase)
            .field("iteration", &self.iteration)
            .field("n_observations", &self.history.len())
            .field("best_score", &self.history.best_score())
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}
