#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sequential model-based optimization of expensive black-box functions: a
//! Gaussian-process surrogate, closed-form acquisition functions and a
//! batch-capable optimization loop over bounded continuous and integer
//! parameters, with no required feature flags and no global state.
//!
//! # Getting Started
//!
//! Find the maximum of a function the optimizer can only probe point by
//! point:
//!
//! ```
//! use bayesopt::prelude::*;
//!
//! let domain = Domain::builder()
//!     .continuous("x", 0.0, 10.0)
//!     .build()
//!     .unwrap();
//!
//! let mut opt = BayesOpt::builder(domain)
//!     .init_points(5)
//!     .iterations(15)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! opt.run(|pars: &Pars| {
//!     let x = pars["x"].as_f64();
//!     Ok::<_, Error>(-(x - 7.0).powi(2))
//! })
//! .unwrap();
//!
//! let (best, score) = opt.best_pars().unwrap();
//! println!("x = {:.3}, score = {:.3}", best["x"].as_f64(), score);
//! ```
//!
//! The optimizer always maximizes; negate inside the closure to minimize.
//! Scoring functions may fail or return non-finite values: those slots are
//! excluded with a [`Warning`](history::Warning) and the run keeps going.
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Domain`] | Declare the search space: named continuous and integer parameters with finite bounds. |
//! | [`BayesOpt`] | Drive the loop: initial design, surrogate refits, batch proposals, stop rules. |
//! | [`ScoreFn`](objective::ScoreFn) | The black box being maximized. Plain closures work out of the box. |
//! | [`Acquisition`] | The exploration/exploitation trade-off: expected improvement, UCB or probability of improvement. |
//! | [`Kernel`](kernel::Kernel) | Surrogate covariance: squared exponential or Matérn 5/2, with ARD lengthscales. |
//! | [`Observation`](history::Observation) | One completed evaluation, as returned by [`BayesOpt::score_summary`]. |
//!
//! # How a run proceeds
//!
//! 1. Evaluate an initial space-filling design (Latin hypercube by default,
//!    plus any user seed points).
//! 2. Fit a Gaussian process to every observation so far, in a normalized
//!    unit cube.
//! 3. Maximize the acquisition function over the cube to pick the next
//!    batch; batches are decorrelated with the kriging-believer scheme.
//! 4. Evaluate, absorb the results in submission order, repeat from 2 until
//!    the iteration budget is spent or a stop rule fires.
//!
//! Seeded runs are fully reproducible: randomness comes from a single
//! [`fastrand`] generator threaded through every component.
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `async` | Concurrent batch evaluation via tokio ([`BayesOpt::run_async`]) | off |
//! | `serde` | `Serialize`/`Deserialize` on public config and result types | off |
//! | `sobol` | Sobol initial designs ([`InitialDesign::Sobol`]) | off |
//! | `tracing` | Structured log events at fit, proposal and batch completion | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod acquisition;
pub mod domain;
mod error;
pub mod history;
pub mod kernel;
pub mod objective;
pub mod optimizer;
mod param;
pub mod proposal;
mod rng_util;
pub mod surrogate;
mod types;

pub use acquisition::Acquisition;
pub use domain::Domain;
pub use error::{Error, Result};
pub use objective::{Evaluation, ScoreFn};
pub use optimizer::{BayesOpt, BayesOptBuilder};
pub use param::{ParamValue, Pars};
pub use types::{InitialDesign, Phase, StopReason};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use bayesopt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acquisition::{Acquisition, Candidate};
    pub use crate::domain::{Domain, DomainBuilder, ParamKind, ParamSpec};
    pub use crate::error::{Error, Result};
    pub use crate::history::{History, Observation, Origin, Warning};
    pub use crate::kernel::{Kernel, Matern52, SquaredExponential};
    pub use crate::objective::{AuxValue, Evaluation, ScoreFn};
    pub use crate::optimizer::{BayesOpt, BayesOptBuilder};
    pub use crate::param::{ParamValue, Pars};
    pub use crate::proposal::SearchConfig;
    pub use crate::surrogate::{GaussianProcess, SurrogateConfig, Tuning};
    pub use crate::types::{InitialDesign, Phase, StopReason};
}
