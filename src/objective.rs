//! The [`ScoreFn`] trait defines what gets optimized.
//!
//! The engine treats the scoring function as a black box: it receives named
//! parameter values and returns a finite score to maximize, optionally with
//! auxiliary values to keep alongside the observation. It may be slow, noisy
//! and fallible — failures become warnings on the run, not aborts.
//!
//! For simple cases, pass a closure directly to
//! [`BayesOpt::run`](crate::optimizer::BayesOpt::run):
//!
//! ```
//! use bayesopt::prelude::*;
//!
//! let domain = Domain::builder().continuous("x", 0.0, 10.0).build().unwrap();
//! let mut opt = BayesOpt::builder(domain)
//!     .init_points(3)
//!     .iterations(2)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! opt.run(|pars: &Pars| {
//!     let x = pars["x"].as_f64();
//!     Ok::<_, Error>(-(x - 7.0).powi(2))
//! })
//! .unwrap();
//! ```
//!
//! To attach auxiliary values, return an [`Evaluation`]:
//!
//! ```
//! use bayesopt::objective::Evaluation;
//! use bayesopt::prelude::*;
//!
//! let score_fn = |pars: &Pars| {
//!     let x = pars["x"].as_f64();
//!     Ok::<_, Error>(
//!         Evaluation::new(-(x - 7.0).powi(2)).with_aux("epochs", 12),
//!     )
//! };
//! # let _ = score_fn;
//! ```

use std::collections::HashMap;

use crate::param::Pars;

/// A scalar score plus any auxiliary values to keep with it.
///
/// The score is the quantity being maximized; auxiliary values are carried
/// verbatim into the observation row for later inspection (wall-clock time,
/// secondary metrics, labels).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Evaluation {
    /// The score to maximize. Must be finite to enter the history.
    pub score: f64,
    /// Auxiliary values attached by the scoring function.
    pub aux: HashMap<String, AuxValue>,
}

impl Evaluation {
    /// Wraps a bare score with no auxiliary values.
    #[must_use]
    pub fn new(score: f64) -> Self {
        Self {
            score,
            aux: HashMap::new(),
        }
    }

    /// Attaches an auxiliary value.
    #[must_use]
    pub fn with_aux(mut self, key: impl Into<String>, value: impl Into<AuxValue>) -> Self {
        self.aux.insert(key.into(), value.into());
        self
    }
}

impl From<f64> for Evaluation {
    fn from(score: f64) -> Self {
        Self::new(score)
    }
}

/// An auxiliary value attached to an evaluation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuxValue {
    /// A floating-point value.
    Float(f64),
    /// An integer value.
    Int(i64),
    /// A boolean flag.
    Bool(bool),
    /// A free-form label.
    Text(String),
}

impl From<f64> for AuxValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for AuxValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for AuxValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for AuxValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for AuxValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AuxValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl core::fmt::Display for AuxValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Defines a scoring function over named parameter values.
///
/// The blanket impl covers plain closures
/// (`Fn(&Pars) -> Result<T, E>` with `T: Into<Evaluation>`), so both
/// `Ok(score)` and `Ok(Evaluation::new(score).with_aux(...))` bodies work
/// unchanged. Implement the trait on a struct when the scoring function
/// carries state of its own (open connections, datasets, caches).
///
/// # Thread safety
///
/// [`run_async`](crate::optimizer::BayesOpt::run_async) additionally
/// requires `Send + Sync + 'static`; the sync
/// [`run`](crate::optimizer::BayesOpt::run) has no such bound.
pub trait ScoreFn {
    /// The error type returned by [`score`](Self::score).
    type Error: core::fmt::Display;

    /// Evaluates the parameters and returns a score to maximize.
    ///
    /// # Errors
    ///
    /// Any error whose type implements `Display`. Errors are recorded as
    /// warnings on the affected evaluation slot; with
    /// [`retry_failed_scores`](crate::optimizer::BayesOptBuilder::retry_failed_scores)
    /// the same parameters are evaluated once more first.
    fn score(&self, pars: &Pars) -> Result<Evaluation, Self::Error>;
}

impl<F, T, E> ScoreFn for F
where
    F: Fn(&Pars) -> Result<T, E>,
    T: Into<Evaluation>,
    E: core::fmt::Display,
{
    type Error = E;

    fn score(&self, pars: &Pars) -> Result<Evaluation, E> {
        self(pars).map(Into::into)
    }
}
