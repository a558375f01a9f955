#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a parameter is declared with `low >= high`.
    #[error("invalid bounds for '{name}': low ({low}) must be less than high ({high})")]
    InvalidBounds {
        /// The name of the offending parameter.
        name: String,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when two parameters share the same name.
    #[error("duplicate parameter name '{0}'")]
    DuplicateParameter(String),

    /// Returned when a domain is built without any parameters.
    #[error("domain must contain at least one parameter")]
    EmptyDomain,

    /// Returned when a parameter mapping is missing a name the domain
    /// declares, or carries a name it does not.
    #[error("unknown or missing parameter '{0}'")]
    UnknownParameter(String),

    /// Returned when the scoring function produces a non-finite score or a
    /// point outside the domain is offered as a seed observation.
    #[error("invalid observation at iteration {iteration}: {reason}")]
    InvalidObservation {
        /// The optimization iteration the observation belongs to (0 for the
        /// initial design).
        iteration: usize,
        /// Why the observation was rejected.
        reason: String,
    },

    /// Returned when the covariance matrix stays ill-conditioned after the
    /// jitter ladder and the point-perturbation retries are exhausted.
    #[error(
        "surrogate fit failed at iteration {iteration}: covariance not positive definite after \
         jitter up to {max_jitter:e} and {retries} perturbation retries"
    )]
    SurrogateFit {
        /// The iteration whose refit failed.
        iteration: usize,
        /// The largest diagonal jitter that was attempted.
        max_jitter: f64,
        /// How many perturbation retries were spent.
        retries: usize,
    },

    /// Returned when the acquisition search cannot produce any finite-utility
    /// candidate. The optimization loop recovers by sampling at random.
    #[error("acquisition optimization found no feasible candidate: {0}")]
    AcquisitionOptimization(String),

    /// Propagated from the external scoring function after retries are spent.
    /// Recorded as a warning on the affected evaluation slot; never aborts
    /// the run on its own.
    #[error("scoring function failed at iteration {iteration}: {message}")]
    ScoringFunction {
        /// The iteration the failed evaluation belongs to.
        iteration: usize,
        /// The error reported by the scoring function.
        message: String,
    },

    /// Returned when results are requested before any observation completed.
    #[error("no completed observations available")]
    NoObservations,

    /// Returned when an async evaluation task panics or is cancelled.
    #[cfg(feature = "async")]
    #[error("evaluation task error: {0}")]
    TaskError(String),
}

pub type Result<T> = core::result::Result<T, Error>;
