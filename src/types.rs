//! Core shared types for the optimization loop.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The phase the optimization loop is currently in.
///
/// Transitions: `Init → Evaluating → Fitting → Proposing → Evaluating → …`
/// until the loop ends in `Done` (stop rule or iteration budget) or `Failed`
/// (retry ceilings exhausted).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Phase {
    /// No evaluations have been dispatched yet.
    Init,
    /// A batch of scoring-function evaluations is outstanding.
    Evaluating,
    /// The surrogate is being refit on the full history.
    Fitting,
    /// The acquisition search is selecting the next candidates.
    Proposing,
    /// The run finished normally.
    Done,
    /// The run aborted after exhausting a retry ceiling.
    Failed,
}

/// Why a finished run stopped.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopReason {
    /// All configured iterations ran.
    IterationsExhausted,
    /// The best score reached the configured target.
    TargetReached,
    /// The best score did not improve for the configured number of
    /// consecutive iterations.
    Stalled {
        /// How many improvement-free iterations triggered the stop.
        iterations: usize,
    },
    /// The wall-clock budget was spent.
    TimeBudgetExceeded,
}

/// How the initial design points are drawn from the domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InitialDesign {
    /// Latin hypercube sampling: one point per stratum in every dimension.
    /// Spreads a small budget more evenly than uniform draws.
    #[default]
    LatinHypercube,
    /// Plain uniform random draws.
    Uniform,
    /// Scrambled Sobol low-discrepancy sequence (Burley 2020).
    #[cfg(feature = "sobol")]
    Sobol,
}
