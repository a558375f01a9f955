//! Append-only record of completed evaluations.
//!
//! Every score that enters the engine becomes an [`Observation`] here, in
//! submission order. Rows are never rewritten or removed; the surrogate is
//! refitted from [`training_data`](History::training_data) on every pass, so
//! the history is the single source of truth for a run.
//!
//! The best observation is tracked incrementally on push. Only strict
//! improvement moves it, so ties resolve to the earliest row.

use std::collections::HashMap;

use crate::objective::AuxValue;
use crate::param::Pars;

/// How an observation entered the history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Origin {
    /// Part of the initial space-filling design (or a user seed point).
    InitialDesign,
    /// Proposed by maximizing the acquisition function.
    Proposed,
}

/// One completed evaluation.
///
/// `score` is always finite; non-finite results are excluded before they
/// reach the history and surface as [`Warning`]s instead.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observation {
    /// Optimization pass the evaluation belongs to (0 for the initial
    /// design).
    pub iteration: usize,
    /// Whether the point came from the initial design or a proposal.
    pub origin: Origin,
    /// The evaluated parameter values.
    pub pars: Pars,
    /// The finite score the black box returned.
    pub score: f64,
    /// Auxiliary values the scoring function attached, preserved verbatim.
    pub aux: HashMap<String, AuxValue>,
    /// Acquisition utility at proposal time; `None` for design points.
    pub utility: Option<f64>,
    /// Position in the unit cube, canonical for duplicate detection and
    /// surrogate training.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) unit: Vec<f64>,
}

/// A recoverable incident the run worked around.
///
/// Warnings never abort a run; they record excluded observations, retries,
/// and fallbacks so callers can audit what happened.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Warning {
    /// The iteration the incident occurred in.
    pub iteration: usize,
    /// Human-readable description.
    pub message: String,
}

impl core::fmt::Display for Warning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "iteration {}: {}", self.iteration, self.message)
    }
}

/// Euclidean distance between two unit-cube points.
pub(crate) fn unit_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// The append-only evaluation log of a run.
#[derive(Clone, Debug, Default)]
pub struct History {
    observations: Vec<Observation>,
    best: Option<usize>,
}

impl History {
    /// Appends an observation and updates the best index on strict
    /// improvement.
    pub(crate) fn push(&mut self, observation: Observation) {
        let improved = self
            .best
            .is_none_or(|i| observation.score > self.observations[i].score);
        self.observations.push(observation);
        if improved {
            self.best = Some(self.observations.len() - 1);
        }
    }

    /// All observations in submission order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns `true` before any evaluation completed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The best observation so far (highest score, earliest on ties).
    #[must_use]
    pub fn best(&self) -> Option<&Observation> {
        self.best.map(|i| &self.observations[i])
    }

    /// The best score so far.
    #[must_use]
    pub fn best_score(&self) -> Option<f64> {
        self.best().map(|o| o.score)
    }

    /// Unit-space inputs and scores for surrogate fitting.
    pub(crate) fn training_data(&self) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x = self.observations.iter().map(|o| o.unit.clone()).collect();
        let y = self.observations.iter().map(|o| o.score).collect();
        (x, y)
    }

    /// Distance from `unit` to the nearest recorded observation.
    pub(crate) fn nearest_distance(&self, unit: &[f64]) -> Option<f64> {
        self.observations
            .iter()
            .map(|o| unit_distance(&o.unit, unit))
            .min_by(f64::total_cmp)
    }

    /// Returns `true` when `unit` lies within `tolerance` of a recorded
    /// observation.
    pub(crate) fn is_near_duplicate(&self, unit: &[f64], tolerance: f64) -> bool {
        self.nearest_distance(unit)
            .is_some_and(|d| d <= tolerance)
    }
}
