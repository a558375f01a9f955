use std::time::Instant;

use crate::error::{Error, Result};
use crate::history::{Observation, Origin, Warning, unit_distance};
use crate::objective::{Evaluation, ScoreFn};
use crate::param::Pars;
use crate::proposal;
use crate::rng_util;
use crate::surrogate::GaussianProcess;
use crate::types::{InitialDesign, Phase, StopReason};

use super::{BayesOpt, PERTURB_ATTEMPTS, PERTURB_SIGMA};

/// One pending evaluation: the point in both coordinate systems plus the
/// metadata its observation row will carry.
pub(super) struct EvalTask {
    pub(super) pars: Pars,
    pub(super) unit: Vec<f64>,
    pub(super) origin: Origin,
    pub(super) utility: Option<f64>,
}

/// What came back from one evaluation slot.
pub(super) struct ScoreOutcome {
    /// The first failure message when the slot was retried.
    pub(super) retried: Option<String>,
    /// The final result: a finite evaluation, or why the slot is excluded.
    pub(super) result: core::result::Result<Evaluation, String>,
}

/// Runs the scoring function once, folding non-finite scores into the
/// error channel.
fn attempt<F: ScoreFn>(score_fn: &F, pars: &Pars) -> core::result::Result<Evaluation, String> {
    match score_fn.score(pars) {
        Ok(evaluation) if evaluation.score.is_finite() => Ok(evaluation),
        Ok(evaluation) => Err(format!("non-finite score {}", evaluation.score)),
        Err(e) => Err(e.to_string()),
    }
}

/// Evaluates one slot, retrying once when `retry` is set.
pub(super) fn evaluate_with_retry<F: ScoreFn>(
    score_fn: &F,
    pars: &Pars,
    retry: bool,
) -> ScoreOutcome {
    match attempt(score_fn, pars) {
        Ok(evaluation) => ScoreOutcome {
            retried: None,
            result: Ok(evaluation),
        },
        Err(first) if retry => ScoreOutcome {
            retried: Some(first),
            result: attempt(score_fn, pars),
        },
        Err(first) => ScoreOutcome {
            retried: None,
            result: Err(first),
        },
    }
}

/// Returns `true` when `unit` lies within `tolerance` of a recorded
/// observation or a point already queued for this batch.
fn is_duplicate(
    history: &crate::history::History,
    pending: &[EvalTask],
    unit: &[f64],
    tolerance: f64,
) -> bool {
    history.is_near_duplicate(unit, tolerance)
        || pending
            .iter()
            .any(|t| unit_distance(&t.unit, unit) <= tolerance)
}

impl BayesOpt {
    /// Runs the optimization for the configured number of iterations.
    ///
    /// Evaluates the initial design first (on the first call only), then
    /// performs fit / propose / evaluate passes until the iteration budget
    /// is spent or a stop rule fires.
    ///
    /// # Errors
    ///
    /// - [`Error::ScoringFunction`] / [`Error::NoObservations`] when the
    ///   entire initial design fails and there is nothing to fit on.
    /// - [`Error::SurrogateFit`] when the covariance matrix stays
    ///   ill-conditioned after all perturbation retries.
    pub fn run<F: ScoreFn>(&mut self, score_fn: F) -> Result<StopReason> {
        let iterations = self.iterations;
        self.run_more(score_fn, iterations)
    }

    /// Continues the run for `iterations` additional passes.
    ///
    /// A finished run picks up on the accumulated history; the initial
    /// design is only evaluated if it has not been yet. Stop rules are
    /// re-armed: the time budget restarts from this call and the patience
    /// counter starts back at zero, so a run stopped as
    /// [`Stalled`](StopReason::Stalled) continues when asked.
    ///
    /// # Errors
    ///
    /// Same conditions as [`run`](Self::run).
    #[allow(clippy::needless_pass_by_value)]
    pub fn run_more<F: ScoreFn>(&mut self, score_fn: F, iterations: usize) -> Result<StopReason> {
        let started = Instant::now();
        self.stall_count = 0;
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("run", iterations, dims = self.domain.len()).entered();

        if self.phase == Phase::Init {
            let tasks = self.initial_design_tasks();
            self.phase = Phase::Evaluating;
            let outcomes: Vec<ScoreOutcome> = tasks
                .iter()
                .map(|task| evaluate_with_retry(&score_fn, &task.pars, self.retry_failed_scores))
                .collect();
            let failure = outcomes
                .iter()
                .find_map(|o| o.result.as_ref().err().cloned());
            self.absorb_batch(tasks, outcomes);
            if self.history.is_empty() {
                self.phase = Phase::Failed;
                return Err(failure.map_or(Error::NoObservations, |message| {
                    Error::ScoringFunction {
                        iteration: 0,
                        message,
                    }
                }));
            }
            trace_info!(
                evaluations = self.history.len(),
                best = self.history.best_score(),
                "initial design evaluated"
            );
        } else if self.history.is_empty() {
            return Err(Error::NoObservations);
        }

        self.drive(&score_fn, iterations, started)
    }

    /// The pass loop. Stop rules outrank iteration exhaustion, so a target
    /// hit by the final batch is reported as such.
    fn drive<F: ScoreFn>(
        &mut self,
        score_fn: &F,
        iterations: usize,
        started: Instant,
    ) -> Result<StopReason> {
        let mut completed = 0;
        loop {
            if let Some(reason) = self.stop_rule(started) {
                return self.finish(reason);
            }
            if completed == iterations {
                return self.finish(StopReason::IterationsExhausted);
            }
            self.iteration += 1;
            self.one_pass(score_fn)?;
            completed += 1;
        }
    }

    /// One fit / propose / evaluate pass.
    fn one_pass<F: ScoreFn>(&mut self, score_fn: &F) -> Result<()> {
        self.phase = Phase::Fitting;
        let gp = self.fit_surrogate()?;
        trace_debug!(
            iteration = self.iteration,
            observations = gp.train_len(),
            log_marginal = gp.log_marginal_likelihood(),
            "surrogate fitted"
        );

        self.phase = Phase::Proposing;
        let tasks = self.proposal_tasks(&gp);

        self.phase = Phase::Evaluating;
        let best_before = self.history.best_score();
        let outcomes: Vec<ScoreOutcome> = tasks
            .iter()
            .map(|task| evaluate_with_retry(score_fn, &task.pars, self.retry_failed_scores))
            .collect();
        self.absorb_batch(tasks, outcomes);

        let improved = match (best_before, self.history.best_score()) {
            (Some(before), Some(after)) => after > before,
            (None, Some(_)) => true,
            _ => false,
        };
        if improved {
            self.stall_count = 0;
        } else {
            self.stall_count += 1;
        }

        trace_info!(
            iteration = self.iteration,
            evaluations = self.history.len(),
            best = self.history.best_score(),
            "pass completed"
        );
        Ok(())
    }

    /// Folds a batch of outcomes into the history, in submission order.
    ///
    /// Failed slots are excluded and recorded as warnings; the rest of the
    /// batch is unaffected.
    pub(super) fn absorb_batch(&mut self, tasks: Vec<EvalTask>, outcomes: Vec<ScoreOutcome>) {
        for (task, outcome) in tasks.into_iter().zip(outcomes) {
            if let Some(first) = outcome.retried {
                self.warn(format!("scoring failed ({first}); retrying once"));
            }
            match outcome.result {
                Ok(evaluation) => self.history.push(Observation {
                    iteration: self.iteration,
                    origin: task.origin,
                    pars: task.pars,
                    score: evaluation.score,
                    aux: evaluation.aux,
                    utility: task.utility,
                    unit: task.unit,
                }),
                Err(message) => self.warn(format!("observation excluded: {message}")),
            }
        }
    }

    /// Records a recoverable incident against the current iteration.
    pub(super) fn warn(&mut self, message: String) {
        trace_debug!(iteration = self.iteration, message = %message, "warning");
        self.warnings.push(Warning {
            iteration: self.iteration,
            message,
        });
    }

    /// Fits the surrogate on the full history, perturbing the closest pair
    /// of training inputs and retrying when the covariance cannot be
    /// factorized.
    ///
    /// The perturbation happens in the fit's own copy of the inputs; the
    /// history is never rewritten.
    pub(super) fn fit_surrogate(&mut self) -> Result<GaussianProcess> {
        let (mut x, y) = self.history.training_data();
        let mut retries = 0;
        loop {
            match GaussianProcess::fit(&x, &y, &self.surrogate) {
                Ok(gp) => return Ok(gp),
                Err(failure) => {
                    if retries >= self.fit_retries {
                        self.phase = Phase::Failed;
                        return Err(Error::SurrogateFit {
                            iteration: self.iteration,
                            max_jitter: failure.max_jitter,
                            retries,
                        });
                    }
                    retries += 1;
                    self.perturb_closest_pair(&mut x);
                    self.warn(format!("{failure}; perturbing closest pair (retry {retries})"));
                }
            }
        }
    }

    /// Nudges the later row of the closest pair of training inputs.
    ///
    /// The nudge is not snapped to the integer grid: it has to change the
    /// covariance matrix, and snapping would round it straight back onto
    /// the duplicate.
    fn perturb_closest_pair(&mut self, x: &mut [Vec<f64>]) {
        let mut closest: Option<(usize, f64)> = None;
        for i in 0..x.len() {
            for j in (i + 1)..x.len() {
                let d = unit_distance(&x[i], &x[j]);
                if closest.is_none_or(|(_, best)| d < best) {
                    closest = Some((j, d));
                }
            }
        }
        if let Some((j, _)) = closest {
            for u in &mut x[j] {
                *u = (*u + rng_util::gaussian(&mut self.rng, PERTURB_SIGMA)).clamp(0.0, 1.0);
            }
        }
    }

    /// Builds the batch for one pass by maximizing the acquisition, topping
    /// up with random draws when the search collapses or fails.
    pub(super) fn proposal_tasks(&mut self, gp: &GaussianProcess) -> Vec<EvalTask> {
        let incumbent = self.history.best().map(|o| o.unit.clone());
        let candidates = match proposal::propose(
            gp,
            self.acquisition,
            &self.domain,
            self.batch_size,
            incumbent.as_deref(),
            &self.search,
            &mut self.rng,
        ) {
            Ok(candidates) => candidates,
            Err(e) => {
                self.warn(format!("{e}; falling back to random sampling"));
                Vec::new()
            }
        };

        let mut tasks: Vec<EvalTask> = Vec::with_capacity(self.batch_size);
        for candidate in candidates {
            let (unit, moved) = self.ensure_distinct(candidate.unit, &tasks);
            let (pars, utility) = if moved {
                let (mean, variance) = gp.predict(&unit);
                let utility = self.acquisition.evaluate(mean, variance, gp.best_score());
                (self.domain.denormalize(&unit), utility)
            } else {
                (candidate.pars, candidate.utility)
            };
            tasks.push(EvalTask {
                pars,
                unit,
                origin: Origin::Proposed,
                utility: Some(utility),
            });
        }

        while tasks.len() < self.batch_size {
            let mut unit = rng_util::unit_point(&mut self.rng, self.domain.len());
            self.domain.snap_to_grid(&mut unit);
            let (unit, _) = self.ensure_distinct(unit, &tasks);
            let (mean, variance) = gp.predict(&unit);
            let utility = self.acquisition.evaluate(mean, variance, gp.best_score());
            tasks.push(EvalTask {
                pars: self.domain.denormalize(&unit),
                unit,
                origin: Origin::Proposed,
                utility: Some(utility),
            });
        }
        tasks
    }

    /// Moves a point off any near-duplicate before it is evaluated.
    ///
    /// Tries a handful of Gaussian nudges first; if the neighborhood is
    /// saturated, substitutes one random draw and accepts it either way.
    /// Returns the final position and whether it differs from the input.
    fn ensure_distinct(&mut self, unit: Vec<f64>, pending: &[EvalTask]) -> (Vec<f64>, bool) {
        let tolerance = self.search.dup_tolerance;
        if !is_duplicate(&self.history, pending, &unit, tolerance) {
            return (unit, false);
        }

        self.warn(format!(
            "point within {tolerance:e} of an evaluated point; perturbing"
        ));
        for _ in 0..PERTURB_ATTEMPTS {
            let mut nudged: Vec<f64> = unit
                .iter()
                .map(|&u| (u + rng_util::gaussian(&mut self.rng, PERTURB_SIGMA)).clamp(0.0, 1.0))
                .collect();
            self.domain.snap_to_grid(&mut nudged);
            if !is_duplicate(&self.history, pending, &nudged, tolerance) {
                return (nudged, true);
            }
        }

        let mut random = rng_util::unit_point(&mut self.rng, self.domain.len());
        self.domain.snap_to_grid(&mut random);
        if is_duplicate(&self.history, pending, &random, tolerance) {
            self.warn("random replacement still duplicates an evaluated point".to_string());
        }
        (random, true)
    }

    /// Assembles the initial design: user seed points first, topped up to
    /// `init_points` with space-filling draws.
    pub(super) fn initial_design_tasks(&mut self) -> Vec<EvalTask> {
        let mut tasks: Vec<EvalTask> = Vec::new();
        for pars in core::mem::take(&mut self.seed_points) {
            match self.domain.normalize(&pars) {
                Ok(unit) => {
                    let (unit, moved) = self.ensure_distinct(unit, &tasks);
                    let pars = if moved {
                        self.domain.denormalize(&unit)
                    } else {
                        pars
                    };
                    tasks.push(EvalTask {
                        pars,
                        unit,
                        origin: Origin::InitialDesign,
                        utility: None,
                    });
                }
                Err(e) => self.warn(format!("seed point dropped: {e}")),
            }
        }

        let needed = self.init_points.saturating_sub(tasks.len());
        let draws = match self.initial_design {
            InitialDesign::LatinHypercube => {
                self.domain.sample_latin_hypercube(&mut self.rng, needed)
            }
            InitialDesign::Uniform => self.domain.sample_uniform(&mut self.rng, needed),
            #[cfg(feature = "sobol")]
            InitialDesign::Sobol => self.domain.sample_sobol(self.sobol_seed, needed),
        };
        for pars in draws {
            let Ok(unit) = self.domain.normalize(&pars) else {
                continue;
            };
            let (unit, moved) = self.ensure_distinct(unit, &tasks);
            let pars = if moved {
                self.domain.denormalize(&unit)
            } else {
                pars
            };
            tasks.push(EvalTask {
                pars,
                unit,
                origin: Origin::InitialDesign,
                utility: None,
            });
        }
        tasks
    }

    /// Checks the configured stop rules, in priority order.
    pub(super) fn stop_rule(&self, started: Instant) -> Option<StopReason> {
        if let Some(target) = self.target_score
            && let Some(best) = self.history.best_score()
            && best >= target
        {
            return Some(StopReason::TargetReached);
        }
        if let Some(patience) = self.patience
            && self.stall_count >= patience
        {
            return Some(StopReason::Stalled {
                iterations: self.stall_count,
            });
        }
        if let Some(budget) = self.time_budget
            && started.elapsed() >= budget
        {
            return Some(StopReason::TimeBudgetExceeded);
        }
        None
    }

    /// Marks the run done and reports why it stopped.
    pub(super) fn finish(&mut self, reason: StopReason) -> Result<StopReason> {
        self.phase = Phase::Done;
        trace_info!(
            evaluations = self.history.len(),
            best = self.history.best_score(),
            reason = ?reason,
            "run finished"
        );
        Ok(reason)
    }
}
