use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::error::{Error, Result};
use crate::objective::ScoreFn;
use crate::types::{Phase, StopReason};

use super::BayesOpt;
use super::run::{EvalTask, ScoreOutcome, evaluate_with_retry};

impl BayesOpt {
    /// Runs the optimization with concurrent batch evaluation.
    ///
    /// Like [`run`](Self::run), but every evaluation of a batch is wrapped
    /// in [`spawn_blocking`](tokio::task::spawn_blocking), so slow CPU-bound
    /// scoring functions overlap and the async runtime stays responsive.
    /// In-flight evaluations are capped by
    /// [`concurrency`](super::BayesOptBuilder::concurrency); when unset,
    /// each dispatch (the initial design included) runs its whole batch at
    /// once. Results are absorbed in submission order regardless of
    /// completion order, so a seeded run is reproducible at any concurrency.
    ///
    /// # Errors
    ///
    /// Same conditions as [`run`](Self::run), plus [`Error::TaskError`] when
    /// a spawned evaluation panics or is cancelled.
    ///
    /// # Examples
    ///
    /// ```
    /// use bayesopt::prelude::*;
    ///
    /// # #[cfg(feature = "async")]
    /// # async fn example() -> bayesopt::Result<()> {
    /// let domain = Domain::builder().continuous("x", 0.0, 10.0).build()?;
    /// let mut opt = BayesOpt::builder(domain)
    ///     .init_points(4)
    ///     .iterations(6)
    ///     .batch_size(3)
    ///     .seed(42)
    ///     .build()?;
    ///
    /// opt.run_async(|pars: &Pars| {
    ///     let x = pars["x"].as_f64();
    ///     Ok::<_, Error>(-(x - 7.0).powi(2))
    /// })
    /// .await?;
    ///
    /// assert!(opt.best_pars().is_some());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run_async<F>(&mut self, score_fn: F) -> Result<StopReason>
    where
        F: ScoreFn + Send + Sync + 'static,
    {
        let iterations = self.iterations;
        self.run_more_async(score_fn, iterations).await
    }

    /// Continues the run for `iterations` additional passes with concurrent
    /// batch evaluation. The async counterpart of
    /// [`run_more`](Self::run_more).
    ///
    /// # Errors
    ///
    /// Same conditions as [`run_async`](Self::run_async).
    pub async fn run_more_async<F>(
        &mut self,
        score_fn: F,
        iterations: usize,
    ) -> Result<StopReason>
    where
        F: ScoreFn + Send + Sync + 'static,
    {
        let started = Instant::now();
        self.stall_count = 0;
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "run_async",
            iterations,
            batch = self.batch_size,
            dims = self.domain.len()
        )
        .entered();

        let score_fn = Arc::new(score_fn);

        if self.phase == Phase::Init {
            let tasks = self.initial_design_tasks();
            self.phase = Phase::Evaluating;
            let outcomes = self.dispatch(&score_fn, &tasks).await?;
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

        let mut completed = 0;
        loop {
            if let Some(reason) = self.stop_rule(started) {
                return self.finish(reason);
            }
            if completed == iterations {
                return self.finish(StopReason::IterationsExhausted);
            }
            self.iteration += 1;

            self.phase = Phase::Fitting;
            let gp = self.fit_surrogate()?;

            self.phase = Phase::Proposing;
            let tasks = self.proposal_tasks(&gp);

            self.phase = Phase::Evaluating;
            let best_before = self.history.best_score();
            let outcomes = self.dispatch(&score_fn, &tasks).await?;
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
            completed += 1;
        }
    }

    /// Spawns one batch and collects the outcomes in submission order.
    ///
    /// The semaphore is sized per dispatch: the configured concurrency, or
    /// the batch itself when none is set. A panicked or cancelled task
    /// fails the run.
    async fn dispatch<F>(
        &mut self,
        score_fn: &Arc<F>,
        tasks: &[EvalTask],
    ) -> Result<Vec<ScoreOutcome>>
    where
        F: ScoreFn + Send + Sync + 'static,
    {
        let limit = self.concurrency.unwrap_or(tasks.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        match evaluate_batch(score_fn, &semaphore, tasks, self.retry_failed_scores).await {
            Ok(outcomes) => Ok(outcomes),
            Err(e) => {
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }
}

/// Dispatches every task of a batch through `spawn_blocking`, gated by the
/// semaphore, and awaits the handles in submission order.
async fn evaluate_batch<F>(
    score_fn: &Arc<F>,
    semaphore: &Arc<Semaphore>,
    tasks: &[EvalTask],
    retry: bool,
) -> Result<Vec<ScoreOutcome>>
where
    F: ScoreFn + Send + Sync + 'static,
{
    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        let permit = Arc::clone(semaphore)
            .acquire_owned()
            .await
            .map_err(|e| Error::TaskError(e.to_string()))?;
        let f = Arc::clone(score_fn);
        let pars = task.pars.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let outcome = evaluate_with_retry(f.as_ref(), &pars, retry);
            drop(permit);
            outcome
        }));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(
            handle
                .await
                .map_err(|e| Error::TaskError(e.to_string()))?,
        );
    }
    Ok(outcomes)
}
