//! Acquisition maximization: turning a fitted surrogate into the next
//! points to evaluate.
//!
//! The search runs entirely in the unit cube. A uniform presample pool is
//! ranked by acquisition utility; the best pool points (plus the incumbent
//! best observation) seed a compass search with a halving step, and integer
//! dimensions are snapped to their grid after every move so utilities are
//! only ever computed at realizable points.
//!
//! Batches are decorrelated with the kriging-believer scheme: after each
//! selected candidate the surrogate is refitted (hyperparameters frozen) on
//! the data augmented with the candidate's own predicted mean, which
//! collapses the posterior variance there and pushes the next maximization
//! elsewhere.

use crate::acquisition::{Acquisition, Candidate};
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::history::unit_distance;
use crate::rng_util;
use crate::surrogate::GaussianProcess;

/// Knobs for the acquisition search.
///
/// The defaults suit a handful of dimensions; for harder acquisition
/// landscapes raise `pool_size` and `starts`.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchConfig {
    /// Uniform presample pool ranked by utility.
    pub pool_size: usize,
    /// Pool points promoted to compass-search seeds.
    pub starts: usize,
    /// Initial compass step in unit-cube units.
    pub initial_step: f64,
    /// The step halves until it drops below this.
    pub min_step: f64,
    /// Upper bound on compass sweeps per seed.
    pub max_sweeps: usize,
    /// Minimum Euclidean distance between returned candidates (and to the
    /// observations the optimization loop checks against).
    pub dup_tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pool_size: 1000,
            starts: 10,
            initial_step: 0.1,
            min_step: 1e-3,
            max_sweeps: 64,
            dup_tolerance: 1e-6,
        }
    }
}

/// A point under evaluation by the search, before parameter names are
/// attached.
#[derive(Clone, Debug)]
struct Local {
    unit: Vec<f64>,
    utility: f64,
    mean: f64,
    variance: f64,
}

/// Proposes up to `batch` candidates by maximizing the acquisition.
///
/// Candidates come back sorted by utility (ties broken by higher posterior
/// mean) and pairwise at least `dup_tolerance` apart. When the whole
/// landscape collapses onto fewer distinct optima than requested, fewer
/// candidates are returned rather than duplicates; the optimization loop
/// tops the batch up with random draws.
///
/// `incumbent` is the unit position of the best observation so far; it is
/// always included as a search seed so the neighborhood of the current
/// optimum is refined on every pass.
///
/// # Errors
///
/// Returns [`Error::AcquisitionOptimization`] when the pool is empty, no
/// candidate has finite utility, or a believer refit cannot factorize. The
/// caller recovers by sampling at random.
pub fn propose(
    gp: &GaussianProcess,
    acquisition: Acquisition,
    domain: &Domain,
    batch: usize,
    incumbent: Option<&[f64]>,
    config: &SearchConfig,
    rng: &mut fastrand::Rng,
) -> Result<Vec<Candidate>> {
    if batch == 0 {
        return Ok(Vec::new());
    }

    let mut picked: Vec<Local> = Vec::with_capacity(batch);
    let mut believer: Option<GaussianProcess> = None;
    let mut x_aug = gp.training_inputs().to_vec();
    let mut y_aug = gp.training_scores().to_vec();

    while picked.len() < batch {
        let model = believer.as_ref().unwrap_or(gp);
        let optima = local_optima(model, acquisition, domain, incumbent, config, rng)?;

        // first optimum far enough from everything already picked
        let Some(next) = optima.into_iter().find(|c| {
            picked
                .iter()
                .all(|p| unit_distance(&p.unit, &c.unit) > config.dup_tolerance)
        }) else {
            break;
        };

        if picked.len() + 1 < batch {
            x_aug.push(next.unit.clone());
            y_aug.push(next.mean);
            believer = Some(
                model
                    .refit_frozen(&x_aug, &y_aug)
                    .map_err(|e| Error::AcquisitionOptimization(e.to_string()))?,
            );
        }
        picked.push(next);
    }

    Ok(picked
        .into_iter()
        .map(|l| Candidate {
            pars: domain.denormalize(&l.unit),
            unit: l.unit,
            utility: l.utility,
            mean: l.mean,
            variance: l.variance,
        })
        .collect())
}

/// Utility, mean and variance at a unit point under one model.
fn assess(
    gp: &GaussianProcess,
    acquisition: Acquisition,
    unit: Vec<f64>,
) -> Local {
    let (mean, variance) = gp.predict(&unit);
    Local {
        utility: acquisition.evaluate(mean, variance, gp.best_score()),
        unit,
        mean,
        variance,
    }
}

/// Runs the full single-point search: pool, seeds, compass refinement.
///
/// Returns local optima sorted by `(utility, mean)` descending and deduped
/// within `dup_tolerance`. Non-finite utilities are dropped on the way in.
fn local_optima(
    gp: &GaussianProcess,
    acquisition: Acquisition,
    domain: &Domain,
    incumbent: Option<&[f64]>,
    config: &SearchConfig,
    rng: &mut fastrand::Rng,
) -> Result<Vec<Local>> {
    let d = domain.len();

    let mut pool: Vec<Local> = Vec::with_capacity(config.pool_size + 1);
    for _ in 0..config.pool_size {
        let mut unit = rng_util::unit_point(rng, d);
        domain.snap_to_grid(&mut unit);
        let local = assess(gp, acquisition, unit);
        if local.utility.is_finite() {
            pool.push(local);
        }
    }
    if let Some(unit) = incumbent {
        let local = assess(gp, acquisition, unit.to_vec());
        if local.utility.is_finite() {
            pool.push(local);
        }
    }
    if pool.is_empty() {
        return Err(Error::AcquisitionOptimization(
            "no candidate with finite utility in the presample pool".to_string(),
        ));
    }

    pool.sort_by(|a, b| {
        b.utility
            .total_cmp(&a.utility)
            .then_with(|| b.mean.total_cmp(&a.mean))
    });
    pool.truncate(config.starts.max(1));

    let mut optima: Vec<Local> = pool
        .into_iter()
        .map(|seed| compass_ascend(gp, acquisition, domain, seed, config))
        .filter(|l| l.utility.is_finite())
        .collect();

    optima.sort_by(|a, b| {
        b.utility
            .total_cmp(&a.utility)
            .then_with(|| b.mean.total_cmp(&a.mean))
    });

    // greedy dedup, keeping the higher-ranked point of any close pair
    let mut distinct: Vec<Local> = Vec::with_capacity(optima.len());
    for local in optima {
        if distinct
            .iter()
            .all(|kept| unit_distance(&kept.unit, &local.unit) > config.dup_tolerance)
        {
            distinct.push(local);
        }
    }

    if distinct.is_empty() {
        return Err(Error::AcquisitionOptimization(
            "search produced no finite local optimum".to_string(),
        ));
    }
    Ok(distinct)
}

/// Pattern search with a halving step from one seed.
///
/// Each sweep probes `+step` and `-step` along every dimension, snapping
/// integer dimensions back to their grid; the first improving move is taken.
/// A sweep without improvement halves the step.
#[allow(clippy::float_cmp)]
fn compass_ascend(
    gp: &GaussianProcess,
    acquisition: Acquisition,
    domain: &Domain,
    seed: Local,
    config: &SearchConfig,
) -> Local {
    let mut best = seed;
    let mut step = config.initial_step;

    for _ in 0..config.max_sweeps {
        let mut improved = false;
        for dim in 0..best.unit.len() {
            for dir in [1.0, -1.0] {
                let mut unit = best.unit.clone();
                unit[dim] = (unit[dim] + dir * step).clamp(0.0, 1.0);
                domain.snap_to_grid(&mut unit);
                if unit == best.unit {
                    continue;
                }
                let probe = assess(gp, acquisition, unit);
                if probe.utility > best.utility
                    || (probe.utility == best.utility && probe.mean > best.mean)
                {
                    best = probe;
                    improved = true;
                    break;
                }
            }
            if improved {
                break;
            }
        }
        if !improved {
            step /= 2.0;
            if step < config.min_step {
                break;
            }
        }
    }

    best
}
