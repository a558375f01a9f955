//! Acquisition functions: scalar utilities that trade off exploitation
//! against exploration.
//!
//! An acquisition function sees only the surrogate's posterior summary at a
//! point (mean and variance) plus the incumbent best score; it never touches
//! the observation history. The proposal search maximizes the utility over
//! the unit cube.
//!
//! Three standard variants are provided:
//!
//! | Variant | Utility | Character |
//! |---------|---------|-----------|
//! | [`ExpectedImprovement`](Acquisition::ExpectedImprovement) | `E[max(score - best - xi, 0)]` | balanced default |
//! | [`UpperConfidenceBound`](Acquisition::UpperConfidenceBound) | `mean + kappa * std` | tunable optimism |
//! | [`ProbabilityOfImprovement`](Acquisition::ProbabilityOfImprovement) | `P(score > best + xi)` | conservative |
//!
//! The normal pdf/cdf use the Hart rational approximation (absolute error
//! below `1e-7`), which avoids pulling in a special-functions dependency.

use crate::param::Pars;

/// Default exploration margin for EI and POI.
pub const DEFAULT_XI: f64 = 0.01;
/// Default optimism factor for UCB (the two-sided 99% normal quantile).
pub const DEFAULT_KAPPA: f64 = 2.576;

/// Numerical floor below which the posterior is treated as certain.
const MIN_STD: f64 = 1e-12;

/// An acquisition function over posterior summaries.
///
/// All variants are pure: [`evaluate`](Self::evaluate) maps
/// `(mean, variance, best)` to a finite utility whenever its inputs are
/// finite. Larger is better.
///
/// # Examples
///
/// ```
/// use bayesopt::acquisition::Acquisition;
///
/// let ei = Acquisition::default();
/// // high variance far from the incumbent still carries utility
/// assert!(ei.evaluate(0.0, 4.0, 1.0) > 0.0);
///
/// let ucb = Acquisition::upper_confidence_bound(1.0);
/// assert!((ucb.evaluate(0.5, 4.0, 0.0) - 2.5).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Acquisition {
    /// Expected improvement over the incumbent by at least `xi`.
    ///
    /// Always `>= 0`, and exactly `0` when the posterior is certain
    /// (`variance == 0`) and the mean does not beat `best + xi`.
    ExpectedImprovement {
        /// Exploration margin subtracted from the improvement.
        xi: f64,
    },
    /// Optimistic bound `mean + kappa * std`.
    ///
    /// Monotone increasing in both the mean and the variance. The only
    /// variant whose utility can be negative.
    UpperConfidenceBound {
        /// Width of the confidence bound in posterior standard deviations.
        kappa: f64,
    },
    /// Probability that the score exceeds `best + xi`. Always in `[0, 1]`.
    ProbabilityOfImprovement {
        /// Improvement margin that counts as success.
        xi: f64,
    },
}

impl Default for Acquisition {
    /// Expected improvement with `xi = 0.01`.
    fn default() -> Self {
        Self::ExpectedImprovement { xi: DEFAULT_XI }
    }
}

impl Acquisition {
    /// Expected improvement with the default margin.
    #[must_use]
    pub fn expected_improvement() -> Self {
        Self::default()
    }

    /// Upper confidence bound with the given `kappa`
    /// (default [`DEFAULT_KAPPA`]).
    #[must_use]
    pub fn upper_confidence_bound(kappa: f64) -> Self {
        Self::UpperConfidenceBound { kappa }
    }

    /// Probability of improvement with the default margin.
    #[must_use]
    pub fn probability_of_improvement() -> Self {
        Self::ProbabilityOfImprovement { xi: DEFAULT_XI }
    }

    /// Evaluates the utility of a posterior summary against the incumbent.
    ///
    /// `variance` is clamped to `>= 0` before use, matching the surrogate's
    /// own clamping.
    #[must_use]
    pub fn evaluate(&self, mean: f64, variance: f64, best: f64) -> f64 {
        let std = variance.max(0.0).sqrt();
        match *self {
            Self::ExpectedImprovement { xi } => {
                let improvement = mean - best - xi;
                if std < MIN_STD {
                    return improvement.max(0.0);
                }
                let z = improvement / std;
                (improvement * norm_cdf(z) + std * norm_pdf(z)).max(0.0)
            }
            Self::UpperConfidenceBound { kappa } => kappa.mul_add(std, mean),
            Self::ProbabilityOfImprovement { xi } => {
                let improvement = mean - best - xi;
                if std < MIN_STD {
                    return if improvement > 0.0 { 1.0 } else { 0.0 };
                }
                norm_cdf(improvement / std)
            }
        }
    }
}

/// A proposed point with its acquisition value and posterior summary at
/// proposal time.
///
/// Produced by [`propose`](crate::proposal::propose); the utility is later
/// attached to the resulting observation for the score summary.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Candidate {
    /// Position in the unit cube.
    pub unit: Vec<f64>,
    /// The same position as named parameter values.
    pub pars: Pars,
    /// Acquisition utility at proposal time.
    pub utility: f64,
    /// Posterior mean at proposal time.
    pub mean: f64,
    /// Posterior variance at proposal time.
    pub variance: f64,
}

/// Standard normal PDF.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Hart rational approximation).
pub(crate) fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * abs_x);
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let t5 = t4 * t;

    let poly = 0.319_381_530 * t - 0.356_563_782 * t2 + 1.781_477_937 * t3 - 1.821_255_978 * t4
        + 1.330_274_429 * t5;
    let cdf = 1.0 - norm_pdf(abs_x) * poly;

    if x >= 0.0 { cdf } else { 1.0 - cdf }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdf_matches_known_quantiles() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((norm_cdf(1.96) - 0.975_002).abs() < 1e-5);
        assert!((norm_cdf(-1.96) - 0.024_998).abs() < 1e-5);
        assert!((norm_cdf(9.0) - 1.0).abs() < 1e-12);
        assert!(norm_cdf(-9.0).abs() < 1e-12);
    }

    #[test]
    fn cdf_is_symmetric() {
        for x in [0.1, 0.7, 1.3, 2.5, 4.0] {
            assert!((norm_cdf(x) + norm_cdf(-x) - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn ei_is_nonnegative() {
        let ei = Acquisition::expected_improvement();
        for (mean, var, best) in [
            (0.0, 1.0, 10.0),
            (-5.0, 0.01, 3.0),
            (2.0, 0.0, 2.0),
            (100.0, 4.0, -100.0),
        ] {
            assert!(ei.evaluate(mean, var, best) >= 0.0);
        }
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn ei_is_zero_when_certain_and_not_better() {
        let ei = Acquisition::ExpectedImprovement { xi: 0.01 };
        assert_eq!(ei.evaluate(1.0, 0.0, 1.0), 0.0);
        assert_eq!(ei.evaluate(0.5, 0.0, 1.0), 0.0);
        // certain and better: utility is the margin-adjusted improvement
        assert!((ei.evaluate(2.0, 0.0, 1.0) - 0.99).abs() < 1e-12);
    }

    #[test]
    fn ei_rewards_uncertainty_at_equal_mean() {
        let ei = Acquisition::expected_improvement();
        let narrow = ei.evaluate(0.0, 0.01, 1.0);
        let wide = ei.evaluate(0.0, 4.0, 1.0);
        assert!(wide > narrow);
    }

    #[test]
    fn ucb_is_monotone_in_mean_and_variance() {
        let ucb = Acquisition::upper_confidence_bound(DEFAULT_KAPPA);
        assert!(ucb.evaluate(1.0, 1.0, 0.0) > ucb.evaluate(0.5, 1.0, 0.0));
        assert!(ucb.evaluate(1.0, 2.0, 0.0) > ucb.evaluate(1.0, 1.0, 0.0));
        // best is irrelevant to UCB
        #[allow(clippy::float_cmp)]
        {
            assert_eq!(ucb.evaluate(1.0, 1.0, -3.0), ucb.evaluate(1.0, 1.0, 7.0));
        }
    }

    #[test]
    fn poi_stays_in_unit_interval() {
        let poi = Acquisition::probability_of_improvement();
        for (mean, var, best) in [
            (0.0, 1.0, 10.0),
            (10.0, 1.0, 0.0),
            (0.0, 0.0, -1.0),
            (0.0, 0.0, 1.0),
            (3.0, 100.0, 3.0),
        ] {
            let p = poi.evaluate(mean, var, best);
            assert!((0.0..=1.0).contains(&p), "POI out of range: {p}");
        }
    }

    #[test]
    fn poi_degenerate_posterior_is_a_step_function() {
        let poi = Acquisition::ProbabilityOfImprovement { xi: 0.01 };
        #[allow(clippy::float_cmp)]
        {
            assert_eq!(poi.evaluate(2.0, 0.0, 1.0), 1.0);
            assert_eq!(poi.evaluate(1.0, 0.0, 1.0), 0.0);
        }
    }

    #[test]
    fn ei_closed_form_at_zero_improvement() {
        // mean == best + xi gives EI = std * pdf(0)
        let ei = Acquisition::ExpectedImprovement { xi: 0.0 };
        let std = 2.0;
        let expect = std * norm_pdf(0.0);
        assert!((ei.evaluate(1.0, std * std, 1.0) - expect).abs() < 1e-10);
    }
}
