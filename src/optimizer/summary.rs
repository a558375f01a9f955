use crate::domain::Domain;
use crate::history::{History, Observation, Warning};
use crate::param::Pars;
use crate::types::Phase;

use super::BayesOpt;

/// Result accessors. All of them are cheap views into the run's state and
/// can be called at any point, including between [`run_more`] calls.
///
/// [`run_more`]: BayesOpt::run_more
impl BayesOpt {
    /// One row per completed evaluation, in submission order.
    #[must_use]
    pub fn score_summary(&self) -> &[Observation] {
        self.history.observations()
    }

    /// The underlying evaluation log, for its query methods.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The best parameters found so far, with their score.
    ///
    /// Ties resolve to the earliest observation. `None` before any
    /// evaluation completed.
    #[must_use]
    pub fn best_pars(&self) -> Option<(&Pars, f64)> {
        self.history.best().map(|o| (&o.pars, o.score))
    }

    /// The full best observation, including origin, aux values and the
    /// proposal-time utility.
    #[must_use]
    pub fn best_observation(&self) -> Option<&Observation> {
        self.history.best()
    }

    /// Every recoverable incident the run worked around so far.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// The phase the run is currently in (or ended in).
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of completed evaluations.
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.history.len()
    }

    /// The latest optimization pass number (0 while only the initial design
    /// has run).
    #[must_use]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// The domain this optimizer searches.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::history::Origin;
    use crate::optimizer::BayesOpt;
    use crate::param::Pars;
    use crate::types::Phase;

    #[test]
    fn accessors_are_empty_before_the_first_run() {
        let domain = crate::domain::Domain::builder()
            .continuous("x", 0.0, 1.0)
            .build()
            .unwrap();
        let opt = BayesOpt::builder(domain).build().unwrap();

        assert_eq!(opt.phase(), Phase::Init);
        assert_eq!(opt.n_observations(), 0);
        assert!(opt.score_summary().is_empty());
        assert!(opt.best_pars().is_none());
        assert!(opt.best_observation().is_none());
        assert!(opt.warnings().is_empty());
        assert_eq!(opt.iteration(), 0);
        assert_eq!(opt.domain().len(), 1);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn summary_rows_carry_origin_and_utility() {
        let domain = crate::domain::Domain::builder()
            .continuous("x", 0.0, 1.0)
            .build()
            .unwrap();
        let mut opt = BayesOpt::builder(domain)
            .init_points(3)
            .iterations(2)
            .seed(29)
            .build()
            .unwrap();
        opt.run(|pars: &Pars| Ok::<_, Error>(pars["x"].as_f64()))
            .unwrap();

        let rows = opt.score_summary();
        assert_eq!(rows.len(), 5);
        assert!(
            rows.iter()
                .filter(|o| o.origin == Origin::InitialDesign)
                .all(|o| o.iteration == 0 && o.utility.is_none())
        );
        assert!(
            rows.iter()
                .filter(|o| o.origin == Origin::Proposed)
                .all(|o| o.iteration > 0)
        );

        let (best, score) = opt.best_pars().unwrap();
        assert!(rows.iter().any(|o| o.score == score && &o.pars == best));
        assert_eq!(opt.best_observation().unwrap().score, score);
    }
}
