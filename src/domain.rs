//! Search-space definition: named, bounded scalar parameters.
//!
//! A [`Domain`] is an ordered set of [`ParamSpec`]s, each either continuous
//! or integer-valued with finite `low < high` bounds. The domain is immutable
//! after construction and provides the two coordinate systems the rest of the
//! crate works in:
//!
//! - **parameter space** — named values ([`Pars`]) as the scoring function
//!   sees them;
//! - **unit space** — the hypercube `[0, 1]^d` the surrogate and the
//!   acquisition search operate in, for numerical conditioning.
//!
//! [`normalize`](Domain::normalize) and [`denormalize`](Domain::denormalize)
//! convert between the two; integer parameters are rounded to the nearest
//! whole value on the way out, so `denormalize(normalize(p)) == p` for every
//! in-bounds `p` (exactly for continuous dimensions, up to rounding for
//! integer ones).
//!
//! All sampling takes a caller-supplied [`fastrand::Rng`] — there is no
//! hidden global random state anywhere in the crate.
//!
//! # Examples
//!
//! ```
//! use bayesopt::domain::Domain;
//!
//! let domain = Domain::builder()
//!     .continuous("learning_rate", 1e-4, 1e-1)
//!     .integer("num_leaves", 8, 256)
//!     .build()
//!     .unwrap();
//!
//! let mut rng = fastrand::Rng::with_seed(42);
//! let points = domain.sample_latin_hypercube(&mut rng, 5);
//! assert_eq!(points.len(), 5);
//! assert!(points.iter().all(|p| domain.contains(p)));
//! ```

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::param::{ParamValue, Pars};
use crate::rng_util;

/// Whether a parameter takes continuous or integer values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamKind {
    /// Any value in `[low, high]`.
    Continuous,
    /// Whole values in `[low, high]`; rounded on denormalization.
    Integer,
}

/// One named, bounded parameter.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamSpec {
    name: String,
    kind: ParamKind,
    low: f64,
    high: f64,
}

impl ParamSpec {
    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the parameter is continuous or integer.
    #[must_use]
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Returns the inclusive lower bound.
    #[must_use]
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the inclusive upper bound.
    #[must_use]
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Maps a unit-interval coordinate to a parameter value.
    ///
    /// The coordinate is clamped to `[0, 1]` first; integer parameters round
    /// to the nearest whole value.
    #[allow(clippy::cast_possible_truncation)]
    fn value_at(&self, unit: f64) -> ParamValue {
        let v = self.low + unit.clamp(0.0, 1.0) * (self.high - self.low);
        match self.kind {
            ParamKind::Continuous => ParamValue::Float(v),
            ParamKind::Integer => ParamValue::Int(v.round().clamp(self.low, self.high) as i64),
        }
    }

    /// Maps a parameter value to its unit-interval coordinate.
    fn unit_at(&self, value: f64) -> f64 {
        (value - self.low) / (self.high - self.low)
    }

    /// Snaps a unit coordinate to the grid of representable values.
    ///
    /// Continuous dimensions are returned unchanged (clamped); integer
    /// dimensions land exactly on the coordinate of a whole value.
    fn snap(&self, unit: f64) -> f64 {
        let unit = unit.clamp(0.0, 1.0);
        match self.kind {
            ParamKind::Continuous => unit,
            ParamKind::Integer => {
                let v = (self.low + unit * (self.high - self.low))
                    .round()
                    .clamp(self.low, self.high);
                self.unit_at(v)
            }
        }
    }
}

/// An immutable, ordered set of parameter specs.
///
/// Construct through [`Domain::builder`]; see the [module docs](self) for an
/// overview of the two coordinate systems.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Domain {
    specs: Vec<ParamSpec>,
    #[cfg_attr(feature = "serde", serde(skip))]
    index: HashMap<String, usize>,
}

impl Domain {
    /// Returns a builder for assembling a domain.
    #[must_use]
    pub fn builder() -> DomainBuilder {
        DomainBuilder { specs: Vec::new() }
    }

    /// Returns the number of parameters (the dimensionality `d`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns `true` if the domain has no parameters.
    ///
    /// A built domain is never empty; this exists for completeness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Returns the ordered parameter specs.
    #[must_use]
    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    /// Looks up a spec by name.
    #[must_use]
    pub fn spec(&self, name: &str) -> Option<&ParamSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// Maps named parameter values into the unit hypercube.
    ///
    /// The mapping must carry exactly the domain's parameter names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] naming the first missing or
    /// unexpected key.
    pub fn normalize(&self, pars: &Pars) -> Result<Vec<f64>> {
        if pars.len() != self.specs.len()
            && let Some(extra) = pars.keys().find(|k| !self.index.contains_key(*k))
        {
            return Err(Error::UnknownParameter(extra.clone()));
        }
        self.specs
            .iter()
            .map(|spec| {
                pars.get(&spec.name)
                    .map(|v| spec.unit_at(v.as_f64()))
                    .ok_or_else(|| Error::UnknownParameter(spec.name.clone()))
            })
            .collect()
    }

    /// Maps a unit-hypercube point back to named parameter values.
    ///
    /// Coordinates are clamped to `[0, 1]`; integer parameters round to the
    /// nearest whole value.
    ///
    /// # Panics
    ///
    /// Panics if `unit.len()` differs from [`len`](Self::len) — unit vectors
    /// only ever originate from this domain.
    #[must_use]
    pub fn denormalize(&self, unit: &[f64]) -> Pars {
        assert_eq!(unit.len(), self.specs.len(), "unit vector dimension mismatch");
        self.specs
            .iter()
            .zip(unit)
            .map(|(spec, &u)| (spec.name.clone(), spec.value_at(u)))
            .collect()
    }

    /// Returns `true` if `pars` names exactly the domain's parameters and
    /// every value lies within its bounds.
    #[must_use]
    pub fn contains(&self, pars: &Pars) -> bool {
        pars.len() == self.specs.len()
            && self.specs.iter().all(|spec| {
                pars.get(&spec.name)
                    .is_some_and(|v| (spec.low..=spec.high).contains(&v.as_f64()))
            })
    }

    /// Snaps the integer dimensions of a unit point onto the grid of
    /// representable whole values. Continuous dimensions are only clamped.
    pub(crate) fn snap_to_grid(&self, unit: &mut [f64]) {
        for (spec, u) in self.specs.iter().zip(unit.iter_mut()) {
            *u = spec.snap(*u);
        }
    }

    /// Draws `n` independent uniform points.
    #[must_use]
    pub fn sample_uniform(&self, rng: &mut fastrand::Rng, n: usize) -> Vec<Pars> {
        (0..n)
            .map(|_| self.denormalize(&rng_util::unit_point(rng, self.specs.len())))
            .collect()
    }

    /// Draws `n` points by Latin hypercube sampling.
    ///
    /// Each dimension is split into `n` equal strata and every stratum is
    /// hit exactly once (per dimension), which spreads a small initial
    /// design far more evenly than uniform draws.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sample_latin_hypercube(&self, rng: &mut fastrand::Rng, n: usize) -> Vec<Pars> {
        if n == 0 {
            return Vec::new();
        }
        let d = self.specs.len();
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(d);
        for _ in 0..d {
            let mut strata: Vec<usize> = (0..n).collect();
            rng_util::shuffle(rng, &mut strata);
            columns.push(
                strata
                    .into_iter()
                    .map(|s| (s as f64 + rng.f64()) / n as f64)
                    .collect(),
            );
        }
        (0..n)
            .map(|i| {
                let unit: Vec<f64> = columns.iter().map(|c| c[i]).collect();
                self.denormalize(&unit)
            })
            .collect()
    }

    /// Draws `n` points from a scrambled Sobol sequence (Burley 2020).
    ///
    /// Fully deterministic for a given `seed`: sample `i` of dimension `j`
    /// is `sobol_burley::sample(i, j, seed)`. Lower-discrepancy than Latin
    /// hypercube designs for moderate dimensionality.
    #[cfg(feature = "sobol")]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sample_sobol(&self, seed: u32, n: usize) -> Vec<Pars> {
        (0..n as u32)
            .map(|i| {
                let unit: Vec<f64> = (0..self.specs.len() as u32)
                    .map(|j| f64::from(sobol_burley::sample(i, j, seed)))
                    .collect();
                self.denormalize(&unit)
            })
            .collect()
    }
}

/// Builder for a [`Domain`].
///
/// Parameters keep the order in which they are declared; that order defines
/// the layout of unit vectors.
///
/// # Examples
///
/// ```
/// use bayesopt::domain::Domain;
///
/// let domain = Domain::builder()
///     .continuous("x", 0.0, 10.0)
///     .integer("n", 1, 50)
///     .build()
///     .unwrap();
/// assert_eq!(domain.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct DomainBuilder {
    specs: Vec<ParamSpec>,
}

impl DomainBuilder {
    /// Adds a continuous parameter with inclusive bounds.
    #[must_use]
    pub fn continuous(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.specs.push(ParamSpec {
            name: name.into(),
            kind: ParamKind::Continuous,
            low,
            high,
        });
        self
    }

    /// Adds an integer parameter with inclusive bounds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn integer(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.specs.push(ParamSpec {
            name: name.into(),
            kind: ParamKind::Integer,
            low: low as f64,
            high: high as f64,
        });
        self
    }

    /// Validates the declared parameters and builds the domain.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyDomain`] if no parameter was declared.
    /// - [`Error::InvalidBounds`] if any parameter has `low >= high` or a
    ///   non-finite bound.
    /// - [`Error::DuplicateParameter`] if two parameters share a name.
    pub fn build(self) -> Result<Domain> {
        if self.specs.is_empty() {
            return Err(Error::EmptyDomain);
        }
        let mut index = HashMap::with_capacity(self.specs.len());
        for (i, spec) in self.specs.iter().enumerate() {
            if !(spec.low.is_finite() && spec.high.is_finite()) || spec.low >= spec.high {
                return Err(Error::InvalidBounds {
                    name: spec.name.clone(),
                    low: spec.low,
                    high: spec.high,
                });
            }
            if index.insert(spec.name.clone(), i).is_some() {
                return Err(Error::DuplicateParameter(spec.name.clone()));
            }
        }
        Ok(Domain {
            specs: self.specs,
            index,
        })
    }
}

// Deserialization goes back through the builder, so a hand-edited payload
// cannot produce a domain the builder would reject.
#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Domain {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct Raw {
            specs: Vec<ParamSpec>,
        }
        let raw = Raw::deserialize(deserializer)?;
        DomainBuilder { specs: raw.specs }
            .build()
            .map_err(serde::de::Error::custom)
    }
}
