//! Covariance kernels for the Gaussian-process surrogate.
//!
//! A kernel is a pure covariance formula; the surrogate owns the
//! hyperparameters (per-dimension lengthscales and signal variance) and
//! passes them in on every call, so tuning never has to rebuild the kernel.
//!
//! Both built-in kernels use automatic relevance determination: each input
//! dimension is scaled by its own lengthscale before distances are taken.

/// A stationary covariance function over unit-space points.
///
/// Implementations must be symmetric (`k(a, b) == k(b, a)`) and produce
/// `signal_var` at zero distance. Custom kernels can be plugged into the
/// surrogate through
/// [`BayesOptBuilder::kernel`](crate::optimizer::BayesOptBuilder::kernel).
pub trait Kernel: Send + Sync {
    /// Evaluates the covariance between two points.
    ///
    /// `lengthscales` has one entry per dimension of `a` and `b`.
    fn covariance(&self, a: &[f64], b: &[f64], lengthscales: &[f64], signal_var: f64) -> f64;
}

/// Scaled squared distance `sum(((a_i - b_i) / l_i)^2)`.
fn scaled_sq_dist(a: &[f64], b: &[f64], lengthscales: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .zip(lengthscales)
        .map(|((x, y), l)| {
            let d = (x - y) / l;
            d * d
        })
        .sum()
}

/// The squared-exponential (RBF) kernel, the default surrogate kernel.
///
/// `k(a, b) = signal_var * exp(-0.5 * r^2)` with `r` the lengthscale-scaled
/// distance. Infinitely smooth, which suits the well-behaved response
/// surfaces typical of tuning problems.
#[derive(Clone, Copy, Debug, Default)]
pub struct SquaredExponential;

impl Kernel for SquaredExponential {
    fn covariance(&self, a: &[f64], b: &[f64], lengthscales: &[f64], signal_var: f64) -> f64 {
        signal_var * (-0.5 * scaled_sq_dist(a, b, lengthscales)).exp()
    }
}

/// The Matern 5/2 kernel, a rougher alternative to [`SquaredExponential`].
///
/// `k(a, b) = signal_var * (1 + sqrt(5) r + 5/3 r^2) * exp(-sqrt(5) r)`.
/// Only twice differentiable, so it tolerates less smooth objectives better
/// than the squared exponential.
#[derive(Clone, Copy, Debug, Default)]
pub struct Matern52;

const SQRT_5: f64 = 2.236_067_977_499_79;

impl Kernel for Matern52 {
    fn covariance(&self, a: &[f64], b: &[f64], lengthscales: &[f64], signal_var: f64) -> f64 {
        let r = scaled_sq_dist(a, b, lengthscales).sqrt();
        signal_var * (1.0 + SQRT_5 * r + 5.0 / 3.0 * r * r) * (-SQRT_5 * r).exp()
    }
}
