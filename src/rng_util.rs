/// Generate a random `f64` in the range `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Draw a uniform point in the unit hypercube `[0, 1)^d`.
pub(crate) fn unit_point(rng: &mut fastrand::Rng, d: usize) -> Vec<f64> {
    (0..d).map(|_| rng.f64()).collect()
}

/// Fisher-Yates shuffle, used to permute Latin-hypercube strata per
/// dimension.
pub(crate) fn shuffle<T>(rng: &mut fastrand::Rng, slice: &mut [T]) {
    for i in (1..slice.len()).rev() {
        slice.swap(i, rng.usize(0..=i));
    }
}

/// Draw from a zero-mean normal with the given standard deviation
/// (Box-Muller), used to nudge near-duplicate points apart.
pub(crate) fn gaussian(rng: &mut fastrand::Rng, sigma: f64) -> f64 {
    // f64() is in [0, 1); shift away from 0 so the log stays finite
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64();
    sigma * (-2.0 * u1.ln()).sqrt() * (core::f64::consts::TAU * u2).cos()
}
