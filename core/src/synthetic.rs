//! Synthetic paired data with known mutual information
//!
//! Used by tests, the demo example and `lmi generate`. Coordinates are
//! independent pairs `(x_d, y_d)` with correlation `rho`, so the true MI is
//! additive over dimensions.

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// `Y = rho * X + sqrt(1 - rho^2) * E` with `X, E ~ N(0, I)`.
///
/// Returns two `n × dim` matrices.
pub fn correlated_gaussians<R: Rng + ?Sized>(
    n: usize,
    dim: usize,
    rho: f64,
    rng: &mut R,
) -> (DMatrix<f32>, DMatrix<f32>) {
    let noise_scale = (1.0 - rho * rho).max(0.0).sqrt();
    let mut x = DMatrix::zeros(n, dim);
    let mut y = DMatrix::zeros(n, dim);

    for i in 0..n {
        for j in 0..dim {
            let a: f64 = StandardNormal.sample(rng);
            let e: f64 = StandardNormal.sample(rng);
            x[(i, j)] = a as f32;
            y[(i, j)] = (rho * a + noise_scale * e) as f32;
        }
    }

    (x, y)
}

/// Independent standard normal views of widths `x_dim` and `y_dim`
pub fn independent_gaussians<R: Rng + ?Sized>(
    n: usize,
    x_dim: usize,
    y_dim: usize,
    rng: &mut R,
) -> (DMatrix<f32>, DMatrix<f32>) {
    let mut sample = |cols: usize| {
        DMatrix::from_fn(n, cols, |_, _| {
            let v: f64 = StandardNormal.sample(rng);
            v as f32
        })
    };
    let x = sample(x_dim);
    let y = sample(y_dim);
    (x, y)
}

/// Analytic MI in nats of [`correlated_gaussians`]: `-dim/2 * ln(1 - rho^2)`
pub fn gaussian_mi(dim: usize, rho: f64) -> f64 {
    -0.5 * dim as f64 * (1.0 - rho * rho).ln()
}

/// Pointwise MI of one correlated-Gaussian sample pair, averaged over
/// coordinates it sums to [`gaussian_mi`]
pub fn gaussian_pmi(x: &[f32], y: &[f32], rho: f64) -> f64 {
    let r2 = rho * rho;
    x.iter()
        .zip(y)
        .map(|(&a, &b)| {
            let (a, b) = (a as f64, b as f64);
            -0.5 * (1.0 - r2).ln() - (r2 * (a * a + b * b) - 2.0 * rho * a * b) / (2.0 * (1.0 - r2))
        })
        .sum()
}
