//! Kraskov–Stögbauer–Grassberger mutual information estimator
//!
//! Algorithm 1 of the KSG paper with the max-norm in every space:
//!
//! - `eps_i`: distance from sample `i` to its k-th nearest neighbour in the
//!   joint space, where the joint distance is the larger of the two marginal
//!   Chebyshev distances
//! - `n_x(i)`, `n_y(i)`: samples strictly closer than `eps_i` in each marginal
//! - `pmi_i = ψ(k) + ψ(N) - ψ(n_x(i) + 1) - ψ(n_y(i) + 1)`
//!
//! The mean of the pointwise values is the MI estimate in nats. Search is
//! brute force and parallel over query points.

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_NEIGHBOURS, EULER_GAMMA};
use crate::error::{LmiError, LmiResult};

/// Digamma function ψ(x) for x > 0
pub fn digamma(mut x: f64) -> f64 {
    if x <= 0.0 && x == x.floor() {
        return f64::NAN;
    }
    if x == 1.0 {
        return -EULER_GAMMA;
    }

    let mut result = 0.0;
    // ψ(x) = ψ(x + 1) - 1/x until the asymptotic series is accurate
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }

    let inv = 1.0 / x;
    let inv2 = inv * inv;
    let series = inv2
        * (1.0 / 12.0
            - inv2 * (1.0 / 120.0 - inv2 * (1.0 / 252.0 - inv2 * (1.0 / 240.0 - inv2 / 132.0))));
    result + x.ln() - 0.5 * inv - series
}

/// Row-major copy so each sample is one contiguous slice
fn rows_of(m: &DMatrix<f32>) -> Vec<f32> {
    m.transpose().as_slice().to_vec()
}

fn chebyshev(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p - q).abs())
        .fold(0.0f32, f32::max) as f64
}

/// KSG estimator with a fixed neighbour count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KsgEstimator {
    pub k: usize,
}

impl Default for KsgEstimator {
    fn default() -> Self {
        Self { k: DEFAULT_NEIGHBOURS }
    }
}

impl KsgEstimator {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    /// Pointwise MI for every row, in input order
    pub fn pointwise(&self, zx: &DMatrix<f32>, zy: &DMatrix<f32>) -> LmiResult<Vec<f64>> {
        let n = zx.nrows();
        if n != zy.nrows() {
            return Err(LmiError::ShapeMismatch { x_len: n, y_len: zy.nrows() });
        }
        if self.k == 0 {
            return Err(LmiError::InvalidConfig("k must be positive".into()));
        }
        if n <= self.k {
            return Err(LmiError::InsufficientSamples { n, k: self.k });
        }

        let (dx, dy) = (zx.ncols(), zy.ncols());
        let xs = rows_of(zx);
        let ys = rows_of(zy);
        let x_row = |i: usize| &xs[i * dx..(i + 1) * dx];
        let y_row = |i: usize| &ys[i * dy..(i + 1) * dy];

        let k = self.k;
        let constant = digamma(k as f64) + digamma(n as f64);

        let pmi = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut dist_x = Vec::with_capacity(n - 1);
                let mut dist_y = Vec::with_capacity(n - 1);
                let mut joint = Vec::with_capacity(n - 1);
                for j in (0..n).filter(|&j| j != i) {
                    let ddx = chebyshev(x_row(i), x_row(j));
                    let ddy = chebyshev(y_row(i), y_row(j));
                    dist_x.push(ddx);
                    dist_y.push(ddy);
                    joint.push(ddx.max(ddy));
                }

                let (_, eps, _) = joint.select_nth_unstable_by(k - 1, |a, b| a.total_cmp(b));
                let eps = *eps;
                let nx = dist_x.iter().filter(|&&d| d < eps).count();
                let ny = dist_y.iter().filter(|&&d| d < eps).count();

                constant - digamma(nx as f64 + 1.0) - digamma(ny as f64 + 1.0)
            })
            .collect();

        Ok(pmi)
    }

    /// Mean of the pointwise values
    pub fn estimate(&self, zx: &DMatrix<f32>, zy: &DMatrix<f32>) -> LmiResult<f64> {
        let pmi = self.pointwise(zx, zy)?;
        Ok(pmi.iter().sum::<f64>() / pmi.len() as f64)
    }
}

/// Pointwise MI with the default `k = 3`
pub fn mi(zx: &DMatrix<f32>, zy: &DMatrix<f32>) -> LmiResult<Vec<f64>> {
    KsgEstimator::default().pointwise(zx, zy)
}
