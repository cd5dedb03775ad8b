//! Contrastive lower bounds on mutual information between two latent batches.
//!
//! Both critics score a pair by a scaled dot product
//! `T(zx_i, zy_j) = <zx_i, zy_j> / sqrt(d)`. Each function returns the bound
//! together with its gradient with respect to both latent batches, so the
//! caller can fold `-lam * bound` into its own backward pass.

use nalgebra::DMatrix;

/// A bound value and its gradients
#[derive(Debug, Clone)]
pub struct BoundOutput {
    pub bound: f32,
    pub d_zx: DMatrix<f32>,
    pub d_zy: DMatrix<f32>,
}

fn critic_scale(latent_dim: usize) -> f32 {
    1.0 / (latent_dim.max(1) as f32).sqrt()
}

/// Numerically stable `ln Σ exp(v)` plus the softmax weights
fn log_sum_exp(values: &[f32]) -> (f32, Vec<f32>) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|&v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    let weights = exps.iter().map(|&e| e / total).collect();
    (max + total.ln(), weights)
}

/// Donsker–Varadhan bound used by MINE.
///
/// `bound = mean_i T(i, i) - ln mean_i exp T(i, perm[i])`, where `perm` pairs
/// each `zx` row with an unrelated `zy` row to sample the product of marginals.
pub fn mine_bound(zx: &DMatrix<f32>, zy: &DMatrix<f32>, perm: &[usize]) -> BoundOutput {
    let b = zx.nrows();
    let s = critic_scale(zx.ncols());
    let bf = b.max(1) as f32;

    let joint: f32 = (0..b).map(|i| s * zx.row(i).dot(&zy.row(i))).sum::<f32>() / bf;
    let marginal: Vec<f32> = (0..b)
        .map(|i| s * zx.row(i).dot(&zy.row(perm[i])))
        .collect();
    let (lse, weights) = log_sum_exp(&marginal);
    let bound = joint - (lse - bf.ln());

    let mut d_zx = zy * (s / bf);
    let mut d_zy = zx * (s / bf);
    for i in 0..b {
        let w = weights[i] * s;
        let zy_neg = zy.row(perm[i]).clone_owned();
        let zx_pos = zx.row(i).clone_owned();
        {
            let mut row = d_zx.row_mut(i);
            row -= zy_neg * w;
        }
        let mut row = d_zy.row_mut(perm[i]);
        row -= zx_pos * w;
    }

    BoundOutput { bound, d_zx, d_zy }
}

/// InfoNCE bound with in-batch negatives.
///
/// `bound = mean_i (S_ii - ln Σ_j exp S_ij) + ln B`, i.e. `ln B` minus the
/// cross-entropy of identifying the matching `zy` row for each `zx` row.
pub fn infonce_bound(zx: &DMatrix<f32>, zy: &DMatrix<f32>) -> BoundOutput {
    let b = zx.nrows();
    let s = critic_scale(zx.ncols());
    let bf = b.max(1) as f32;

    let scores = (zx * zy.transpose()) * s;
    let mut total = 0.0f32;
    // G = (I - P) / B where P is the row-wise softmax of the scores
    let mut g = DMatrix::<f32>::zeros(b, b);
    for i in 0..b {
        let row: Vec<f32> = scores.row(i).iter().copied().collect();
        let (lse, p) = log_sum_exp(&row);
        total += scores[(i, i)] - lse;
        for j in 0..b {
            let indicator = if i == j { 1.0 } else { 0.0 };
            g[(i, j)] = (indicator - p[j]) / bf;
        }
    }
    let bound = total / bf + bf.ln();

    let d_zx = (&g * zy) * s;
    let d_zy = (g.transpose() * zx) * s;

    BoundOutput { bound, d_zx, d_zy }
}
