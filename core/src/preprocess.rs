//! Input preprocessing
//!
//! Converts row-major samples into matrices and normalizes each feature
//! column before training:
//!
//! 1. subtract the column mean and divide by the population standard deviation
//! 2. replace non-finite results (constant columns, NaN/inf inputs) with 0
//! 3. clip to `[-CLIP_BOUND, CLIP_BOUND]`

use nalgebra::DMatrix;

use crate::constants::CLIP_BOUND;
use crate::error::{LmiError, LmiResult};

/// Build an `N × D` matrix from `N` rows of width `D`.
///
/// `side` names the input in error messages ("X" or "Y").
pub fn rows_to_matrix(rows: &[Vec<f32>], side: &'static str) -> LmiResult<DMatrix<f32>> {
    let n = rows.len();
    if n == 0 {
        return Err(LmiError::EmptyInput);
    }
    let dim = rows[0].len();
    if dim == 0 {
        return Err(LmiError::InvalidConfig(format!("{side} rows have zero columns")));
    }

    for (row, values) in rows.iter().enumerate() {
        if values.len() != dim {
            return Err(LmiError::RaggedInput {
                side,
                row,
                expected: dim,
                got: values.len(),
            });
        }
    }

    Ok(DMatrix::from_fn(n, dim, |i, j| rows[i][j]))
}

/// Convert matrix rows back to `Vec<Vec<f32>>`
pub fn matrix_to_rows(m: &DMatrix<f32>) -> Vec<Vec<f32>> {
    (0..m.nrows())
        .map(|i| m.row(i).iter().copied().collect())
        .collect()
}

/// Per-column standardization with population standard deviation.
///
/// Statistics are accumulated in f64 and only over finite entries, so a
/// single NaN does not poison its column. Any non-finite output becomes 0.
pub fn standardize_columns(m: &mut DMatrix<f32>) {
    for mut col in m.column_iter_mut() {
        let (sum, count) = col
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0f64, 0usize), |(s, c), &v| (s + v as f64, c + 1));

        if count == 0 {
            col.fill(0.0);
            continue;
        }

        let mean = sum / count as f64;
        let var = col
            .iter()
            .filter(|v| v.is_finite())
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / count as f64;
        let std = var.sqrt();

        for v in col.iter_mut() {
            let z = ((*v as f64 - mean) / std) as f32;
            *v = if z.is_finite() { z } else { 0.0 };
        }
    }
}

/// Clamp every entry into `[-bound, bound]`
pub fn clip(m: &mut DMatrix<f32>, bound: f32) {
    m.apply(|v| *v = v.clamp(-bound, bound));
}

/// Standardize then clip to the default bound
pub fn normalize(m: &mut DMatrix<f32>) {
    standardize_columns(m);
    clip(m, CLIP_BOUND);
}

/// Gather the given rows into a new matrix, in index order
pub fn select_rows(m: &DMatrix<f32>, indices: &[usize]) -> DMatrix<f32> {
    DMatrix::from_fn(indices.len(), m.ncols(), |i, j| m[(indices[i], j)])
}

/// Check that every index addresses a row of an `n`-row matrix
pub fn check_indices(indices: &[usize], n: usize) -> LmiResult<()> {
    match indices.iter().find(|&&i| i >= n) {
        Some(&index) => Err(LmiError::IndexOutOfBounds { index, len: n }),
        None => Ok(()),
    }
}

/// Replace non-finite entries with 0, returning how many were replaced
pub fn zero_non_finite(m: &mut DMatrix<f32>) -> usize {
    let mut replaced = 0;
    for v in m.iter_mut() {
        if !v.is_finite() {
            *v = 0.0;
            replaced += 1;
        }
    }
    replaced
}
