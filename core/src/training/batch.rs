//! Shuffled minibatching of paired samples

use nalgebra::DMatrix;
use rand::prelude::*;

use crate::preprocess::select_rows;

/// Shuffle `0..n` and chunk it into batches of at most `batch_size`
pub fn shuffled_batches<R: Rng + ?Sized>(n: usize, batch_size: usize, rng: &mut R) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    order.chunks(batch_size.max(1)).map(<[usize]>::to_vec).collect()
}

/// Gather the same rows from both views
pub fn gather_pair(
    x: &DMatrix<f32>,
    y: &DMatrix<f32>,
    rows: &[usize],
) -> (DMatrix<f32>, DMatrix<f32>) {
    (select_rows(x, rows), select_rows(y, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_cover_all_samples_once() {
        let mut rng = StdRng::seed_from_u64(0);
        let batches = shuffled_batches(1030, 512, &mut rng);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 512);
        assert_eq!(batches[2].len(), 6);

        let mut all: Vec<usize> = batches.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..1030).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_larger_than_data() {
        let mut rng = StdRng::seed_from_u64(0);
        let batches = shuffled_batches(10, 512, &mut rng);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 10);
    }

    #[test]
    fn test_gather_pair_keeps_rows_aligned() {
        let x = DMatrix::from_fn(6, 2, |i, _| i as f32);
        let y = DMatrix::from_fn(6, 3, |i, _| 10.0 * i as f32);
        let (bx, by) = gather_pair(&x, &y, &[5, 1]);
        assert_eq!(bx[(0, 0)], 5.0);
        assert_eq!(by[(0, 2)], 50.0);
        assert_eq!(bx[(1, 1)] * 10.0, by[(1, 0)]);
    }
}
