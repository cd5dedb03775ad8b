//! Train/validation index partitioning

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{LmiError, LmiResult};

/// Disjoint train and test indices covering `0..n`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    pub fn train_size(&self) -> usize {
        self.train.len()
    }

    pub fn test_size(&self) -> usize {
        self.test.len()
    }

    pub fn total(&self) -> usize {
        self.train.len() + self.test.len()
    }
}

/// Random index splitter
#[derive(Debug, Clone)]
pub struct DataSplitter {
    /// Fraction of samples held out for validation
    validation_fraction: f64,
}

impl DataSplitter {
    /// Default 50/50 split
    pub fn new() -> Self {
        Self { validation_fraction: 0.5 }
    }

    /// Set validation fraction; must lie strictly between 0 and 1
    pub fn with_validation_fraction(mut self, fraction: f64) -> Self {
        self.validation_fraction = fraction;
        self
    }

    pub fn validation_fraction(&self) -> f64 {
        self.validation_fraction
    }

    /// Number of training samples for `n` samples.
    ///
    /// `round(n * (1 - fraction))`, then clamped so both sides keep at least
    /// one sample.
    pub fn train_size(&self, n: usize) -> usize {
        let train = (n as f64 * (1.0 - self.validation_fraction)).round() as usize;
        train.max(1).min(n.saturating_sub(1))
    }

    /// Shuffle `0..n` and cut it into train and test indices
    pub fn split_indices<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> LmiResult<SplitIndices> {
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(LmiError::InvalidConfig(format!(
                "validation_split must lie in (0, 1), got {}",
                self.validation_fraction
            )));
        }
        if n < 2 {
            return Err(LmiError::InsufficientSamples { n, k: 1 });
        }

        let train_size = self.train_size(n);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        let test = indices.split_off(train_size);

        Ok(SplitIndices { train: indices, test })
    }
}

impl Default for DataSplitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn test_basic_split() {
        let split = DataSplitter::new().split_indices(100, &mut rng(42)).unwrap();
        assert_eq!(split.train_size(), 50);
        assert_eq!(split.test_size(), 50);
    }

    #[test]
    fn test_split_uses_rounding() {
        let splitter = DataSplitter::new().with_validation_fraction(0.3);
        // 10 * 0.7 = 7
        assert_eq!(splitter.train_size(10), 7);
        // 7 * 0.5 = 3.5 rounds away from zero
        assert_eq!(DataSplitter::new().train_size(7), 4);
    }

    #[test]
    fn test_split_disjoint_and_covering() {
        let split = DataSplitter::new()
            .with_validation_fraction(0.37)
            .split_indices(257, &mut rng(7))
            .unwrap();

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..257).collect::<Vec<_>>());
        assert_eq!(split.total(), 257);
    }

    #[test]
    fn test_split_deterministic() {
        let splitter = DataSplitter::new();
        let a = splitter.split_indices(100, &mut rng(123)).unwrap();
        let b = splitter.split_indices(100, &mut rng(123)).unwrap();
        assert_eq!(a, b);

        let c = splitter.split_indices(100, &mut rng(124)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_small_data_keeps_both_sides() {
        let split = DataSplitter::new()
            .with_validation_fraction(0.99)
            .split_indices(3, &mut rng(0))
            .unwrap();
        assert_eq!(split.train_size(), 1);
        assert_eq!(split.test_size(), 2);

        let split = DataSplitter::new()
            .with_validation_fraction(0.01)
            .split_indices(3, &mut rng(0))
            .unwrap();
        assert_eq!(split.train_size(), 2);
        assert_eq!(split.test_size(), 1);
    }

    #[test]
    fn test_invalid_fraction_and_tiny_input() {
        assert!(DataSplitter::new().with_validation_fraction(0.0).split_indices(10, &mut rng(0)).is_err());
        assert!(DataSplitter::new().with_validation_fraction(1.0).split_indices(10, &mut rng(0)).is_err());
        assert!(DataSplitter::new().split_indices(1, &mut rng(0)).is_err());
    }
}
