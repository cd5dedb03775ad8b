//! Latent mutual information estimation
//!
//! `estimate` ties the pieces together:
//!
//! 1. reject inputs of different lengths
//! 2. standardize each view per column and clip outliers
//! 3. split samples into train and validation indices
//! 4. learn a paired latent representation with early stopping
//! 5. run the KSG estimator on the embeddings
//!
//! The result carries pointwise MI for every sample. With
//! `estimate_on_val` only validation samples get a value; the rest are
//! `None`, never zero.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::constants::{DEFAULT_NEIGHBOURS, DEFAULT_SEED};
use crate::error::{LmiError, LmiResult};
use crate::ksg::KsgEstimator;
use crate::model::PairedAutoencoder;
use crate::preprocess::{normalize, rows_to_matrix, select_rows, zero_non_finite};
use crate::representation::{learn_representation, RepresentationConfig};
use crate::training::{
    DataSplitter, LogProgress, NoProgress, ProgressObserver, SplitIndices, TrainingConfig,
    TrainingReport,
};

/// Non-fatal conditions noticed during estimation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimateWarning {
    /// Latent width above the point where KSG estimates stay reliable
    LatentDimExceedsThreshold { latent_dim: usize, threshold: usize },
    /// Embedding entries that were NaN or infinite and were replaced by 0
    NanEmbeddings { count: usize },
}

impl fmt::Display for EstimateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimateWarning::LatentDimExceedsThreshold { latent_dim, threshold } => write!(
                f,
                "latent_dim {} exceeds {}; KSG estimates may be unreliable",
                latent_dim, threshold
            ),
            EstimateWarning::NanEmbeddings { count } => {
                write!(f, "{} non-finite embedding values replaced with 0", count)
            }
        }
    }
}

/// Everything [`estimate`] needs besides the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub representation: RepresentationConfig,
    pub training: TrainingConfig,
    /// Fraction of samples held out for validation (default: 0.5)
    pub validation_split: f64,
    /// Estimate pMI on validation samples only (default: true)
    pub estimate_on_val: bool,
    /// KSG neighbour count (default: 3)
    pub neighbours: usize,
    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            representation: RepresentationConfig::default(),
            training: TrainingConfig::default(),
            validation_split: 0.5,
            estimate_on_val: true,
            neighbours: DEFAULT_NEIGHBOURS,
            seed: Some(DEFAULT_SEED),
        }
    }
}

impl EstimatorConfig {
    /// Short training for smoke tests and demos
    pub fn quick() -> Self {
        Self {
            training: TrainingConfig::quick(),
            ..Default::default()
        }
    }

    pub fn with_representation(mut self, representation: RepresentationConfig) -> Self {
        self.representation = representation;
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn with_validation_split(mut self, split: f64) -> Self {
        self.validation_split = split;
        self
    }

    /// Estimate pMI for every sample instead of validation samples only
    pub fn estimate_on_all(mut self) -> Self {
        self.estimate_on_val = false;
        self
    }

    pub fn with_neighbours(mut self, k: usize) -> Self {
        self.neighbours = k;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Draw the seed from OS entropy
    pub fn unseeded(mut self) -> Self {
        self.seed = None;
        self
    }

    pub fn validate(&self) -> LmiResult<()> {
        self.representation.validate()?;
        self.training.validate()?;
        if !(self.validation_split > 0.0 && self.validation_split < 1.0) {
            return Err(LmiError::InvalidConfig(format!(
                "validation_split must lie in (0, 1), got {}",
                self.validation_split
            )));
        }
        if self.neighbours == 0 {
            return Err(LmiError::InvalidConfig("neighbours must be positive".into()));
        }
        Ok(())
    }
}

/// Summary statistics over the present pMI values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MiSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub std_error: f64,
    pub count: usize,
}

/// Pointwise MI aligned with the input rows; `None` means "not estimated"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointwiseMi(pub Vec<Option<f64>>);

impl PointwiseMi {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.0.iter().copied()
    }

    /// Present values only, in row order
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().flatten().copied()
    }

    /// Number of rows with an estimate
    pub fn count(&self) -> usize {
        self.values().count()
    }

    /// MI estimate: mean of the present values
    pub fn mean(&self) -> Option<f64> {
        let count = self.count();
        (count > 0).then(|| self.values().sum::<f64>() / count as f64)
    }

    pub fn summary(&self) -> Option<MiSummary> {
        let mean = self.mean()?;
        let count = self.count();
        let var = if count > 1 {
            self.values().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64
        } else {
            0.0
        };
        let std_dev = var.sqrt();
        Some(MiSummary {
            mean,
            std_dev,
            std_error: std_dev / (count as f64).sqrt(),
            count,
        })
    }

    /// NaN-for-missing representation
    pub fn to_nan_vec(&self) -> Vec<f64> {
        self.0.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    }
}

/// Result of [`estimate`]
#[derive(Debug, Clone)]
pub struct Estimate {
    pub pmi: PointwiseMi,
    /// Embeddings of every input row, in input order
    pub zx: DMatrix<f32>,
    pub zy: DMatrix<f32>,
    pub model: PairedAutoencoder,
    pub split: SplitIndices,
    pub report: TrainingReport,
    pub warnings: Vec<EstimateWarning>,
}

impl Estimate {
    /// Scalar MI estimate in nats
    pub fn mi(&self) -> Option<f64> {
        self.pmi.mean()
    }

    pub fn summary(&self) -> Option<MiSummary> {
        self.pmi.summary()
    }
}

/// Estimate MI between paired row sets.
///
/// Progress goes to `tracing` unless `config.training.quiet` is set.
pub fn estimate(xs: &[Vec<f32>], ys: &[Vec<f32>], config: &EstimatorConfig) -> LmiResult<Estimate> {
    if config.training.quiet {
        estimate_with_progress(xs, ys, config, &mut NoProgress)
    } else {
        estimate_with_progress(xs, ys, config, &mut LogProgress)
    }
}

/// [`estimate`] with a caller-supplied progress observer
pub fn estimate_with_progress<P>(
    xs: &[Vec<f32>],
    ys: &[Vec<f32>],
    config: &EstimatorConfig,
    progress: &mut P,
) -> LmiResult<Estimate>
where
    P: ProgressObserver + ?Sized,
{
    if xs.len() != ys.len() {
        return Err(LmiError::ShapeMismatch { x_len: xs.len(), y_len: ys.len() });
    }
    let x = rows_to_matrix(xs, "X")?;
    let y = rows_to_matrix(ys, "Y")?;
    estimate_matrices(&x, &y, config, progress)
}

/// [`estimate`] on `N × D` matrices
pub fn estimate_matrices<P>(
    xs: &DMatrix<f32>,
    ys: &DMatrix<f32>,
    config: &EstimatorConfig,
    progress: &mut P,
) -> LmiResult<Estimate>
where
    P: ProgressObserver + ?Sized,
{
    let n = xs.nrows();
    if n != ys.nrows() {
        return Err(LmiError::ShapeMismatch { x_len: n, y_len: ys.nrows() });
    }
    if n == 0 {
        return Err(LmiError::EmptyInput);
    }
    config.validate()?;

    let mut x = xs.clone();
    let mut y = ys.clone();
    normalize(&mut x);
    normalize(&mut y);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let split = DataSplitter::new()
        .with_validation_fraction(config.validation_split)
        .split_indices(n, &mut rng)?;

    let ksg = KsgEstimator::new(config.neighbours);
    let ksg_rows = if config.estimate_on_val { split.test_size() } else { n };
    if ksg_rows <= ksg.k {
        return Err(LmiError::InsufficientSamples { n: ksg_rows, k: ksg.k });
    }

    let rep = learn_representation(
        &x,
        &y,
        &split.train,
        &split.test,
        &config.representation,
        &config.training,
        &mut rng,
        progress,
    )?;
    let mut warnings = rep.warnings;
    let (mut zx, mut zy) = (rep.zx, rep.zy);

    let replaced = zero_non_finite(&mut zx) + zero_non_finite(&mut zy);
    if replaced > 0 {
        warn!(count = replaced, "non-finite values in embeddings replaced with 0");
        warnings.push(EstimateWarning::NanEmbeddings { count: replaced });
    }

    let pmi = if config.estimate_on_val {
        let values = ksg.pointwise(&select_rows(&zx, &split.test), &select_rows(&zy, &split.test))?;
        let mut pmi = vec![None; n];
        for (&row, value) in split.test.iter().zip(values) {
            pmi[row] = Some(value);
        }
        pmi
    } else {
        ksg.pointwise(&zx, &zy)?.into_iter().map(Some).collect()
    };

    Ok(Estimate {
        pmi: PointwiseMi(pmi),
        zx,
        zy,
        model: rep.model,
        split,
        report: rep.report,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> EstimatorConfig {
        EstimatorConfig::default()
            .with_representation(RepresentationConfig::default().with_hidden_dim(8).with_latent_dim(2))
            .with_training(TrainingConfig::instant())
    }

    fn rows(n: usize, dim: usize, offset: f32) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| (0..dim).map(|j| ((i * dim + j) as f32 * 0.61 + offset).sin()).collect())
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = EstimatorConfig::default();
        assert_eq!(config.validation_split, 0.5);
        assert!(config.estimate_on_val);
        assert_eq!(config.neighbours, 3);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.representation.latent_dim, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(EstimatorConfig::default().with_validation_split(0.0).validate().is_err());
        assert!(EstimatorConfig::default().with_validation_split(1.0).validate().is_err());
        assert!(EstimatorConfig::default().with_neighbours(0).validate().is_err());
    }

    #[test]
    fn test_length_mismatch_checked_first() {
        // ragged X would also be an error, but the length check wins
        let xs = vec![vec![1.0, 2.0], vec![1.0]];
        let ys = vec![vec![1.0]];
        let err = estimate(&xs, &ys, &tiny_config()).unwrap_err();
        assert_eq!(err, LmiError::ShapeMismatch { x_len: 2, y_len: 1 });
    }

    #[test]
    fn test_empty_input() {
        let empty: Vec<Vec<f32>> = vec![];
        assert_eq!(estimate(&empty, &empty, &tiny_config()).unwrap_err(), LmiError::EmptyInput);
    }

    #[test]
    fn test_validation_subset_too_small_for_ksg() {
        let xs = rows(6, 2, 0.0);
        let ys = rows(6, 2, 1.0);
        let err = estimate(&xs, &ys, &tiny_config()).unwrap_err();
        assert_eq!(err, LmiError::InsufficientSamples { n: 3, k: 3 });
    }

    #[test]
    fn test_pointwise_alignment_on_validation() {
        let xs = rows(60, 3, 0.0);
        let ys = rows(60, 2, 0.3);
        let est = estimate(&xs, &ys, &tiny_config()).unwrap();

        assert_eq!(est.pmi.len(), 60);
        assert_eq!(est.split.test_size(), 30);
        for i in 0..60 {
            assert_eq!(est.pmi.get(i).is_some(), est.split.test.contains(&i), "row {i}");
        }
        assert_eq!(est.pmi.count(), 30);
        assert_eq!(est.zx.nrows(), 60);
    }

    #[test]
    fn test_pointwise_on_all_rows() {
        let xs = rows(40, 3, 0.0);
        let ys = rows(40, 2, 0.3);
        let est = estimate(&xs, &ys, &tiny_config().estimate_on_all()).unwrap();

        assert_eq!(est.pmi.count(), 40);
        assert!(est.pmi.iter().all(|v| v.map_or(false, f64::is_finite)));
    }

    #[test]
    fn test_pointwise_mi_helpers() {
        let pmi = PointwiseMi(vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(pmi.mean(), Some(2.0));
        assert_eq!(pmi.count(), 2);
        let nan = pmi.to_nan_vec();
        assert!(nan[1].is_nan());

        let summary = pmi.summary().unwrap();
        assert!((summary.std_dev - 2.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(summary.count, 2);

        assert_eq!(PointwiseMi(vec![None, None]).mean(), None);
        assert_eq!(serde_json::to_string(&pmi).unwrap(), "[1.0,null,3.0]");
    }

    #[test]
    fn test_warning_display_and_serde() {
        let w = EstimateWarning::NanEmbeddings { count: 4 };
        assert!(w.to_string().contains('4'));
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("\"kind\":\"nan_embeddings\""));
    }
}
