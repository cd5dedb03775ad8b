//! Representation learning: fit a paired autoencoder on a train/test split
//! and embed every sample.

use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{LATENT_DIM_WARN_THRESHOLD, REPRESENTATION_VALIDATION_SPLIT};
use crate::error::{LmiError, LmiResult};
use crate::estimate::EstimateWarning;
use crate::model::{PairedAutoencoder, Regularizer, RepresentationModel};
use crate::preprocess::{check_indices, select_rows};
use crate::training::{
    train, DataSplitter, ProgressObserver, SplitIndices, TrainingConfig, TrainingReport,
};

/// Model choice and shape for [`learn_representation`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepresentationConfig {
    /// Objective tying the latent spaces together (default: cross)
    pub regularizer: Regularizer,
    /// Weight of the self-reconstruction term (default: 1)
    pub alpha: f32,
    /// Weight of the regularization term (default: 1)
    pub lam: f32,
    /// Latent width per view (default: 8)
    pub latent_dim: usize,
    /// Hidden layer width of every encoder and decoder (default: 128)
    pub hidden_dim: usize,
}

impl Default for RepresentationConfig {
    fn default() -> Self {
        Self {
            regularizer: Regularizer::Cross,
            alpha: 1.0,
            lam: 1.0,
            latent_dim: 8,
            hidden_dim: 128,
        }
    }
}

impl RepresentationConfig {
    pub fn with_regularizer(mut self, regularizer: Regularizer) -> Self {
        self.regularizer = regularizer;
        self
    }

    pub fn with_latent_dim(mut self, latent_dim: usize) -> Self {
        self.latent_dim = latent_dim;
        self
    }

    pub fn with_hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.hidden_dim = hidden_dim;
        self
    }

    pub fn with_weights(mut self, alpha: f32, lam: f32) -> Self {
        self.alpha = alpha;
        self.lam = lam;
        self
    }

    pub fn validate(&self) -> LmiResult<()> {
        if self.latent_dim == 0 {
            return Err(LmiError::InvalidConfig("latent_dim must be positive".into()));
        }
        if self.hidden_dim == 0 {
            return Err(LmiError::InvalidConfig("hidden_dim must be positive".into()));
        }
        if !self.alpha.is_finite() || !self.lam.is_finite() {
            return Err(LmiError::InvalidConfig("alpha and lam must be finite".into()));
        }
        Ok(())
    }
}

/// Output of [`learn_representation`]
#[derive(Debug, Clone)]
pub struct Representation {
    /// `N × latent_dim` codes for every input row, in input order
    pub zx: DMatrix<f32>,
    pub zy: DMatrix<f32>,
    /// Trained model, best parameters installed, in eval mode
    pub model: PairedAutoencoder,
    pub report: TrainingReport,
    pub warnings: Vec<EstimateWarning>,
}

/// Train on `train_indices`, validate on `test_indices`, then encode all rows.
///
/// Inputs are used as given; normalization is the caller's job.
#[allow(clippy::too_many_arguments)]
pub fn learn_representation<R, P>(
    xs: &DMatrix<f32>,
    ys: &DMatrix<f32>,
    train_indices: &[usize],
    test_indices: &[usize],
    config: &RepresentationConfig,
    training: &TrainingConfig,
    rng: &mut R,
    progress: &mut P,
) -> LmiResult<Representation>
where
    R: Rng + ?Sized,
    P: ProgressObserver + ?Sized,
{
    let n = xs.nrows();
    if n != ys.nrows() {
        return Err(LmiError::ShapeMismatch { x_len: n, y_len: ys.nrows() });
    }
    config.validate()?;
    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(LmiError::InvalidConfig(
            "train and test index sets must both be non-empty".into(),
        ));
    }
    check_indices(train_indices, n)?;
    check_indices(test_indices, n)?;

    let mut warnings = Vec::new();
    if config.latent_dim > LATENT_DIM_WARN_THRESHOLD {
        warn!(
            latent_dim = config.latent_dim,
            threshold = LATENT_DIM_WARN_THRESHOLD,
            "high latent dimensionality; nearest-neighbour MI estimates degrade in high dimensions"
        );
        warnings.push(EstimateWarning::LatentDimExceedsThreshold {
            latent_dim: config.latent_dim,
            threshold: LATENT_DIM_WARN_THRESHOLD,
        });
    }

    let x_train = select_rows(xs, train_indices);
    let y_train = select_rows(ys, train_indices);
    let x_test = select_rows(xs, test_indices);
    let y_test = select_rows(ys, test_indices);

    let mut model = config.regularizer.build(
        xs.ncols(),
        ys.ncols(),
        config.hidden_dim,
        config.latent_dim,
        config.alpha,
        config.lam,
        rng,
    );

    let report = train(
        &mut model, &x_train, &y_train, &x_test, &y_test, training, rng, progress,
    )?;

    let (zx, zy) = model.encode(xs, ys);

    Ok(Representation { zx, zy, model, report, warnings })
}

/// Split `0..N` at random, holding out `validation_split` (0.3 when `None`),
/// then run [`learn_representation`] on that split.
///
/// Inputs are used as given; no normalization is applied.
#[allow(clippy::too_many_arguments)]
pub fn fit_representation<R, P>(
    xs: &DMatrix<f32>,
    ys: &DMatrix<f32>,
    validation_split: Option<f64>,
    config: &RepresentationConfig,
    training: &TrainingConfig,
    rng: &mut R,
    progress: &mut P,
) -> LmiResult<(Representation, SplitIndices)>
where
    R: Rng + ?Sized,
    P: ProgressObserver + ?Sized,
{
    if xs.nrows() != ys.nrows() {
        return Err(LmiError::ShapeMismatch { x_len: xs.nrows(), y_len: ys.nrows() });
    }
    let split = DataSplitter::new()
        .with_validation_fraction(validation_split.unwrap_or(REPRESENTATION_VALIDATION_SPLIT))
        .split_indices(xs.nrows(), rng)?;
    let rep = learn_representation(xs, ys, &split.train, &split.test, config, training, rng, progress)?;
    Ok((rep, split))
}
