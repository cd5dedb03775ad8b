//! Latent MI Core - Mutual Information via Learned Embeddings
//!
//! This crate estimates mutual information between two paired sets of
//! high-dimensional observations. It first learns low-dimensional latent
//! codes for both views with a paired autoencoder, then applies the KSG
//! nearest-neighbour estimator to those codes.
//!
//! # Features
//!
//! - **Paired autoencoders**: cross-reconstruction, MINE and InfoNCE regularizers
//! - **Early stopping**: validation-tracked training that keeps the best parameters
//! - **KSG estimator**: pointwise MI for every sample, parallel over samples
//! - **Loaders**: JSON and CSV input for both views
//! - **Synthetic data**: correlated Gaussians with known MI
//!
//! # Example
//!
//! ```rust,ignore
//! use latentmi_core::{estimate, EstimatorConfig};
//!
//! let config = EstimatorConfig::default();
//! let result = estimate(&xs, &ys, &config)?;
//!
//! println!("MI = {:.3} nats", result.mi().unwrap_or(f64::NAN));
//! for (row, pmi) in result.pmi.iter().enumerate() {
//!     if let Some(v) = pmi {
//!         println!("{row}: {v:.3}");
//!     }
//! }
//! ```

pub mod constants;
pub mod error;
pub mod preprocess;

// Model family and optimizer
pub mod model;
pub mod optim;
pub mod training;

// Estimation
pub mod estimate;
pub mod ksg;
pub mod representation;

// Data
pub mod loader;
pub mod synthetic;

// Re-exports for convenience
pub use error::{LmiError, LmiResult};
pub use estimate::{
    estimate, estimate_matrices, estimate_with_progress, Estimate, EstimateWarning,
    EstimatorConfig, MiSummary, PointwiseMi,
};
pub use ksg::KsgEstimator;
pub use model::{ModelMode, ModelState, PairedAutoencoder, Regularizer, RepresentationModel};
pub use optim::Adam;
pub use representation::{
    fit_representation, learn_representation, Representation, RepresentationConfig,
};
pub use training::{
    train, DataSplitter, EarlyStopper, LogProgress, NoProgress, ProgressObserver, SplitIndices,
    StopDecision, StopReason, TrainingConfig, TrainingReport,
};
