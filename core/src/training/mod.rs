//! Training Module
//!
//! Provides the optimization side of representation learning:
//! - Random train/validation index splits
//! - Shuffled minibatching
//! - Early stopping that keeps the best parameters
//! - The epoch loop with Adam updates and validation scoring
//! - Training reports with recommendations
//!
//! # Example
//!
//! ```rust,ignore
//! use latentmi_core::training::{train, TrainingConfig, NoProgress};
//!
//! let config = TrainingConfig::quick();
//! let report = train(&mut model, &x_train, &y_train, &x_val, &y_val, &config, &mut rng, &mut NoProgress)?;
//! println!("{}", report.summary());
//! ```

mod batch;
mod config;
mod early_stopping;
mod progress;
mod report;
mod splitter;
mod trainer;

// Re-exports
pub use batch::{gather_pair, shuffled_batches};
pub use config::TrainingConfig;
pub use early_stopping::{EarlyStopper, StopDecision, StopReason};
pub use progress::{EpochUpdate, LogProgress, NoProgress, ProgressObserver, RecordingProgress};
pub use report::{EpochRecord, Recommendation, TrainingReport};
pub use splitter::{DataSplitter, SplitIndices};
pub use trainer::train;
