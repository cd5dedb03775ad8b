//! Configuration for the training loop
//!
//! Defines the optimization parameters shared by every regularizer.

use serde::{Deserialize, Serialize};

use crate::error::{LmiError, LmiResult};

/// Configuration for [`train`](super::train)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Minibatch size (default: 512); the last batch of an epoch may be smaller
    pub batch_size: usize,

    /// Adam learning rate (default: 1e-4)
    pub learning_rate: f32,

    /// Maximum number of epochs (default: 300)
    pub max_epochs: usize,

    /// Epochs without validation improvement before stopping (default: 30)
    pub patience: usize,

    /// Suppress progress output
    pub quiet: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 512,
            learning_rate: 1e-4,
            max_epochs: 300,
            patience: 30,
            quiet: true,
        }
    }
}

impl TrainingConfig {
    /// Smoke-test settings: a handful of epochs with a high learning rate
    pub fn instant() -> Self {
        Self {
            batch_size: 128,
            learning_rate: 1e-2,
            max_epochs: 5,
            patience: 2,
            ..Default::default()
        }
    }

    /// Fewer epochs with a faster learning rate
    pub fn quick() -> Self {
        Self {
            learning_rate: 1e-3,
            max_epochs: 60,
            patience: 10,
            ..Default::default()
        }
    }

    /// Long run with extra patience
    pub fn thorough() -> Self {
        Self {
            max_epochs: 1000,
            patience: 60,
            ..Default::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    /// Enable progress output
    pub fn verbose(mut self) -> Self {
        self.quiet = false;
        self
    }

    /// Disable progress output
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Reject settings the loop cannot run with
    pub fn validate(&self) -> LmiResult<()> {
        if self.batch_size == 0 {
            return Err(LmiError::InvalidConfig("batch_size must be positive".into()));
        }
        if self.max_epochs == 0 {
            return Err(LmiError::InvalidConfig("max_epochs must be positive".into()));
        }
        if self.patience == 0 {
            return Err(LmiError::InvalidConfig("patience must be positive".into()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(LmiError::InvalidConfig(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}
