//! Progress reporting for the training loop.
//!
//! Observers are purely informational: the loop never reads anything back
//! from them, so swapping observers cannot change results.

use tracing::{debug, info};

use super::report::TrainingReport;

/// Snapshot of one finished epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochUpdate {
    /// Zero-based epoch index
    pub epoch: usize,
    pub max_epochs: usize,
    pub train_loss: f64,
    pub validation_loss: f64,
    pub best_validation_loss: f64,
    pub remaining_patience: usize,
}

/// Receives training progress
pub trait ProgressObserver {
    fn on_epoch(&mut self, update: &EpochUpdate);

    fn on_finish(&mut self, _report: &TrainingReport) {}
}

/// Observer that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_epoch(&mut self, _update: &EpochUpdate) {}
}

/// Emits `tracing` events per epoch
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_epoch(&mut self, u: &EpochUpdate) {
        debug!(
            epoch = u.epoch + 1,
            max_epochs = u.max_epochs,
            train_loss = u.train_loss,
            validation_loss = u.validation_loss,
            best = u.best_validation_loss,
            patience_left = u.remaining_patience,
            "epoch finished"
        );
    }

    fn on_finish(&mut self, report: &TrainingReport) {
        info!("{}", report.summary());
    }
}

/// Records every update; handy for tests and custom front ends
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    pub updates: Vec<EpochUpdate>,
    pub finished: bool,
}

impl ProgressObserver for RecordingProgress {
    fn on_epoch(&mut self, update: &EpochUpdate) {
        self.updates.push(*update);
    }

    fn on_finish(&mut self, _report: &TrainingReport) {
        self.finished = true;
    }
}
