//! Terminal progress bar for training epochs

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use latentmi_core::training::EpochUpdate;
use latentmi_core::{ProgressObserver, TrainingReport};

/// Epoch bar that finishes early when patience runs out
pub struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    pub fn new(max_epochs: usize) -> Result<Self> {
        let pb = ProgressBar::new(max_epochs as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Ok(Self { pb })
    }
}

impl ProgressObserver for BarProgress {
    fn on_epoch(&mut self, update: &EpochUpdate) {
        self.pb.set_position(update.epoch as u64 + 1);
        self.pb.set_message(format!(
            "train {:.4}  val {:.4}  best {:.4}  patience {}",
            update.train_loss,
            update.validation_loss,
            update.best_validation_loss,
            update.remaining_patience
        ));
    }

    fn on_finish(&mut self, _report: &TrainingReport) {
        self.pb.finish_and_clear();
    }
}
