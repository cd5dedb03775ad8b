//! Training Report Generation
//!
//! Summarizes one run of the training loop: loss history, where the best
//! model came from and why training stopped.

use serde::{Deserialize, Serialize};

use super::early_stopping::StopReason;

/// Losses recorded for one epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Zero-based epoch index
    pub epoch: usize,
    /// Mean of per-batch training losses
    pub train_loss: f64,
    /// Mean of per-batch validation losses
    pub validation_loss: f64,
    /// Whether this epoch set a new best validation loss
    pub improved: bool,
}

/// Training recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Recommendation type (info, warning, error)
    pub level: String,
    /// Recommendation message
    pub message: String,
}

impl Recommendation {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: "info".to_string(), message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: "warning".to_string(), message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: "error".to_string(), message: message.into() }
    }
}

/// Complete training report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Training status (success, warning, failed)
    pub status: String,

    /// Samples used for gradient steps
    pub train_samples: usize,

    /// Samples used for validation
    pub validation_samples: usize,

    /// Epochs actually run
    pub epochs_run: usize,

    /// Epoch whose parameters were kept (None if no epoch improved)
    pub best_epoch: Option<usize>,

    /// Validation loss of the kept parameters
    pub best_validation_loss: f64,

    /// Validation loss of the last epoch run
    pub final_validation_loss: f64,

    /// Reason training stopped
    pub stopped_reason: StopReason,

    /// Per-epoch losses
    pub history: Vec<EpochRecord>,

    /// Total training time (seconds)
    pub total_time_secs: f64,

    /// Recommendations and observations
    pub recommendations: Vec<Recommendation>,
}

impl TrainingReport {
    /// Create a new empty report
    pub fn new(train_samples: usize, validation_samples: usize) -> Self {
        Self {
            status: "in_progress".to_string(),
            train_samples,
            validation_samples,
            epochs_run: 0,
            best_epoch: None,
            best_validation_loss: f64::INFINITY,
            final_validation_loss: f64::NAN,
            stopped_reason: StopReason::MaxEpochsReached,
            history: Vec::new(),
            total_time_secs: 0.0,
            recommendations: Vec::new(),
        }
    }

    /// Add one epoch
    pub fn add_epoch(&mut self, train_loss: f64, validation_loss: f64, improved: bool) {
        let epoch = self.history.len();
        self.history.push(EpochRecord {
            epoch,
            train_loss,
            validation_loss,
            improved,
        });
        self.epochs_run = self.history.len();
        self.final_validation_loss = validation_loss;
    }

    /// Finalize the report
    pub fn finalize(
        &mut self,
        best_epoch: Option<usize>,
        best_validation_loss: f64,
        stopped_reason: StopReason,
        total_time_secs: f64,
    ) {
        self.best_epoch = best_epoch;
        self.best_validation_loss = best_validation_loss;
        self.stopped_reason = stopped_reason;
        self.total_time_secs = total_time_secs;

        self.status = if best_epoch.is_none() || !best_validation_loss.is_finite() {
            "failed".to_string()
        } else if self.stopped_reason == StopReason::MaxEpochsReached
            && best_epoch == Some(self.epochs_run.saturating_sub(1))
        {
            // still improving on the very last epoch
            "warning".to_string()
        } else {
            "success".to_string()
        };

        self.generate_recommendations();
    }

    /// Gap between the best and the last validation loss
    pub fn final_gap(&self) -> f64 {
        self.final_validation_loss - self.best_validation_loss
    }

    /// Generate recommendations based on training results
    fn generate_recommendations(&mut self) {
        self.recommendations.clear();

        let Some(best_epoch) = self.best_epoch else {
            self.recommendations.push(Recommendation::error(
                "Validation loss was never finite. Check inputs for extreme values or lower the learning rate.",
            ));
            return;
        };

        match self.stopped_reason {
            StopReason::PatienceExhausted => {
                self.recommendations.push(Recommendation::info(format!(
                    "Early stopping kept epoch {} of {}",
                    best_epoch + 1,
                    self.epochs_run
                )));
            }
            StopReason::MaxEpochsReached => {
                if best_epoch + 1 == self.epochs_run {
                    self.recommendations.push(Recommendation::warning(
                        "Validation loss still improving at the last epoch. Consider more epochs.",
                    ));
                } else {
                    self.recommendations.push(Recommendation::info(format!(
                        "Epoch budget used up; best parameters from epoch {}",
                        best_epoch + 1
                    )));
                }
            }
        }

        if best_epoch == 0 && self.epochs_run > 1 {
            self.recommendations.push(Recommendation::warning(
                "Best validation loss came from the first epoch. The learning rate may be too high.",
            ));
        }

        if self.validation_samples < 100 {
            self.recommendations.push(Recommendation::warning(format!(
                "Only {} validation samples; the stopping point is noisy",
                self.validation_samples
            )));
        }
    }

    /// Get summary line
    pub fn summary(&self) -> String {
        format!(
            "{}: {} epochs ({}), best val loss {:.5} at epoch {}",
            self.status.to_uppercase(),
            self.epochs_run,
            self.stopped_reason,
            self.best_validation_loss,
            self.best_epoch.map(|e| (e + 1).to_string()).unwrap_or_else(|| "-".into())
        )
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Print human-readable report
    pub fn print(&self) {
        let best = self.best_epoch.map(|e| (e + 1).to_string()).unwrap_or_else(|| "-".into());
        println!("╔══════════════════════════════════════════════════════════════════════════════╗");
        println!("║                           TRAINING REPORT                                    ║");
        println!("╠══════════════════════════════════════════════════════════════════════════════╣");
        println!("║ Status: {:<68} ║", self.status.to_uppercase());
        println!("║ Samples: {:<67} ║",
            format!("{} train / {} validation", self.train_samples, self.validation_samples));
        println!("╠══════════════════════════════════════════════════════════════════════════════╣");
        println!("║ Epochs Run: {:>64} ║", self.epochs_run);
        println!("║ Best Epoch: {:>64} ║", best);
        println!("║ Best Validation Loss: {:>54.5} ║", self.best_validation_loss);
        println!("║ Final Validation Loss: {:>53.5} ║", self.final_validation_loss);
        println!("║ Stopped: {:>67} ║", self.stopped_reason.to_string());
        println!("║ Total Time: {:>63.1}s ║", self.total_time_secs);
        println!("╠══════════════════════════════════════════════════════════════════════════════╣");
        println!("║ Recommendations:                                                             ║");
        for rec in &self.recommendations {
            let icon = match rec.level.as_str() {
                "info" => "✓",
                "warning" => "⚠",
                "error" => "✗",
                _ => "•",
            };
            let msg: String = if rec.message.chars().count() > 70 {
                format!("{}...", rec.message.chars().take(67).collect::<String>())
            } else {
                rec.message.clone()
            };
            println!("║   {} {:<72} ║", icon, msg);
        }
        println!("╚══════════════════════════════════════════════════════════════════════════════╝");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_creation() {
        let report = TrainingReport::new(800, 200);
        assert_eq!(report.train_samples, 800);
        assert_eq!(report.validation_samples, 200);
        assert_eq!(report.status, "in_progress");
    }

    #[test]
    fn test_add_epoch() {
        let mut report = TrainingReport::new(800, 200);
        report.add_epoch(1.0, 0.9, true);
        report.add_epoch(0.8, 0.95, false);

        assert_eq!(report.epochs_run, 2);
        assert_eq!(report.history[1].epoch, 1);
        assert_eq!(report.final_validation_loss, 0.95);
    }

    #[test]
    fn test_finalize_success() {
        let mut report = TrainingReport::new(800, 200);
        for (v, improved) in [(0.9, true), (0.8, true), (0.85, false), (0.86, false)] {
            report.add_epoch(1.0, v, improved);
        }
        report.finalize(Some(1), 0.8, StopReason::PatienceExhausted, 2.0);

        assert_eq!(report.status, "success");
        assert!((report.final_gap() - 0.06).abs() < 1e-9);
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn test_finalize_still_improving_warns() {
        let mut report = TrainingReport::new(800, 200);
        report.add_epoch(1.0, 0.9, true);
        report.add_epoch(1.0, 0.8, true);
        report.finalize(Some(1), 0.8, StopReason::MaxEpochsReached, 1.0);

        assert_eq!(report.status, "warning");
        assert!(report.recommendations.iter().any(|r| r.level == "warning"));
    }

    #[test]
    fn test_finalize_failed() {
        let mut report = TrainingReport::new(10, 10);
        report.add_epoch(f64::NAN, f64::NAN, false);
        report.finalize(None, f64::INFINITY, StopReason::PatienceExhausted, 0.1);

        assert_eq!(report.status, "failed");
        assert_eq!(report.recommendations[0].level, "error");
    }

    #[test]
    fn test_to_json() {
        let mut report = TrainingReport::new(800, 200);
        report.add_epoch(1.0, 0.5, true);
        report.finalize(Some(0), 0.5, StopReason::MaxEpochsReached, 0.5);
        let json = report.to_json().unwrap();

        assert!(json.contains("\"train_samples\": 800"));
        assert!(json.contains("\"stopped_reason\": \"max_epochs_reached\""));
    }

    #[test]
    fn test_summary() {
        let mut report = TrainingReport::new(800, 200);
        report.add_epoch(1.0, 0.5, true);
        report.add_epoch(1.0, 0.6, false);
        report.finalize(Some(0), 0.5, StopReason::PatienceExhausted, 0.5);

        let summary = report.summary();
        assert!(summary.contains("SUCCESS"));
        assert!(summary.contains("patience_exhausted"));
    }
}
