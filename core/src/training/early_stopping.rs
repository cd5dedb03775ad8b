//! Early Stopping
//!
//! Tracks the best validation loss seen so far together with a snapshot of
//! the model that produced it, and signals when training should halt.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why training ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Validation loss did not improve for `patience` epochs
    PatienceExhausted,
    /// Epoch budget used up
    MaxEpochsReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::PatienceExhausted => write!(f, "patience_exhausted"),
            StopReason::MaxEpochsReached => write!(f, "max_epochs_reached"),
        }
    }
}

/// Outcome of [`EarlyStopper::observe`]
#[derive(Debug, Clone, PartialEq)]
pub enum StopDecision<S> {
    /// Keep training
    Continue,
    /// Stop and install this state, a copy of the best one recorded
    StopWithState(S),
    /// Stop, but no state was ever recorded (no loss was ever finite-and-better)
    StopWithoutState,
}

impl<S> StopDecision<S> {
    pub fn should_stop(&self) -> bool {
        !matches!(self, StopDecision::Continue)
    }
}

/// Early stopping controller.
///
/// Improvement is strict: a loss equal to the current minimum counts against
/// patience. NaN never improves.
#[derive(Debug, Clone)]
pub struct EarlyStopper<S> {
    patience: usize,
    counter: usize,
    min_validation_loss: f64,
    best_state: Option<S>,
    best_epoch: Option<usize>,
    observed: usize,
}

impl<S: Clone> EarlyStopper<S> {
    /// Create a controller that stops after `patience` non-improving epochs
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            counter: 0,
            min_validation_loss: f64::INFINITY,
            best_state: None,
            best_epoch: None,
            observed: 0,
        }
    }

    /// Record one validation loss.
    ///
    /// `snapshot` is only called when the loss improves, so callers can
    /// pass a closure that deep-copies the model.
    pub fn observe(&mut self, validation_loss: f64, snapshot: impl FnOnce() -> S) -> StopDecision<S> {
        let epoch = self.observed;
        self.observed += 1;

        if validation_loss < self.min_validation_loss {
            self.min_validation_loss = validation_loss;
            self.counter = 0;
            self.best_state = Some(snapshot());
            self.best_epoch = Some(epoch);
            return StopDecision::Continue;
        }

        self.counter += 1;
        if self.counter >= self.patience {
            match &self.best_state {
                Some(state) => StopDecision::StopWithState(state.clone()),
                None => StopDecision::StopWithoutState,
            }
        } else {
            StopDecision::Continue
        }
    }

    /// Lowest loss seen (`inf` before any finite observation)
    pub fn best_loss(&self) -> f64 {
        self.min_validation_loss
    }

    pub fn best_state(&self) -> Option<&S> {
        self.best_state.as_ref()
    }

    /// Zero-based index of the observation that produced the best state
    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    /// Move the best state out, leaving the controller without one
    pub fn take_best_state(&mut self) -> Option<S> {
        self.best_state.take()
    }

    /// Consecutive non-improving observations
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn remaining_patience(&self) -> usize {
        self.patience.saturating_sub(self.counter)
    }

    pub fn reset(&mut self) {
        self.counter = 0;
        self.min_validation_loss = f64::INFINITY;
        self.best_state = None;
        self.best_epoch = None;
        self.observed = 0;
    }
}
