//! Minibatch training with validation-based early stopping.

use std::time::Instant;

use nalgebra::DMatrix;
use rand::Rng;
use tracing::{info, warn};

use super::batch::{gather_pair, shuffled_batches};
use super::config::TrainingConfig;
use super::early_stopping::{EarlyStopper, StopDecision, StopReason};
use super::progress::{EpochUpdate, ProgressObserver};
use super::report::TrainingReport;
use crate::error::{LmiError, LmiResult};
use crate::model::{ModelMode, RepresentationModel};
use crate::optim::Adam;

fn check_pair(x: &DMatrix<f32>, y: &DMatrix<f32>, what: &str) -> LmiResult<()> {
    if x.nrows() != y.nrows() {
        return Err(LmiError::ShapeMismatch { x_len: x.nrows(), y_len: y.nrows() });
    }
    if x.nrows() == 0 {
        return Err(LmiError::InvalidConfig(format!("{what} set is empty")));
    }
    Ok(())
}

/// Mean validation loss: the same shuffled batching as training, no gradients,
/// unweighted mean of the per-batch losses
fn validation_loss<M, R>(
    model: &M,
    x: &DMatrix<f32>,
    y: &DMatrix<f32>,
    batch_size: usize,
    rng: &mut R,
) -> f64
where
    M: RepresentationModel,
    R: Rng + ?Sized,
{
    let batches = shuffled_batches(x.nrows(), batch_size, rng);
    let total: f64 = batches
        .iter()
        .map(|rows| {
            let (bx, by) = gather_pair(x, y, rows);
            model.learning_loss(&bx, &by, rng) as f64
        })
        .sum();
    total / batches.len() as f64
}

/// Train `model` in place.
///
/// Each epoch runs one Adam step per shuffled minibatch of the training
/// pairs, then scores the validation pairs. The early stopper keeps a copy
/// of the best-scoring parameters; those are installed into `model` when
/// patience runs out and also when `max_epochs` is reached.
#[allow(clippy::too_many_arguments)]
pub fn train<M, R, P>(
    model: &mut M,
    x_train: &DMatrix<f32>,
    y_train: &DMatrix<f32>,
    x_test: &DMatrix<f32>,
    y_test: &DMatrix<f32>,
    config: &TrainingConfig,
    rng: &mut R,
    progress: &mut P,
) -> LmiResult<TrainingReport>
where
    M: RepresentationModel,
    R: Rng + ?Sized,
    P: ProgressObserver + ?Sized,
{
    config.validate()?;
    check_pair(x_train, y_train, "training")?;
    check_pair(x_test, y_test, "validation")?;

    let start = Instant::now();
    let mut optimizer = Adam::new(config.learning_rate);
    let mut stopper = EarlyStopper::new(config.patience);
    let mut report = TrainingReport::new(x_train.nrows(), x_test.nrows());
    let mut stop_reason = StopReason::MaxEpochsReached;
    let mut restored = false;

    for epoch in 0..config.max_epochs {
        model.set_mode(ModelMode::Train);
        let batches = shuffled_batches(x_train.nrows(), config.batch_size, rng);
        let mut train_total = 0.0f64;
        for rows in &batches {
            let (bx, by) = gather_pair(x_train, y_train, rows);
            let (loss, grads) = model.loss_and_gradients(&bx, &by, rng);
            optimizer.step(model.parameters_mut(), &grads)?;
            train_total += loss as f64;
        }
        let train_loss = train_total / batches.len() as f64;

        model.set_mode(ModelMode::Eval);
        let val_loss = validation_loss(model, x_test, y_test, config.batch_size, rng);

        let decision = stopper.observe(val_loss, || model.state());
        let improved = stopper.best_epoch() == Some(epoch);
        report.add_epoch(train_loss, val_loss, improved);
        progress.on_epoch(&EpochUpdate {
            epoch,
            max_epochs: config.max_epochs,
            train_loss,
            validation_loss: val_loss,
            best_validation_loss: stopper.best_loss(),
            remaining_patience: stopper.remaining_patience(),
        });

        match decision {
            StopDecision::Continue => {}
            StopDecision::StopWithState(state) => {
                model.load_state(&state)?;
                stop_reason = StopReason::PatienceExhausted;
                restored = true;
                break;
            }
            StopDecision::StopWithoutState => {
                stop_reason = StopReason::PatienceExhausted;
                break;
            }
        }
    }

    if !restored {
        match stopper.take_best_state() {
            Some(state) => model.load_state(&state)?,
            None => warn!(
                epochs = report.epochs_run,
                "validation loss was never finite; keeping the last parameters"
            ),
        }
    }
    model.set_mode(ModelMode::Eval);

    report.finalize(
        stopper.best_epoch(),
        stopper.best_loss(),
        stop_reason,
        start.elapsed().as_secs_f64(),
    );

    if !config.quiet {
        info!(
            epochs = report.epochs_run,
            reason = %report.stopped_reason,
            best_validation_loss = report.best_validation_loss,
            final_validation_loss = report.final_validation_loss,
            "training finished"
        );
    }
    progress.on_finish(&report);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelState;
    use crate::training::progress::{NoProgress, RecordingProgress};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;

    /// One scalar parameter that Adam pushes up by ~lr per step, and a
    /// validation loss read from a script, one entry per epoch
    struct ScriptedModel {
        w: DMatrix<f32>,
        script: Vec<f64>,
        calls: Cell<usize>,
        mode: ModelMode,
    }

    impl ScriptedModel {
        fn new(script: &[f64]) -> Self {
            Self {
                w: DMatrix::zeros(1, 1),
                script: script.to_vec(),
                calls: Cell::new(0),
                mode: ModelMode::Train,
            }
        }

        fn w(&self) -> f32 {
            self.w[(0, 0)]
        }
    }

    impl RepresentationModel for ScriptedModel {
        fn input_dims(&self) -> (usize, usize) {
            (1, 1)
        }

        fn latent_dim(&self) -> usize {
            1
        }

        fn mode(&self) -> ModelMode {
            self.mode
        }

        fn set_mode(&mut self, mode: ModelMode) {
            self.mode = mode;
        }

        fn learning_loss<R: Rng + ?Sized>(&self, _x: &DMatrix<f32>, _y: &DMatrix<f32>, _rng: &mut R) -> f32 {
            let i = self.calls.get();
            self.calls.set(i + 1);
            let last = self.script.last().copied().unwrap_or(0.0);
            self.script.get(i).copied().unwrap_or(last) as f32
        }

        fn loss_and_gradients<R: Rng + ?Sized>(
            &self,
            _x: &DMatrix<f32>,
            _y: &DMatrix<f32>,
            _rng: &mut R,
        ) -> (f32, Vec<DMatrix<f32>>) {
            assert_eq!(self.mode, ModelMode::Train);
            (1.0, vec![DMatrix::from_element(1, 1, -1.0)])
        }

        fn parameters_mut(&mut self) -> Vec<&mut DMatrix<f32>> {
            vec![&mut self.w]
        }

        fn encode(&self, x: &DMatrix<f32>, y: &DMatrix<f32>) -> (DMatrix<f32>, DMatrix<f32>) {
            (x.clone(), y.clone())
        }

        fn state(&self) -> ModelState {
            ModelState::new(vec![self.w.clone()])
        }

        fn load_state(&mut self, state: &ModelState) -> LmiResult<()> {
            self.w.copy_from(&state.tensors[0]);
            Ok(())
        }
    }

    fn data(n: usize) -> (DMatrix<f32>, DMatrix<f32>) {
        (DMatrix::zeros(n, 1), DMatrix::zeros(n, 1))
    }

    /// One batch per epoch, lr 1 so `w` counts epochs
    fn config(max_epochs: usize, patience: usize) -> TrainingConfig {
        TrainingConfig::default()
            .with_batch_size(64)
            .with_learning_rate(1.0)
            .with_max_epochs(max_epochs)
            .with_patience(patience)
    }

    fn run(model: &mut ScriptedModel, cfg: &TrainingConfig) -> TrainingReport {
        let (x, y) = data(10);
        let mut rng = StdRng::seed_from_u64(0);
        train(model, &x, &y, &x, &y, cfg, &mut rng, &mut NoProgress).unwrap()
    }

    #[test]
    fn test_patience_restores_best_state() {
        let mut model = ScriptedModel::new(&[5.0, 4.0, 3.0, 3.5, 3.0, 4.0]);
        let report = run(&mut model, &config(100, 3));

        assert_eq!(report.stopped_reason, StopReason::PatienceExhausted);
        assert_eq!(report.epochs_run, 6);
        assert_eq!(report.best_epoch, Some(2));
        assert_eq!(report.best_validation_loss, 3.0);
        // parameters after the third epoch
        assert!((model.w() - 3.0).abs() < 1e-3, "w = {}", model.w());
        assert_eq!(model.mode(), ModelMode::Eval);
    }

    #[test]
    fn test_max_epochs_restores_best_state() {
        let mut model = ScriptedModel::new(&[5.0, 4.0, 2.0, 4.0, 5.0]);
        let report = run(&mut model, &config(5, 30));

        assert_eq!(report.stopped_reason, StopReason::MaxEpochsReached);
        assert_eq!(report.epochs_run, 5);
        assert_eq!(report.best_epoch, Some(2));
        assert!((model.w() - 3.0).abs() < 1e-3, "w = {}", model.w());
    }

    #[test]
    fn test_single_epoch() {
        let mut model = ScriptedModel::new(&[1.0]);
        let report = run(&mut model, &config(1, 30));

        assert_eq!(report.epochs_run, 1);
        assert_eq!(report.best_epoch, Some(0));
        assert_eq!(report.stopped_reason, StopReason::MaxEpochsReached);
        assert!((model.w() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_constant_loss_stops_after_patience() {
        let mut model = ScriptedModel::new(&[2.0]);
        let report = run(&mut model, &config(300, 4));

        // one improvement from +inf, then `patience` ties
        assert_eq!(report.epochs_run, 5);
        assert_eq!(report.best_epoch, Some(0));
        assert!((model.w() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_all_nan_keeps_live_parameters() {
        let mut model = ScriptedModel::new(&[f64::NAN]);
        let report = run(&mut model, &config(300, 2));

        assert_eq!(report.epochs_run, 2);
        assert_eq!(report.best_epoch, None);
        assert_eq!(report.status, "failed");
        assert!((model.w() - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_validation_loss_is_mean_of_batches() {
        let mut model = ScriptedModel::new(&[1.0, 3.0]);
        let (x, y) = data(10);
        let cfg = config(1, 5).with_batch_size(5);
        let mut rng = StdRng::seed_from_u64(0);
        let report = train(&mut model, &x, &y, &x, &y, &cfg, &mut rng, &mut NoProgress).unwrap();

        assert_eq!(report.history[0].validation_loss, 2.0);
        assert_eq!(report.history[0].train_loss, 1.0);
    }

    #[test]
    fn test_progress_observer_sees_every_epoch() {
        let mut model = ScriptedModel::new(&[3.0, 2.0, 1.0]);
        let (x, y) = data(10);
        let mut rng = StdRng::seed_from_u64(0);
        let mut progress = RecordingProgress::default();
        train(&mut model, &x, &y, &x, &y, &config(3, 5), &mut rng, &mut progress).unwrap();

        assert_eq!(progress.updates.len(), 3);
        assert_eq!(progress.updates[2].best_validation_loss, 1.0);
        assert!(progress.finished);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let mut model = ScriptedModel::new(&[1.0]);
        let mut rng = StdRng::seed_from_u64(0);
        let (x, y) = data(10);
        let (short, _) = data(9);
        let empty = DMatrix::<f32>::zeros(0, 1);

        let err = train(&mut model, &x, &short, &x, &y, &config(1, 1), &mut rng, &mut NoProgress);
        assert!(matches!(err, Err(LmiError::ShapeMismatch { .. })));

        let err = train(&mut model, &x, &y, &empty, &empty, &config(1, 1), &mut rng, &mut NoProgress);
        assert!(matches!(err, Err(LmiError::InvalidConfig(_))));

        let err = train(&mut model, &x, &y, &x, &y, &config(0, 1), &mut rng, &mut NoProgress);
        assert!(matches!(err, Err(LmiError::InvalidConfig(_))));
    }
}
