//! Adam optimizer over a list of parameter tensors.

use nalgebra::DMatrix;

use crate::constants::{ADAM_BETA1, ADAM_BETA2, ADAM_EPSILON};
use crate::error::{LmiError, LmiResult};

/// Adam with bias correction.
///
/// Moment buffers are allocated on the first step to match the shapes of
/// the parameters passed in; later steps must pass the same tensors in the
/// same order.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    m: Vec<DMatrix<f32>>, // First moment
    v: Vec<DMatrix<f32>>, // Second moment
    t: i32,               // Timestep
}

impl Adam {
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            beta1: ADAM_BETA1,
            beta2: ADAM_BETA2,
            epsilon: ADAM_EPSILON,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.lr
    }

    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one update
    pub fn step(&mut self, params: Vec<&mut DMatrix<f32>>, grads: &[DMatrix<f32>]) -> LmiResult<()> {
        if params.len() != grads.len() {
            return Err(LmiError::StateMismatch(format!(
                "{} parameter tensors but {} gradients",
                params.len(),
                grads.len()
            )));
        }

        for (param, grad) in params.iter().zip(grads) {
            if param.shape() != grad.shape() {
                return Err(LmiError::StateMismatch(format!(
                    "gradient shape {:?} does not match parameter {:?}",
                    grad.shape(),
                    param.shape()
                )));
            }
        }

        if self.m.is_empty() {
            self.m = grads.iter().map(|g| DMatrix::zeros(g.nrows(), g.ncols())).collect();
            self.v = self.m.clone();
        } else if self.m.len() != grads.len()
            || self.m.iter().zip(grads).any(|(m, g)| m.shape() != g.shape())
        {
            return Err(LmiError::StateMismatch(
                "optimizer state does not match the parameters".to_string(),
            ));
        }

        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t);
        let (beta1, beta2, lr, eps) = (self.beta1, self.beta2, self.lr, self.epsilon);

        for (((param, grad), m), v) in params
            .into_iter()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            m.zip_apply(grad, |mi, g| *mi = beta1 * *mi + (1.0 - beta1) * g);
            v.zip_apply(grad, |vi, g| *vi = beta2 * *vi + (1.0 - beta2) * g * g);

            for ((p, &mi), &vi) in param.iter_mut().zip(m.iter()).zip(v.iter()) {
                let m_hat = mi / bias_correction1;
                let v_hat = vi / bias_correction2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            }
        }

        Ok(())
    }

    pub fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }
}
