//! Dense layers with hand-written backward passes.
//!
//! Batches are row-major: an input of `N` samples with `D` features is an
//! `N × D` matrix. Gradients are returned in the same order as
//! [`Mlp::parameters_mut`] yields parameters.

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::constants::LEAKY_RELU_SLOPE;

/// Fully connected layer `y = x Wᵀ + b`
#[derive(Debug, Clone)]
pub struct Linear {
    /// `out × in`
    pub weight: DMatrix<f32>,
    /// `1 × out`
    pub bias: DMatrix<f32>,
}

impl Linear {
    /// Uniform init in `±1/sqrt(fan_in)` for both weight and bias
    pub fn new<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let weight = DMatrix::from_fn(fan_out, fan_in, |_, _| dist.sample(rng));
        let bias = DMatrix::from_fn(1, fan_out, |_, _| dist.sample(rng));
        Self { weight, bias }
    }

    pub fn fan_in(&self) -> usize {
        self.weight.ncols()
    }

    pub fn fan_out(&self) -> usize {
        self.weight.nrows()
    }

    pub fn forward(&self, x: &DMatrix<f32>) -> DMatrix<f32> {
        let mut out = x * self.weight.transpose();
        for (j, mut col) in out.column_iter_mut().enumerate() {
            col.add_scalar_mut(self.bias[(0, j)]);
        }
        out
    }

    /// Returns `(dW, db, dX)` given the layer input and `dL/dY`
    pub fn backward(
        &self,
        input: &DMatrix<f32>,
        grad_out: &DMatrix<f32>,
    ) -> (DMatrix<f32>, DMatrix<f32>, DMatrix<f32>) {
        let d_weight = grad_out.transpose() * input;
        let d_bias = DMatrix::from_fn(1, grad_out.ncols(), |_, j| grad_out.column(j).sum());
        let d_input = grad_out * &self.weight;
        (d_weight, d_bias, d_input)
    }
}

fn leaky_relu(v: f32) -> f32 {
    if v > 0.0 {
        v
    } else {
        LEAKY_RELU_SLOPE * v
    }
}

fn leaky_relu_grad(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else {
        LEAKY_RELU_SLOPE
    }
}

/// Intermediate values kept by [`Mlp::forward_cached`]
#[derive(Debug, Clone)]
pub struct MlpCache {
    /// Input to each layer
    inputs: Vec<DMatrix<f32>>,
    /// Pre-activation output of every hidden layer
    pre_activations: Vec<DMatrix<f32>>,
}

/// Multi-layer perceptron with LeakyReLU between layers and a linear output
#[derive(Debug, Clone)]
pub struct Mlp {
    layers: Vec<Linear>,
}

impl Mlp {
    /// `sizes = [in, hidden.., out]`; needs at least two entries
    pub fn new<R: Rng + ?Sized>(sizes: &[usize], rng: &mut R) -> Self {
        let layers = sizes
            .windows(2)
            .map(|w| Linear::new(w[0], w[1], rng))
            .collect();
        Self { layers }
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(Linear::fan_in).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(Linear::fan_out).unwrap_or(0)
    }

    pub fn forward(&self, x: &DMatrix<f32>) -> DMatrix<f32> {
        let last = self.layers.len().saturating_sub(1);
        let mut h = x.clone();
        for (l, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h);
            if l < last {
                h.apply(|v| *v = leaky_relu(*v));
            }
        }
        h
    }

    pub fn forward_cached(&self, x: &DMatrix<f32>) -> (DMatrix<f32>, MlpCache) {
        let last = self.layers.len().saturating_sub(1);
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre_activations = Vec::with_capacity(last);
        let mut h = x.clone();

        for (l, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(&h);
            inputs.push(h);
            if l < last {
                h = z.map(leaky_relu);
                pre_activations.push(z);
            } else {
                h = z;
            }
        }

        (h, MlpCache { inputs, pre_activations })
    }

    /// Backpropagate `dL/d output`.
    ///
    /// Returns parameter gradients `[W0, b0, W1, b1, ..]` and `dL/d input`.
    pub fn backward(
        &self,
        cache: &MlpCache,
        grad_out: &DMatrix<f32>,
    ) -> (Vec<DMatrix<f32>>, DMatrix<f32>) {
        let n_layers = self.layers.len();
        let mut grads: Vec<Option<(DMatrix<f32>, DMatrix<f32>)>> = vec![None; n_layers];
        let mut g = grad_out.clone();

        for l in (0..n_layers).rev() {
            let (dw, db, dx) = self.layers[l].backward(&cache.inputs[l], &g);
            grads[l] = Some((dw, db));
            g = if l > 0 {
                dx.zip_map(&cache.pre_activations[l - 1], |d, z| d * leaky_relu_grad(z))
            } else {
                dx
            };
        }

        let flat = grads
            .into_iter()
            .flatten()
            .flat_map(|(dw, db)| [dw, db])
            .collect();
        (flat, g)
    }

    pub fn parameters(&self) -> Vec<&DMatrix<f32>> {
        self.layers
            .iter()
            .flat_map(|layer| [&layer.weight, &layer.bias])
            .collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut DMatrix<f32>> {
        self.layers
            .iter_mut()
            .flat_map(|layer| [&mut layer.weight, &mut layer.bias])
            .collect()
    }

    pub fn num_tensors(&self) -> usize {
        self.layers.len() * 2
    }
}

/// Mean squared error over every element
pub fn mse(prediction: &DMatrix<f32>, target: &DMatrix<f32>) -> f32 {
    let n = prediction.len().max(1) as f32;
    (prediction - target).norm_squared() / n
}

/// Gradient of [`mse`] with respect to `prediction`, scaled by `weight`
pub fn mse_grad(prediction: &DMatrix<f32>, target: &DMatrix<f32>, weight: f32) -> DMatrix<f32> {
    let n = prediction.len().max(1) as f32;
    (prediction - target) * (2.0 * weight / n)
}
