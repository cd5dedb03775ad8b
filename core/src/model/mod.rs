//! Representation models
//!
//! A representation model maps paired observations `(x, y)` to latent codes
//! `(zx, zy)` and exposes a differentiable training objective. The training
//! loop only talks to the [`RepresentationModel`] trait; [`Regularizer`]
//! selects which objective the [`PairedAutoencoder`] optimizes.
//!
//! # Regularizers
//!
//! - **Cross** (default): each latent code must also reconstruct the *other* view
//! - **Mine**: reconstruction plus a Donsker–Varadhan MI lower bound
//! - **InfoNce**: reconstruction plus a contrastive InfoNCE bound

mod autoencoder;
pub mod contrastive;
pub mod nn;

pub use autoencoder::PairedAutoencoder;

use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LmiResult;

/// Whether the model is being optimized or only evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelMode {
    Train,
    Eval,
}

/// Owned snapshot of every trainable tensor, in parameter order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub tensors: Vec<DMatrix<f32>>,
}

impl ModelState {
    pub fn new(tensors: Vec<DMatrix<f32>>) -> Self {
        Self { tensors }
    }

    /// Total number of scalar parameters
    pub fn num_parameters(&self) -> usize {
        self.tensors.iter().map(|t| t.len()).sum()
    }
}

/// Interface the training loop needs from a model
pub trait RepresentationModel {
    /// Widths of the `x` and `y` inputs
    fn input_dims(&self) -> (usize, usize);

    fn latent_dim(&self) -> usize;

    fn mode(&self) -> ModelMode;

    fn set_mode(&mut self, mode: ModelMode);

    /// Objective on one batch, no gradients
    fn learning_loss<R: Rng + ?Sized>(&self, x: &DMatrix<f32>, y: &DMatrix<f32>, rng: &mut R) -> f32;

    /// Objective on one batch plus gradients aligned with [`Self::parameters_mut`]
    fn loss_and_gradients<R: Rng + ?Sized>(
        &self,
        x: &DMatrix<f32>,
        y: &DMatrix<f32>,
        rng: &mut R,
    ) -> (f32, Vec<DMatrix<f32>>);

    fn parameters_mut(&mut self) -> Vec<&mut DMatrix<f32>>;

    /// Latent codes for every row of `x` and `y`
    fn encode(&self, x: &DMatrix<f32>, y: &DMatrix<f32>) -> (DMatrix<f32>, DMatrix<f32>);

    fn state(&self) -> ModelState;

    fn load_state(&mut self, state: &ModelState) -> LmiResult<()>;
}

/// Objective tying the two latent spaces together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regularizer {
    /// Cross-reconstruction
    Cross,
    /// MINE (Donsker–Varadhan bound)
    Mine,
    /// InfoNCE contrastive bound
    InfoNce,
}

impl Default for Regularizer {
    fn default() -> Self {
        Regularizer::Cross
    }
}

impl fmt::Display for Regularizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regularizer::Cross => write!(f, "cross"),
            Regularizer::Mine => write!(f, "mine"),
            Regularizer::InfoNce => write!(f, "infonce"),
        }
    }
}

impl FromStr for Regularizer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cross" | "aecross" | "ae-cross" => Ok(Regularizer::Cross),
            "mine" | "aemine" | "ae-mine" => Ok(Regularizer::Mine),
            "infonce" | "aeinfonce" | "ae-infonce" | "nce" => Ok(Regularizer::InfoNce),
            _ => Err(format!("Unknown regularizer: {}. Use: cross, mine, infonce", s)),
        }
    }
}

impl Regularizer {
    /// All variants, in display order
    pub const ALL: [Regularizer; 3] = [Regularizer::Cross, Regularizer::Mine, Regularizer::InfoNce];

    /// Instantiate the autoencoder for this regularizer
    #[allow(clippy::too_many_arguments)]
    pub fn build<R: Rng + ?Sized>(
        self,
        x_dim: usize,
        y_dim: usize,
        hidden_dim: usize,
        latent_dim: usize,
        alpha: f32,
        lam: f32,
        rng: &mut R,
    ) -> PairedAutoencoder {
        PairedAutoencoder::new(self, x_dim, y_dim, hidden_dim, latent_dim, alpha, lam, rng)
    }
}
