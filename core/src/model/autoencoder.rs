//! Paired autoencoder: one encoder/decoder per view, trained jointly.

use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::Rng;

use super::contrastive::{infonce_bound, mine_bound};
use super::nn::{mse, mse_grad, Mlp};
use super::{ModelMode, ModelState, Regularizer, RepresentationModel};
use crate::error::{LmiError, LmiResult};

/// Two autoencoders whose latent spaces are tied together by a regularizer.
///
/// Parameter order (for gradients, optimizer state and [`ModelState`]):
/// `encoder_x, encoder_y, decoder_x, decoder_y`, each as `[W0, b0, W1, b1]`.
#[derive(Debug, Clone)]
pub struct PairedAutoencoder {
    regularizer: Regularizer,
    alpha: f32,
    lam: f32,
    encoder_x: Mlp,
    encoder_y: Mlp,
    decoder_x: Mlp,
    decoder_y: Mlp,
    mode: ModelMode,
}

/// Forward pass bookkeeping shared by the loss and gradient paths
struct Reconstructions {
    zx: DMatrix<f32>,
    zy: DMatrix<f32>,
    x_from_zx: DMatrix<f32>,
    y_from_zy: DMatrix<f32>,
}

impl PairedAutoencoder {
    #[allow(clippy::too_many_arguments)]
    pub fn new<R: Rng + ?Sized>(
        regularizer: Regularizer,
        x_dim: usize,
        y_dim: usize,
        hidden_dim: usize,
        latent_dim: usize,
        alpha: f32,
        lam: f32,
        rng: &mut R,
    ) -> Self {
        Self {
            regularizer,
            alpha,
            lam,
            encoder_x: Mlp::new(&[x_dim, hidden_dim, latent_dim], rng),
            encoder_y: Mlp::new(&[y_dim, hidden_dim, latent_dim], rng),
            decoder_x: Mlp::new(&[latent_dim, hidden_dim, x_dim], rng),
            decoder_y: Mlp::new(&[latent_dim, hidden_dim, y_dim], rng),
            mode: ModelMode::Train,
        }
    }

    pub fn regularizer(&self) -> Regularizer {
        self.regularizer
    }

    fn networks(&self) -> [&Mlp; 4] {
        [&self.encoder_x, &self.encoder_y, &self.decoder_x, &self.decoder_y]
    }

    fn reconstruct(&self, x: &DMatrix<f32>, y: &DMatrix<f32>) -> Reconstructions {
        let zx = self.encoder_x.forward(x);
        let zy = self.encoder_y.forward(y);
        let x_from_zx = self.decoder_x.forward(&zx);
        let y_from_zy = self.decoder_y.forward(&zy);
        Reconstructions { zx, zy, x_from_zx, y_from_zy }
    }

    fn negative_pairing<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..n).collect();
        perm.shuffle(rng);
        perm
    }
}

fn accumulate(into: &mut [DMatrix<f32>], from: Vec<DMatrix<f32>>) {
    for (a, b) in into.iter_mut().zip(from) {
        *a += b;
    }
}

impl RepresentationModel for PairedAutoencoder {
    fn input_dims(&self) -> (usize, usize) {
        (self.encoder_x.input_dim(), self.encoder_y.input_dim())
    }

    fn latent_dim(&self) -> usize {
        self.encoder_x.output_dim()
    }

    fn mode(&self) -> ModelMode {
        self.mode
    }

    fn set_mode(&mut self, mode: ModelMode) {
        self.mode = mode;
    }

    fn learning_loss<R: Rng + ?Sized>(&self, x: &DMatrix<f32>, y: &DMatrix<f32>, rng: &mut R) -> f32 {
        let r = self.reconstruct(x, y);
        let self_recon = mse(&r.x_from_zx, x) + mse(&r.y_from_zy, y);

        match self.regularizer {
            Regularizer::Cross => {
                let y_from_zx = self.decoder_y.forward(&r.zx);
                let x_from_zy = self.decoder_x.forward(&r.zy);
                let cross = mse(&y_from_zx, y) + mse(&x_from_zy, x);
                self.alpha * self_recon + self.lam * cross
            }
            Regularizer::Mine => {
                let perm = Self::negative_pairing(x.nrows(), rng);
                let bound = mine_bound(&r.zx, &r.zy, &perm).bound;
                self.alpha * self_recon - self.lam * bound
            }
            Regularizer::InfoNce => {
                let bound = infonce_bound(&r.zx, &r.zy).bound;
                self.alpha * self_recon - self.lam * bound
            }
        }
    }

    fn loss_and_gradients<R: Rng + ?Sized>(
        &self,
        x: &DMatrix<f32>,
        y: &DMatrix<f32>,
        rng: &mut R,
    ) -> (f32, Vec<DMatrix<f32>>) {
        debug_assert_eq!(self.mode, ModelMode::Train, "gradients requested in eval mode");

        let (zx, enc_x_cache) = self.encoder_x.forward_cached(x);
        let (zy, enc_y_cache) = self.encoder_y.forward_cached(y);
        let (x_from_zx, dec_x_cache) = self.decoder_x.forward_cached(&zx);
        let (y_from_zy, dec_y_cache) = self.decoder_y.forward_cached(&zy);

        let self_recon = mse(&x_from_zx, x) + mse(&y_from_zy, y);
        let (mut dec_x_grads, mut d_zx) =
            self.decoder_x.backward(&dec_x_cache, &mse_grad(&x_from_zx, x, self.alpha));
        let (mut dec_y_grads, mut d_zy) =
            self.decoder_y.backward(&dec_y_cache, &mse_grad(&y_from_zy, y, self.alpha));

        let loss = match self.regularizer {
            Regularizer::Cross => {
                // decoders are shared between self and cross reconstruction
                let (y_from_zx, cross_y_cache) = self.decoder_y.forward_cached(&zx);
                let (x_from_zy, cross_x_cache) = self.decoder_x.forward_cached(&zy);
                let cross = mse(&y_from_zx, y) + mse(&x_from_zy, x);

                let (grads, d) = self
                    .decoder_y
                    .backward(&cross_y_cache, &mse_grad(&y_from_zx, y, self.lam));
                accumulate(&mut dec_y_grads, grads);
                d_zx += d;

                let (grads, d) = self
                    .decoder_x
                    .backward(&cross_x_cache, &mse_grad(&x_from_zy, x, self.lam));
                accumulate(&mut dec_x_grads, grads);
                d_zy += d;

                self.alpha * self_recon + self.lam * cross
            }
            Regularizer::Mine | Regularizer::InfoNce => {
                let out = if self.regularizer == Regularizer::Mine {
                    let perm = Self::negative_pairing(x.nrows(), rng);
                    mine_bound(&zx, &zy, &perm)
                } else {
                    infonce_bound(&zx, &zy)
                };
                d_zx -= out.d_zx * self.lam;
                d_zy -= out.d_zy * self.lam;
                self.alpha * self_recon - self.lam * out.bound
            }
        };

        let (enc_x_grads, _) = self.encoder_x.backward(&enc_x_cache, &d_zx);
        let (enc_y_grads, _) = self.encoder_y.backward(&enc_y_cache, &d_zy);

        let mut grads = enc_x_grads;
        grads.extend(enc_y_grads);
        grads.extend(dec_x_grads);
        grads.extend(dec_y_grads);
        (loss, grads)
    }

    fn parameters_mut(&mut self) -> Vec<&mut DMatrix<f32>> {
        let mut params = self.encoder_x.parameters_mut();
        params.extend(self.encoder_y.parameters_mut());
        params.extend(self.decoder_x.parameters_mut());
        params.extend(self.decoder_y.parameters_mut());
        params
    }

    fn encode(&self, x: &DMatrix<f32>, y: &DMatrix<f32>) -> (DMatrix<f32>, DMatrix<f32>) {
        (self.encoder_x.forward(x), self.encoder_y.forward(y))
    }

    fn state(&self) -> ModelState {
        let tensors = self
            .networks()
            .iter()
            .flat_map(|net| net.parameters())
            .cloned()
            .collect();
        ModelState::new(tensors)
    }

    fn load_state(&mut self, state: &ModelState) -> LmiResult<()> {
        let expected = self.networks().iter().map(|n| n.num_tensors()).sum::<usize>();
        if state.tensors.len() != expected {
            return Err(LmiError::StateMismatch(format!(
                "expected {} tensors, got {}",
                expected,
                state.tensors.len()
            )));
        }

        let mut params = self.parameters_mut();
        for (idx, (param, saved)) in params.iter_mut().zip(&state.tensors).enumerate() {
            if param.shape() != saved.shape() {
                return Err(LmiError::StateMismatch(format!(
                    "tensor {} has shape {:?}, state has {:?}",
                    idx,
                    param.shape(),
                    saved.shape()
                )));
            }
        }
        for (param, saved) in params.iter_mut().zip(&state.tensors) {
            param.copy_from(saved);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn toy_batch(n: usize) -> (DMatrix<f32>, DMatrix<f32>) {
        let x = DMatrix::from_fn(n, 3, |i, j| ((i * 3 + j) as f32 * 0.37).sin());
        let y = DMatrix::from_fn(n, 2, |i, j| x[(i, j)] * 0.8 + ((i + j) as f32 * 0.11).cos() * 0.2);
        (x, y)
    }

    fn model(regularizer: Regularizer) -> PairedAutoencoder {
        let mut rng = StdRng::seed_from_u64(11);
        PairedAutoencoder::new(regularizer, 3, 2, 6, 2, 1.0, 0.5, &mut rng)
    }

    #[test]
    fn test_gradient_shapes_follow_parameter_order() {
        let mut m = model(Regularizer::Cross);
        let (x, y) = toy_batch(8);
        let (_, grads) = m.loss_and_gradients(&x, &y, &mut StdRng::seed_from_u64(0));
        let params = m.parameters_mut();
        assert_eq!(grads.len(), params.len());
        assert_eq!(grads.len(), 16);
        for (g, p) in grads.iter().zip(params.iter()) {
            assert_eq!(g.shape(), p.shape());
        }
    }

    #[test]
    fn test_loss_paths_agree() {
        for reg in [Regularizer::Cross, Regularizer::Mine, Regularizer::InfoNce] {
            let m = model(reg);
            let (x, y) = toy_batch(8);
            let a = m.learning_loss(&x, &y, &mut StdRng::seed_from_u64(5));
            let (b, _) = m.loss_and_gradients(&x, &y, &mut StdRng::seed_from_u64(5));
            assert!((a - b).abs() < 1e-5, "{reg}: {a} vs {b}");
        }
    }

    #[test]
    fn test_small_step_along_negative_gradient_reduces_loss() {
        for reg in [Regularizer::Cross, Regularizer::Mine, Regularizer::InfoNce] {
            let mut m = model(reg);
            let (x, y) = toy_batch(16);
            let (before, grads) = m.loss_and_gradients(&x, &y, &mut StdRng::seed_from_u64(9));

            for (p, g) in m.parameters_mut().into_iter().zip(&grads) {
                *p -= g * 1e-2;
            }
            let after = m.learning_loss(&x, &y, &mut StdRng::seed_from_u64(9));
            assert!(after < before, "{reg}: {after} !< {before}");
        }
    }

    #[test]
    fn test_state_round_trip_restores_outputs() {
        let mut m = model(Regularizer::Cross);
        let (x, y) = toy_batch(4);
        let saved = m.state();
        let (zx, zy) = m.encode(&x, &y);

        for p in m.parameters_mut() {
            p.fill(0.0);
        }
        assert_ne!(m.encode(&x, &y).0, zx);

        m.load_state(&saved).unwrap();
        assert_eq!(m.encode(&x, &y), (zx, zy));
    }

    #[test]
    fn test_load_state_rejects_foreign_shapes() {
        let mut m = model(Regularizer::Cross);
        let mut rng = StdRng::seed_from_u64(1);
        let other = PairedAutoencoder::new(Regularizer::Cross, 4, 2, 6, 2, 1.0, 1.0, &mut rng);
        assert!(matches!(m.load_state(&other.state()), Err(LmiError::StateMismatch(_))));
        assert!(matches!(
            m.load_state(&ModelState::new(vec![])),
            Err(LmiError::StateMismatch(_))
        ));
    }

    #[test]
    fn test_dims() {
        let m = model(Regularizer::InfoNce);
        assert_eq!(m.input_dims(), (3, 2));
        assert_eq!(m.latent_dim(), 2);
        assert_eq!(m.regularizer(), Regularizer::InfoNce);
    }
}
