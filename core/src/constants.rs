//! Numeric constants shared by the estimator.
//!
//! Changing these changes results; reports produced with other values are
//! not comparable.

/// Adam denominator epsilon. Fixed, not user-configurable.
pub const ADAM_EPSILON: f32 = 1e-7;

/// Adam first-moment decay
pub const ADAM_BETA1: f32 = 0.9;

/// Adam second-moment decay
pub const ADAM_BETA2: f32 = 0.999;

/// Standardized inputs are clipped to `[-CLIP_BOUND, CLIP_BOUND]`
pub const CLIP_BOUND: f32 = 10.0;

/// Latent widths above this trigger a configuration warning
pub const LATENT_DIM_WARN_THRESHOLD: usize = 128;

/// Held-out fraction when a representation is fit without an explicit split
pub const REPRESENTATION_VALIDATION_SPLIT: f64 = 0.3;

/// Neighbour count for the KSG estimator
pub const DEFAULT_NEIGHBOURS: usize = 3;

/// Negative slope of the hidden-layer activation
pub const LEAKY_RELU_SLOPE: f32 = 0.01;

/// Seed used when none is given
pub const DEFAULT_SEED: u64 = 42;

/// Euler–Mascheroni constant, ψ(1) = -γ
pub const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adam_betas_in_unit_interval() {
        assert!(ADAM_BETA1 > 0.0 && ADAM_BETA1 < 1.0);
        assert!(ADAM_BETA2 > ADAM_BETA1 && ADAM_BETA2 < 1.0);
    }

    #[test]
    fn test_euler_gamma() {
        // γ = lim (H_n - ln n); H_n - ln n - 1/(2n) is already very close for n = 1000
        let n = 1000.0_f64;
        let harmonic: f64 = (1..=1000).map(|i| 1.0 / i as f64).sum();
        let approx = harmonic - n.ln() - 1.0 / (2.0 * n);
        assert!((approx - EULER_GAMMA).abs() < 1e-6);
    }
}
