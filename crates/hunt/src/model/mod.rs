//! Network capability surface.
//!
//! The scheduler drives anything implementing these traits; the concrete
//! modules in [`generator`] and [`predictor`] are reference architectures,
//! not requirements. Both traits are implemented for every backend so the
//! same module works on the autodiff backend during training and on the
//! inner backend (via `valid()`) during evaluation.

pub mod generator;
pub mod predictor;

pub use generator::{sample_latent, GenNet, GenNetConfig};
pub use predictor::{PredNet, PredNetConfig};

use burn::prelude::*;

/// Differentiable map from latent vectors to normalized distribution pairs.
pub trait DensityGenerator<B: Backend> {
    /// `(batch, latent_width)` latents in `(0, 1)` → `(batch, 2 * dim)`
    /// concatenated pairs, each half strictly positive and summing to 1.
    fn forward(&self, z: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Width of the latent vectors this generator expects.
    fn latent_width(&self) -> usize;
}

/// Differentiable map from distribution pairs to approximate dual potentials.
pub trait PotentialPredictor<B: Backend> {
    /// `(batch, 2 * dim)` pairs → `(batch, dim)` potentials.
    fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2>;
}
