//! Reference predictor: MLP from distribution pairs to dual potentials.

use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::silu;

use super::PotentialPredictor;

/// Configuration for [`PredNet`].
#[derive(Config, Debug)]
pub struct PredNetConfig {
    /// Number of grid cells per distribution.
    pub dim: usize,
    /// Hidden layer width.
    pub width: usize,
    /// Number of hidden (width → width) layers between input and output.
    #[config(default = 2)]
    pub hidden_layers: usize,
}

/// MLP predictor: `(batch, 2 * dim)` pairs → `(batch, dim)` potentials.
///
/// The output is unconstrained; the training targets are mean-centered, so
/// the net learns to produce (approximately) centered potentials without an
/// explicit projection.
#[derive(Module, Debug)]
pub struct PredNet<B: Backend> {
    input: Linear<B>,
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
}

impl PredNetConfig {
    /// Initialize a [`PredNet`] on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> PredNet<B> {
        let hidden = (0..self.hidden_layers)
            .map(|_| LinearConfig::new(self.width, self.width).init(device))
            .collect();
        PredNet {
            input: LinearConfig::new(2 * self.dim, self.width).init(device),
            hidden,
            output: LinearConfig::new(self.width, self.dim).init(device),
        }
    }
}

impl<B: Backend> PredNet<B> {
    /// Number of linear layers, for the hyperparameter dump.
    pub fn layer_count(&self) -> usize {
        self.hidden.len() + 2
    }
}

impl<B: Backend> PotentialPredictor<B> for PredNet<B> {
    fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut h = silu(self.input.forward(x));
        for layer in &self.hidden {
            h = silu(layer.forward(h));
        }
        self.output.forward(h)
    }
}
