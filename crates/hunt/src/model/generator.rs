//! Reference generator: MLP from a low-resolution latent prior to
//! normalized distribution pairs on the full grid.

use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{sigmoid, silu};
use burn::tensor::module::interpolate;
use burn::tensor::ops::{InterpolateMode, InterpolateOptions};
use burn::tensor::Distribution;

use super::DensityGenerator;

/// Configuration for [`GenNet`].
///
/// The latent lives on a coarse `length_prior × length_prior` grid and is
/// upsampled to the data grid for the skip connection, so generated pairs
/// keep low-frequency structure from the prior even early in training.
#[derive(Config, Debug)]
pub struct GenNetConfig {
    /// Side length of the latent prior grid.
    pub length_prior: usize,
    /// Side length of the data grid.
    pub length: usize,
    /// Hidden layer width.
    pub width: usize,
    /// Additive floor keeping every generated cell strictly positive.
    #[config(default = 1e-6)]
    pub dust_const: f64,
    /// Weight of the upsampled-latent skip connection.
    #[config(default = 0.75)]
    pub skip_const: f64,
}

/// MLP generator with an upsampled skip connection.
///
/// ```text
/// (batch, 2 * dim_prior) latent in (0, 1)
///   → Linear → SiLU → Linear → SiLU → Linear → sigmoid
///   → + skip_const * nearest-upsample(latent)
///   → per half: x / Σx, + dust, / (1 + dim * dust)
///   → (batch, 2 * dim)
/// ```
#[derive(Module, Debug)]
pub struct GenNet<B: Backend> {
    input: Linear<B>,
    hidden: Linear<B>,
    output: Linear<B>,
    length_prior: usize,
    length: usize,
    dust_const: f64,
    skip_const: f64,
}

impl GenNetConfig {
    /// Initialize a [`GenNet`] on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> GenNet<B> {
        let dim_prior = self.length_prior * self.length_prior;
        let dim = self.length * self.length;
        GenNet {
            input: LinearConfig::new(2 * dim_prior, self.width).init(device),
            hidden: LinearConfig::new(self.width, self.width).init(device),
            output: LinearConfig::new(self.width, 2 * dim).init(device),
            length_prior: self.length_prior,
            length: self.length,
            dust_const: self.dust_const,
            skip_const: self.skip_const,
        }
    }
}

impl<B: Backend> GenNet<B> {
    /// Number of linear layers, for the hyperparameter dump.
    pub fn layer_count(&self) -> usize {
        3
    }

    /// Normalize one half to unit mass, then mix in the dust floor without
    /// breaking the sum-to-one invariant.
    fn normalize_half(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, dim] = x.dims();
        let sums = x.clone().sum_dim(1).expand([batch, dim]);
        x.div(sums)
            .add_scalar(self.dust_const)
            .div_scalar(1.0 + self.dust_const * dim as f64)
    }

    /// Nearest-neighbor upsample of one latent half from the prior grid to
    /// the data grid.
    fn upsample_half(&self, z: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = z.dims();
        let lp = self.length_prior;
        let l = self.length;
        let img = z.reshape([batch, 1, lp, lp]);
        let up = interpolate(
            img,
            [l, l],
            InterpolateOptions::new(InterpolateMode::Nearest),
        );
        up.reshape([batch, l * l])
    }
}

impl<B: Backend> DensityGenerator<B> for GenNet<B> {
    fn forward(&self, z: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, width_in] = z.dims();
        let dim_prior = self.length_prior * self.length_prior;
        let dim = self.length * self.length;
        assert_eq!(
            width_in,
            2 * dim_prior,
            "latent width {width_in} does not match 2 * dim_prior = {}",
            2 * dim_prior
        );

        let h = silu(self.input.forward(z.clone()));
        let h = silu(self.hidden.forward(h));
        let h = sigmoid(self.output.forward(h));

        let z_mu = z.clone().slice([0..batch, 0..dim_prior]);
        let z_nu = z.slice([0..batch, dim_prior..2 * dim_prior]);
        let skip = Tensor::cat(
            vec![self.upsample_half(z_mu), self.upsample_half(z_nu)],
            1,
        );

        let mixed = h.add(skip.mul_scalar(self.skip_const));
        let mu = self.normalize_half(mixed.clone().slice([0..batch, 0..dim]));
        let nu = self.normalize_half(mixed.slice([0..batch, dim..2 * dim]));
        Tensor::cat(vec![mu, nu], 1)
    }

    fn latent_width(&self) -> usize {
        2 * self.length_prior * self.length_prior
    }
}

/// Uniform latent batch in the open unit interval.
pub fn sample_latent<B: Backend>(
    batch: usize,
    width: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    Tensor::random([batch, width], Distribution::Uniform(0.0, 1.0), device)
}
