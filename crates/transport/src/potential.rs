//! Gauge fixing for dual potentials.
//!
//! Dual potentials are defined up to an additive constant per pair; only
//! differences affect the divergence value. Training targets use the
//! mean-centered representative of each gauge class.

use burn::prelude::*;

/// Canonical training target from a batch of column scalings:
/// `log v − mean(log v)` per row. Every output row has zero mean.
pub fn log_centered<B: Backend>(v: Tensor<B, 2>) -> Tensor<B, 2> {
    centered(v.log())
}

/// Re-center a batch of potentials to zero row mean.
///
/// Idempotent: applying it to an already-centered batch is a no-op.
pub fn centered<B: Backend>(phi: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, dim] = phi.dims();
    let mean = phi.clone().mean_dim(1).expand([batch, dim]);
    phi.sub(mean)
}

/// Initial column scaling for a warm start from a predicted potential.
///
/// The additive gauge constant turns into a harmless multiplicative factor
/// on the scaling vector.
pub fn warm_scaling<B: Backend>(phi: Tensor<B, 2>) -> Tensor<B, 2> {
    phi.exp()
}
