//! Coupled generator/predictor training for Sinkhorn potential prediction.
//!
//! A Predictor regresses distribution pairs onto the mean-centered dual
//! potential of their entropic transport problem; a Generator synthesizes
//! training pairs from a latent prior, by default adversarially (it seeks
//! pairs the Predictor handles worst). The scheduler that alternates their
//! updates is "the hunt": bootstrapped batch pools, gradient accumulation,
//! geometrically decaying learning rates, periodic evaluation against
//! precomputed ground truth, and checkpointing.

use thiserror::Error;

pub mod eval;
pub mod model;
pub mod training;

/// Error taxonomy for training runs.
///
/// Configuration and data problems surface before any training begins;
/// a non-finite value during a step is fatal — there is no recovery
/// mechanism beyond learning-rate decay, which mitigates but cannot repair
/// corrupted parameters.
#[derive(Debug, Error)]
pub enum HuntError {
    /// Invalid hyperparameter or hyperparameter combination.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed, empty, or mis-shaped input data.
    #[error("data error: {0}")]
    Data(String),

    /// Non-finite value in a loss, gradient source, or solver output.
    #[error("non-finite {0} at loop {1}")]
    NonFinite(&'static str, usize),

    /// Requested accelerator unavailable.
    #[error("device error: {0}")]
    Device(String),

    /// Checkpoint persistence or restoration failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Solver-level failure.
    #[error(transparent)]
    Transport(#[from] transport::TransportError),
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, HuntError>;
