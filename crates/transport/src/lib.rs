//! Entropic optimal transport on a fixed grid.
//!
//! Everything here is built around one run-scoped configuration: a ground
//! cost matrix computed once from grid geometry and a regularization
//! parameter `eps` derived from it and held constant. On top of that sit:
//!
//! - [`SinkhornSolver`]: the batched multiplicative fixed point
//!   `u = mu ⊘ (K v)`, `v = nu ⊘ (Kᵀ u)` with Gibbs kernel `K = exp(-C/eps)`,
//!   producing dual scaling vectors and the entropic transport cost `⟨P, C⟩`.
//! - [`potential`]: gauge fixing for dual potentials. Potentials are defined
//!   up to an additive constant; the mean-centered representative is the
//!   canonical regression target.
//! - [`exact`]: a CPU f64 path that solves the unregularized problem to high
//!   accuracy for ground-truth precomputation.
//!
//! Solver inputs are expected to be strictly positive (callers add a small
//! "dust" constant during preprocessing); zero-mass cells make the
//! multiplicative updates divide by zero.

use thiserror::Error;

pub mod cost;
pub mod exact;
pub mod potential;
pub mod sinkhorn;

pub use cost::{eps_from_cost, CostMatrix};
pub use sinkhorn::{Scalings, SinkhornSolver, StopCriterion};

/// Transport error variants.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Distributions have different lengths.
    #[error("distributions have different lengths: {0} vs {1}")]
    LengthMismatch(usize, usize),

    /// A batch tensor does not have the width the solver was built for.
    #[error("batch width mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// Invalid regularization parameter.
    #[error("regularization parameter must be positive and finite, got {0}")]
    InvalidRegularization(f64),

    /// A non-finite value appeared where the math requires finite ones.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    /// The solver hit its iteration limit before reaching the tolerance.
    #[error("solver did not converge in {0} iterations")]
    NotConverged(usize),

    /// Domain error (invalid inputs for the mathematical definition).
    #[error("{0}")]
    Domain(&'static str),
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
