//! Batched Sinkhorn fixed-point iteration.

use burn::prelude::*;

use crate::cost::CostMatrix;
use crate::{Result, TransportError};

/// How often the tolerance criterion is evaluated; checking marginals every
/// iteration doubles the per-iteration work.
const CHECK_EVERY: usize = 10;

/// Stopping rule for the fixed point.
///
/// `tol: None` reproduces the legacy fixed-iteration-count behavior and is
/// the default wherever reproducibility of earlier runs matters. The
/// tolerance path bounds the maximum marginal violation instead, for inputs
/// far from the usual operating range.
#[derive(Debug, Clone, Copy)]
pub struct StopCriterion {
    /// Hard iteration budget.
    pub max_iters: usize,
    /// Optional bound on the worst per-row marginal violation.
    pub tol: Option<f64>,
}

impl StopCriterion {
    /// Run exactly `max_iters` iterations.
    pub fn fixed(max_iters: usize) -> Self {
        Self {
            max_iters,
            tol: None,
        }
    }

    /// Stop once the worst marginal violation drops below `tol`, or error
    /// out after `max_iters`.
    pub fn with_tol(max_iters: usize, tol: f64) -> Self {
        Self {
            max_iters,
            tol: Some(tol),
        }
    }
}

/// Dual scaling vectors for a batch of distribution pairs, plus the number
/// of iterations that produced them.
#[derive(Debug, Clone)]
pub struct Scalings<B: Backend> {
    /// Row scalings, `(batch, dim)`.
    pub u: Tensor<B, 2>,
    /// Column scalings, `(batch, dim)`.
    pub v: Tensor<B, 2>,
    /// Iterations actually run.
    pub iters: usize,
}

/// Batched entropic-OT solver over a fixed cost matrix and regularization.
///
/// The Gibbs kernel `K = exp(-C/eps)` and the cost-weighted kernel `K ⊙ C`
/// are precomputed at construction; `eps` is fixed for the solver's
/// lifetime. All batch operations treat rows independently, so a single
/// solver instance serves training batches and test sets alike.
pub struct SinkhornSolver<B: Backend> {
    kernel: Tensor<B, 2>,
    kernel_t: Tensor<B, 2>,
    kernel_cost: Tensor<B, 2>,
    dim: usize,
    eps: f64,
}

impl<B: Backend> SinkhornSolver<B> {
    /// Build a solver for the given cost matrix and regularization.
    pub fn new(cost: &CostMatrix<B>, eps: f64) -> Result<Self> {
        if !(eps > 0.0 && eps.is_finite()) {
            return Err(TransportError::InvalidRegularization(eps));
        }
        let c = cost.tensor();
        let kernel = c.clone().mul_scalar(-1.0 / eps).exp();
        let kernel_cost = kernel.clone().mul(c);
        Ok(Self {
            kernel_t: kernel.clone().transpose(),
            kernel,
            kernel_cost,
            dim: cost.dim(),
            eps,
        })
    }

    /// Width of the distributions this solver accepts.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The run's regularization constant.
    pub fn eps(&self) -> f64 {
        self.eps
    }

    fn check_batch(&self, t: &Tensor<B, 2>, what: &'static str) -> Result<()> {
        let [_, width] = t.dims();
        if width != self.dim {
            return Err(TransportError::ShapeMismatch {
                expected: self.dim,
                got: width,
            });
        }
        // A NaN or infinity anywhere poisons the sum.
        let probe: f64 = t.clone().sum().into_scalar().elem();
        if !probe.is_finite() {
            return Err(TransportError::NonFinite(what));
        }
        Ok(())
    }

    /// One half update: `u = mu ⊘ (K v)`.
    ///
    /// Used to complete a predicted column scaling into a full dual pair;
    /// after this step the row marginal constraint holds exactly.
    pub fn half_step(&self, mu: Tensor<B, 2>, v: Tensor<B, 2>) -> Tensor<B, 2> {
        mu.div(v.matmul(self.kernel_t.clone()))
    }

    /// Run the multiplicative fixed point from the initial column scaling
    /// `v0` (ones for a cold start, `exp(potential)` for a warm start).
    ///
    /// Distributions must be strictly positive; rows are treated
    /// independently and the tolerance (when set) applies to the worst row.
    pub fn iterate(
        &self,
        mu: Tensor<B, 2>,
        nu: Tensor<B, 2>,
        v0: Tensor<B, 2>,
        stop: StopCriterion,
    ) -> Result<Scalings<B>> {
        self.check_batch(&mu, "source distribution")?;
        self.check_batch(&nu, "target distribution")?;
        self.check_batch(&v0, "initial scaling")?;
        let min_mu: f64 = mu.clone().min().into_scalar().elem();
        let min_nu: f64 = nu.clone().min().into_scalar().elem();
        if !(min_mu > 0.0 && min_nu > 0.0) {
            return Err(TransportError::Domain(
                "sinkhorn requires strictly positive masses",
            ));
        }

        let mut u = mu.clone();
        let mut v = v0;
        let mut iters = 0;
        for i in 0..stop.max_iters {
            u = mu.clone().div(v.clone().matmul(self.kernel_t.clone()));
            v = nu.clone().div(u.clone().matmul(self.kernel.clone()));
            iters = i + 1;

            if let Some(tol) = stop.tol {
                if iters % CHECK_EVERY == 0 || iters == stop.max_iters {
                    let err = self.marginal_error(
                        mu.clone(),
                        nu.clone(),
                        u.clone(),
                        v.clone(),
                    );
                    let worst: f64 = err.max().into_scalar().elem();
                    if !worst.is_finite() {
                        return Err(TransportError::NonFinite("marginal residual"));
                    }
                    if worst < tol {
                        return Ok(Scalings { u, v, iters });
                    }
                }
            }
        }

        if stop.tol.is_some() {
            return Err(TransportError::NotConverged(stop.max_iters));
        }
        let probe: f64 = v.clone().sum().into_scalar().elem();
        if !probe.is_finite() {
            return Err(TransportError::NonFinite("scaling vector"));
        }
        Ok(Scalings { u, v, iters })
    }

    /// Entropic transport cost `⟨P, C⟩` per row, with the plan
    /// `P = diag(u) K diag(v)` implied by the scalings.
    pub fn value_of(&self, scalings: &Scalings<B>) -> Tensor<B, 1> {
        // Σ_ij u_i K_ij C_ij v_j, contracted as (u · (K ⊙ C)) ⊙ v.
        let m = scalings.u.clone().matmul(self.kernel_cost.clone());
        m.mul(scalings.v.clone()).sum_dim(1).squeeze(1)
    }

    /// Entropic transport cost per row from a cold start.
    pub fn value(
        &self,
        mu: Tensor<B, 2>,
        nu: Tensor<B, 2>,
        stop: StopCriterion,
    ) -> Result<Tensor<B, 1>> {
        let v0 = Tensor::ones_like(&mu);
        let scalings = self.iterate(mu, nu, v0, stop)?;
        let value = self.value_of(&scalings);
        let probe: f64 = value.clone().sum().into_scalar().elem();
        if !probe.is_finite() {
            return Err(TransportError::NonFinite("divergence value"));
        }
        Ok(value)
    }

    /// Mean absolute violation of both marginal constraints per row:
    /// `0.5 * (mean|u ⊙ (K v) − mu| + mean|v ⊙ (Kᵀ u) − nu|)`.
    pub fn marginal_error(
        &self,
        mu: Tensor<B, 2>,
        nu: Tensor<B, 2>,
        u: Tensor<B, 2>,
        v: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        let row = u.clone().mul(v.clone().matmul(self.kernel_t.clone()));
        let col = v.mul(u.matmul(self.kernel.clone()));
        let err = row.sub(mu).abs().mean_dim(1) + col.sub(nu).abs().mean_dim(1);
        err.mul_scalar(0.5).squeeze(1)
    }
}
