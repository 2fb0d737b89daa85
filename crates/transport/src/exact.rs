//! Near-exact unregularized transport cost.
//!
//! Ground-truth precomputation needs the value of the plain (unregularized)
//! transport problem next to the entropic one. This module solves it on the
//! CPU in f64: log-domain dual updates with an annealed regularization
//! schedule, followed by rounding of the final plan onto the transport
//! polytope so the reported `⟨P, C⟩` comes from a feasible plan and upper
//! bounds the optimum by at most the annealing floor. Runs only in the
//! one-time precompute phase, never inside the training loop.

use ndarray::{Array1, Array2};

use crate::{Result, TransportError};

/// Annealing and iteration controls for [`exact_cost_with`].
#[derive(Debug, Clone, Copy)]
pub struct ExactOptions {
    /// Starting regularization, as a fraction of the largest cost.
    pub eps_start_frac: f64,
    /// Final regularization, as a fraction of the largest cost.
    pub eps_final_frac: f64,
    /// Dual update sweeps per annealing stage.
    pub inner_iters: usize,
}

impl Default for ExactOptions {
    fn default() -> Self {
        Self {
            eps_start_frac: 0.1,
            eps_final_frac: 1e-4,
            inner_iters: 500,
        }
    }
}

/// Numerically stable log-sum-exp over an indexable family.
fn logsumexp_by(len: usize, mut f: impl FnMut(usize) -> f64) -> f64 {
    if len == 0 {
        return f64::NEG_INFINITY;
    }
    let mut max_val = f64::NEG_INFINITY;
    for i in 0..len {
        max_val = max_val.max(f(i));
    }
    if !max_val.is_finite() {
        return max_val;
    }
    let mut sum_exp = 0.0;
    for i in 0..len {
        sum_exp += (f(i) - max_val).exp();
    }
    max_val + sum_exp.ln()
}

/// Unregularized transport cost with default options.
pub fn exact_cost(mu: &Array1<f64>, nu: &Array1<f64>, cost: &Array2<f64>) -> Result<f64> {
    exact_cost_with(mu, nu, cost, &ExactOptions::default())
}

/// Unregularized transport cost `⟨P, C⟩` for one distribution pair.
///
/// Both inputs are normalized internally; entries must be nonnegative with
/// positive total mass.
pub fn exact_cost_with(
    mu: &Array1<f64>,
    nu: &Array1<f64>,
    cost: &Array2<f64>,
    opts: &ExactOptions,
) -> Result<f64> {
    let n = mu.len();
    if nu.len() != n {
        return Err(TransportError::LengthMismatch(n, nu.len()));
    }
    if cost.nrows() != n || cost.ncols() != n {
        return Err(TransportError::ShapeMismatch {
            expected: n,
            got: cost.nrows().max(cost.ncols()),
        });
    }
    if mu.iter().chain(nu.iter()).any(|&x| x < 0.0 || !x.is_finite()) {
        return Err(TransportError::Domain(
            "transport requires nonnegative finite masses",
        ));
    }
    let (mu_sum, nu_sum) = (mu.sum(), nu.sum());
    if mu_sum <= 0.0 || nu_sum <= 0.0 {
        return Err(TransportError::Domain(
            "transport requires positive total mass",
        ));
    }
    if opts.eps_start_frac <= 0.0 || opts.eps_final_frac <= 0.0 || opts.inner_iters == 0 {
        return Err(TransportError::Domain("invalid annealing options"));
    }

    let a = mu.mapv(|x| x / mu_sum);
    let b = nu.mapv(|x| x / nu_sum);
    let log_a = a.mapv(|x| if x > 0.0 { x.ln() } else { f64::NEG_INFINITY });
    let log_b = b.mapv(|x| if x > 0.0 { x.ln() } else { f64::NEG_INFINITY });

    let cost_max = cost.iter().cloned().fold(0.0f64, f64::max);
    if !cost_max.is_finite() {
        return Err(TransportError::NonFinite("cost matrix"));
    }
    if cost_max == 0.0 {
        // Any feasible plan is optimal with cost zero.
        return Ok(0.0);
    }

    // Anneal eps downward; the duals carry over as warm starts across stages.
    let eps_start = cost_max * opts.eps_start_frac;
    let eps_final = cost_max * opts.eps_final_frac.min(opts.eps_start_frac);
    let mut stages = Vec::new();
    let mut eps_cur = eps_start;
    while eps_cur > eps_final * 1.5 {
        stages.push(eps_cur);
        eps_cur *= 0.5;
    }
    stages.push(eps_final);

    let mut f = Array1::<f64>::zeros(n);
    let mut g = Array1::<f64>::zeros(n);
    for &eps in &stages {
        for _ in 0..opts.inner_iters {
            for i in 0..n {
                let lse = logsumexp_by(n, |j| (g[j] - cost[[i, j]]) / eps);
                f[i] = if log_a[i] == f64::NEG_INFINITY {
                    f64::NEG_INFINITY
                } else {
                    eps * (log_a[i] - lse)
                };
            }
            for j in 0..n {
                let lse = logsumexp_by(n, |i| (f[i] - cost[[i, j]]) / eps);
                g[j] = if log_b[j] == f64::NEG_INFINITY {
                    f64::NEG_INFINITY
                } else {
                    eps * (log_b[j] - lse)
                };
            }
        }
    }

    // Plan at the final stage, then round it onto the transport polytope:
    // scale rows and columns down to their marginals, and distribute the
    // leftover mass proportionally to the residuals.
    let eps = eps_final;
    let mut plan = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            let log_p = if f[i] == f64::NEG_INFINITY || g[j] == f64::NEG_INFINITY {
                f64::NEG_INFINITY
            } else {
                (f[i] + g[j] - cost[[i, j]]) / eps
            };
            plan[[i, j]] = log_p.exp();
        }
    }

    for i in 0..n {
        let row_sum: f64 = plan.row(i).sum();
        if row_sum > a[i] && row_sum > 0.0 {
            let scale = a[i] / row_sum;
            plan.row_mut(i).mapv_inplace(|p| p * scale);
        }
    }
    for j in 0..n {
        let col_sum: f64 = plan.column(j).sum();
        if col_sum > b[j] && col_sum > 0.0 {
            let scale = b[j] / col_sum;
            plan.column_mut(j).mapv_inplace(|p| p * scale);
        }
    }
    let row_err: Array1<f64> = Array1::from_iter((0..n).map(|i| a[i] - plan.row(i).sum()));
    let col_err: Array1<f64> = Array1::from_iter((0..n).map(|j| b[j] - plan.column(j).sum()));
    let residual: f64 = row_err.iter().map(|e| e.max(0.0)).sum();
    if residual > 0.0 {
        for i in 0..n {
            for j in 0..n {
                plan[[i, j]] += row_err[i].max(0.0) * col_err[j].max(0.0) / residual;
            }
        }
    }

    let mut value = 0.0;
    for i in 0..n {
        for j in 0..n {
            value += plan[[i, j]] * cost[[i, j]];
        }
    }
    if !value.is_finite() {
        return Err(TransportError::NonFinite("exact transport cost"));
    }
    Ok(value)
}
