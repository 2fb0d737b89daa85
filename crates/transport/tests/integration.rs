//! End-to-end checks of the batched solver against an independent f64
//! log-domain reference implementation.

use burn::backend::ndarray::NdArray;
use burn::prelude::*;
use burn::tensor::TensorData;

use transport::{potential, CostMatrix, SinkhornSolver, StopCriterion};

type TestBackend = NdArray<f32>;

/// Reference entropic transport cost: plain f64 log-domain dual iteration,
/// run to convergence, value from the implied plan. Written independently of
/// the production solver (different domain, different contraction order).
fn reference_entropic_cost(mu: &[f64], nu: &[f64], cost: &[Vec<f64>], eps: f64, iters: usize) -> f64 {
    let n = mu.len();
    let log_a: Vec<f64> = mu.iter().map(|&x| x.ln()).collect();
    let log_b: Vec<f64> = nu.iter().map(|&x| x.ln()).collect();

    let logsumexp = |xs: &[f64]| -> f64 {
        let m = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        m + xs.iter().map(|&x| (x - m).exp()).sum::<f64>().ln()
    };

    let mut f = vec![0.0f64; n];
    let mut g = vec![0.0f64; n];
    for _ in 0..iters {
        for i in 0..n {
            let terms: Vec<f64> = (0..n).map(|j| (g[j] - cost[i][j]) / eps).collect();
            f[i] = eps * (log_a[i] - logsumexp(&terms));
        }
        for j in 0..n {
            let terms: Vec<f64> = (0..n).map(|i| (f[i] - cost[i][j]) / eps).collect();
            g[j] = eps * (log_b[j] - logsumexp(&terms));
        }
    }

    let mut value = 0.0;
    for i in 0..n {
        for j in 0..n {
            let p = ((f[i] + g[j] - cost[i][j]) / eps).exp();
            value += p * cost[i][j];
        }
    }
    value
}

#[test]
fn solver_matches_reference_on_2x2_grid() {
    let device = Default::default();
    let cost = CostMatrix::<TestBackend>::squared_grid(2, &device).unwrap();
    let solver = SinkhornSolver::new(&cost, 0.5).unwrap();

    let mu_host = [0.4f64, 0.3, 0.2, 0.1];
    let nu_host = [0.1f64, 0.2, 0.3, 0.4];
    let mu = Tensor::<TestBackend, 2>::from_data(
        TensorData::new(mu_host.iter().map(|&x| x as f32).collect::<Vec<_>>(), [1, 4]),
        &device,
    );
    let nu = Tensor::<TestBackend, 2>::from_data(
        TensorData::new(nu_host.iter().map(|&x| x as f32).collect::<Vec<_>>(), [1, 4]),
        &device,
    );

    let value: f64 = solver
        .value(mu, nu, StopCriterion::fixed(500))
        .unwrap()
        .into_scalar()
        .elem();

    let cost_host: Vec<Vec<f64>> = {
        let flat: Vec<f32> = cost.tensor().into_data().to_vec().unwrap();
        (0..4)
            .map(|i| (0..4).map(|j| flat[i * 4 + j] as f64).collect())
            .collect()
    };
    let reference = reference_entropic_cost(&mu_host, &nu_host, &cost_host, 0.5, 2000);

    assert!(
        (value - reference).abs() < 1e-3,
        "solver value {value} vs reference {reference}"
    );
}

#[test]
fn warm_start_cuts_iterations_to_tolerance() {
    let device = Default::default();
    let cost = CostMatrix::<TestBackend>::squared_grid(3, &device).unwrap();
    let solver = SinkhornSolver::new(&cost, 0.3).unwrap();

    let raw_mu = [5.0f32, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 1.0];
    let raw_nu = [1.0f32, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 5.0];
    let norm = |xs: &[f32]| -> Vec<f32> {
        let s: f32 = xs.iter().sum();
        xs.iter().map(|&x| x / s).collect()
    };
    let mu = Tensor::<TestBackend, 2>::from_data(TensorData::new(norm(&raw_mu), [1, 9]), &device);
    let nu = Tensor::<TestBackend, 2>::from_data(TensorData::new(norm(&raw_nu), [1, 9]), &device);

    let converged = solver
        .iterate(mu.clone(), nu.clone(), Tensor::ones_like(&mu), StopCriterion::fixed(3000))
        .unwrap();
    let phi = potential::log_centered(converged.v);

    let cold = solver
        .iterate(
            mu.clone(),
            nu.clone(),
            Tensor::ones_like(&mu),
            StopCriterion::with_tol(5000, 1e-6),
        )
        .unwrap();
    let warm = solver
        .iterate(
            mu,
            nu,
            potential::warm_scaling(phi),
            StopCriterion::with_tol(5000, 1e-6),
        )
        .unwrap();

    assert!(
        warm.iters <= cold.iters,
        "warm start took {} iterations, cold start {}",
        warm.iters,
        cold.iters
    );
}
