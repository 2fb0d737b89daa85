//! Ground-truth precomputation and periodic scoring of the predictor.
//!
//! Precomputation runs the solver near convergence once per test set,
//! outside the hot loop, and additionally solves the unregularized problem
//! per pair on the CPU. Evaluation is read-only: callers pass the `valid()`
//! form of the predictor, so no training state or optimizer momentum can be
//! touched.

use burn::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array1, Array2};

use transport::{exact, potential, CostMatrix, Scalings, SinkhornSolver, StopCriterion};

use crate::model::PotentialPredictor;
use crate::training::loss::hilbert_loss;
use crate::training::metrics::{EvalPoint, WarmStart};
use crate::{HuntError, Result};

/// Iteration budget for ground-truth precomputation (near convergence).
pub const GROUND_TRUTH_ITERS: usize = 2000;

/// Iteration budget for the warm/cold comparison solves.
pub const WARM_START_ITERS: usize = 10;

/// A named held-out test set with precomputed ground truth.
pub struct TestRecord<B: Backend> {
    pub name: String,
    /// Distribution pairs, `(n, 2 * dim)`.
    pub pairs: Tensor<B, 2>,
    /// Entropic divergence per pair.
    pub sink: Tensor<B, 1>,
    /// Exact divergence per pair.
    pub exact: Tensor<B, 1>,
    /// Centered target potentials, `(n, dim)`.
    pub targets: Tensor<B, 2>,
}

/// Precomputed ground truth for every test set, plus the solver used to
/// score predictions against it.
pub struct EvaluationHarness<B: Backend> {
    solver: SinkhornSolver<B>,
    records: Vec<TestRecord<B>>,
    dim: usize,
    warm_iters: usize,
}

impl<B: Backend> EvaluationHarness<B> {
    /// Solve every test pair to (near) convergence and cache divergences and
    /// targets. The exact divergence additionally runs the CPU f64 solver
    /// per pair; this is the dominant one-time cost of a run.
    pub fn precompute(
        cost: &CostMatrix<B>,
        eps: f64,
        sets: Vec<(String, Tensor<B, 2>)>,
        stop: StopCriterion,
    ) -> Result<Self> {
        let solver = SinkhornSolver::new(cost, eps)?;
        let dim = cost.dim();
        let cost_host = cost_to_host(cost)?;

        let total_rows: usize = sets.iter().map(|(_, t)| t.dims()[0]).sum();
        let bar = ProgressBar::new(total_rows as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) Precomputing ground truth")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut records = Vec::with_capacity(sets.len());
        for (name, pairs) in sets {
            let [rows, width] = pairs.dims();
            if rows == 0 {
                return Err(HuntError::Data(format!("test set '{name}' is empty")));
            }
            if width != 2 * dim {
                return Err(HuntError::Data(format!(
                    "test set '{name}' has row width {width}, expected {}",
                    2 * dim
                )));
            }
            let min: f64 = pairs.clone().min().into_scalar().elem();
            if !(min > 0.0) {
                return Err(HuntError::Data(format!(
                    "test set '{name}' contains non-positive mass; preprocessing must add dust"
                )));
            }

            let mu = pairs.clone().slice([0..rows, 0..dim]);
            let nu = pairs.clone().slice([0..rows, dim..2 * dim]);

            let scalings = solver.iterate(mu.clone(), nu.clone(), Tensor::ones_like(&mu), stop)?;
            let targets = potential::log_centered(scalings.v.clone());
            let probe: f64 = targets.clone().sum().into_scalar().elem();
            if !probe.is_finite() {
                return Err(HuntError::Data(format!(
                    "non-finite ground-truth targets for test set '{name}'"
                )));
            }
            let sink = solver.value_of(&scalings);

            let mu_host = rows_to_host(&mu)?;
            let nu_host = rows_to_host(&nu)?;
            let mut exact_vals = Vec::with_capacity(rows);
            for (mu_row, nu_row) in mu_host.iter().zip(nu_host.iter()) {
                let value = exact::exact_cost(mu_row, nu_row, &cost_host)?;
                exact_vals.push(value as f32);
                bar.inc(1);
            }
            let exact = Tensor::<B, 1>::from_data(
                burn::tensor::TensorData::new(exact_vals, [rows]),
                &pairs.device(),
            );

            tracing::info!(set = %name, rows, "Precomputed test-set ground truth");
            records.push(TestRecord {
                name,
                pairs,
                sink,
                exact,
                targets,
            });
        }
        bar.finish_with_message("done");

        Ok(Self {
            solver,
            records,
            dim,
            warm_iters: WARM_START_ITERS,
        })
    }

    /// Override the warm-start comparison budget.
    pub fn with_warm_iters(mut self, warm_iters: usize) -> Self {
        self.warm_iters = warm_iters;
        self
    }

    /// Names of the held-out sets, in precomputation order.
    pub fn set_names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Score the predictor on every test set.
    ///
    /// Failures are isolated per set: one bad set yields an `Err` entry and
    /// the remaining sets still evaluate.
    pub fn evaluate<P: PotentialPredictor<B>>(
        &self,
        predictor: &P,
        loop_idx: usize,
    ) -> Vec<(String, Result<EvalPoint>)> {
        self.records
            .iter()
            .map(|record| {
                (
                    record.name.clone(),
                    self.evaluate_record(predictor, record, loop_idx),
                )
            })
            .collect()
    }

    fn evaluate_record<P: PotentialPredictor<B>>(
        &self,
        predictor: &P,
        record: &TestRecord<B>,
        loop_idx: usize,
    ) -> Result<EvalPoint> {
        let [rows, _] = record.pairs.dims();
        let mu = record.pairs.clone().slice([0..rows, 0..self.dim]);
        let nu = record.pairs.clone().slice([0..rows, self.dim..2 * self.dim]);

        let prediction = predictor.forward(record.pairs.clone());
        let loss: f64 = hilbert_loss(prediction.clone(), record.targets.clone())
            .into_scalar()
            .elem();
        if !loss.is_finite() {
            return Err(HuntError::NonFinite("test loss", loop_idx));
        }

        // Complete the predicted potential into a dual pair with one half
        // update; the row marginal then holds exactly and the residual
        // concentrates on the columns.
        let v_pred = potential::warm_scaling(potential::centered(prediction));
        let u = self.solver.half_step(mu.clone(), v_pred.clone());
        let implied = Scalings {
            u: u.clone(),
            v: v_pred.clone(),
            iters: 1,
        };
        let value_pred = self.solver.value_of(&implied);

        let rel_err_sink = mean_rel_err(&value_pred, &record.sink);
        let rel_err_exact = mean_rel_err(&value_pred, &record.exact);
        let mcv: f64 = self
            .solver
            .marginal_error(mu.clone(), nu.clone(), u, v_pred.clone())
            .mean()
            .into_scalar()
            .elem();
        if !(rel_err_sink.is_finite() && rel_err_exact.is_finite() && mcv.is_finite()) {
            return Err(HuntError::NonFinite("evaluation metric", loop_idx));
        }

        let warm = self.budgeted_solve(&mu, &nu, v_pred, record)?;
        let cold = self.budgeted_solve(&mu, &nu, Tensor::ones_like(&mu), record)?;

        Ok(EvalPoint {
            loop_idx,
            loss,
            rel_err_sink,
            rel_err_exact,
            mean_constraint_violation: mcv,
            warmstart_exact: WarmStart {
                warm: warm.0,
                cold: cold.0,
            },
            warmstart_mcv: WarmStart {
                warm: warm.1,
                cold: cold.1,
            },
        })
    }

    /// Run the solver for the warm-start budget from the given init and
    /// report (relative error vs exact, marginal violation).
    fn budgeted_solve(
        &self,
        mu: &Tensor<B, 2>,
        nu: &Tensor<B, 2>,
        v0: Tensor<B, 2>,
        record: &TestRecord<B>,
    ) -> Result<(f64, f64)> {
        let scalings = self.solver.iterate(
            mu.clone(),
            nu.clone(),
            v0,
            StopCriterion::fixed(self.warm_iters),
        )?;
        let value = self.solver.value_of(&scalings);
        let rel_err = mean_rel_err(&value, &record.exact);
        let mcv: f64 = self
            .solver
            .marginal_error(mu.clone(), nu.clone(), scalings.u, scalings.v)
            .mean()
            .into_scalar()
            .elem();
        Ok((rel_err, mcv))
    }
}

/// Mean of `|a − b| / b` over a batch of scalars.
fn mean_rel_err<B: Backend>(a: &Tensor<B, 1>, b: &Tensor<B, 1>) -> f64 {
    a.clone()
        .sub(b.clone())
        .abs()
        .div(b.clone())
        .mean()
        .into_scalar()
        .elem()
}

fn cost_to_host<B: Backend>(cost: &CostMatrix<B>) -> Result<Array2<f64>> {
    let dim = cost.dim();
    let flat: Vec<f32> = cost
        .tensor()
        .into_data()
        .to_vec()
        .map_err(|e| HuntError::Data(format!("failed to read cost matrix back: {e:?}")))?;
    let flat: Vec<f64> = flat.into_iter().map(|x| x as f64).collect();
    Array2::from_shape_vec((dim, dim), flat)
        .map_err(|e| HuntError::Data(format!("cost matrix reshape failed: {e}")))
}

fn rows_to_host<B: Backend>(t: &Tensor<B, 2>) -> Result<Vec<Array1<f64>>> {
    let [rows, width] = t.dims();
    let flat: Vec<f32> = t
        .clone()
        .into_data()
        .to_vec()
        .map_err(|e| HuntError::Data(format!("failed to read batch back: {e:?}")))?;
    Ok((0..rows)
        .map(|r| {
            Array1::from_iter(
                flat[r * width..(r + 1) * width]
                    .iter()
                    .map(|&x| x as f64),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PredNet, PredNetConfig};
    use burn::backend::ndarray::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    fn tiny_set(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2> {
        // Two pairs on a 2×2 grid, strictly positive, halves summing to 1.
        let rows = vec![
            0.4f32, 0.3, 0.2, 0.1, 0.1, 0.2, 0.3, 0.4, //
            0.25, 0.25, 0.25, 0.25, 0.4, 0.2, 0.2, 0.2,
        ];
        Tensor::from_data(TensorData::new(rows, [2, 8]), device)
    }

    fn harness(device: &<TestBackend as Backend>::Device) -> EvaluationHarness<TestBackend> {
        let cost = CostMatrix::<TestBackend>::squared_grid(2, device).unwrap();
        EvaluationHarness::precompute(
            &cost,
            0.5,
            vec![("tiny".to_string(), tiny_set(device))],
            StopCriterion::fixed(500),
        )
        .unwrap()
        .with_warm_iters(5)
    }

    #[test]
    fn test_precompute_targets_are_centered() {
        let device = Default::default();
        let h = harness(&device);
        let means: Vec<f32> = h.records[0]
            .targets
            .clone()
            .mean_dim(1)
            .into_data()
            .to_vec()
            .unwrap();
        for m in means {
            assert!(m.abs() < 1e-5, "target row mean should be zero, got {m}");
        }
    }

    #[test]
    fn test_entropic_value_at_least_exact() {
        let device = Default::default();
        let h = harness(&device);
        let sink: Vec<f32> = h.records[0].sink.clone().into_data().to_vec().unwrap();
        let exact: Vec<f32> = h.records[0].exact.clone().into_data().to_vec().unwrap();
        for (s, e) in sink.iter().zip(exact.iter()) {
            assert!(
                s - e > -5e-3,
                "entropic value {s} fell below exact value {e}"
            );
        }
    }

    #[test]
    fn test_evaluate_reports_every_set() {
        let device = Default::default();
        let h = harness(&device);
        let predictor = PredNetConfig::new(4, 16).init::<TestBackend>(&device);
        let results = h.evaluate(&predictor, 0);
        assert_eq!(results.len(), 1);
        let (name, point) = &results[0];
        assert_eq!(name, "tiny");
        let point = point.as_ref().unwrap();
        assert!(point.loss.is_finite());
        assert!(point.mean_constraint_violation >= 0.0);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let device = Default::default();
        let h = harness(&device);
        let predictor: PredNet<TestBackend> = PredNetConfig::new(4, 16).init(&device);
        let a = h.evaluate(&predictor, 3);
        let b = h.evaluate(&predictor, 3);
        let pa = a[0].1.as_ref().unwrap();
        let pb = b[0].1.as_ref().unwrap();
        assert_eq!(pa.loss, pb.loss, "evaluation must not mutate state");
        assert_eq!(pa.rel_err_sink, pb.rel_err_sink);
    }

    #[test]
    fn test_precompute_rejects_bad_width() {
        let device = Default::default();
        let cost = CostMatrix::<TestBackend>::squared_grid(2, &device).unwrap();
        let bad = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.5f32; 6], [1, 6]),
            &device,
        );
        let res = EvaluationHarness::precompute(
            &cost,
            0.5,
            vec![("bad".to_string(), bad)],
            StopCriterion::fixed(10),
        );
        assert!(matches!(res, Err(HuntError::Data(_))));
    }

    #[test]
    fn test_precompute_rejects_zero_mass() {
        let device = Default::default();
        let cost = CostMatrix::<TestBackend>::squared_grid(2, &device).unwrap();
        let bad = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.5f32, 0.5, 0.0, 0.0, 0.25, 0.25, 0.25, 0.25], [1, 8]),
            &device,
        );
        let res = EvaluationHarness::precompute(
            &cost,
            0.5,
            vec![("bad".to_string(), bad)],
            StopCriterion::fixed(10),
        );
        assert!(matches!(res, Err(HuntError::Data(_))));
    }
}
