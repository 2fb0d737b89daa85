//! Time series collected during the hunt.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A scalar sample tagged with the outer loop that produced it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LossPoint {
    pub loop_idx: usize,
    pub loss: f64,
}

/// Warm- and cold-start outcomes of the same budgeted solve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WarmStart {
    /// Metric after the budget, starting from the predicted potential.
    pub warm: f64,
    /// Metric after the budget, starting from a uniform scaling.
    pub cold: f64,
}

impl WarmStart {
    /// Positive when the warm start helped.
    pub fn benefit(&self) -> f64 {
        self.cold - self.warm
    }
}

/// Scores for one test set at one evaluation point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EvalPoint {
    pub loop_idx: usize,
    /// Predictor loss against the precomputed targets.
    pub loss: f64,
    /// Mean relative error of the implied divergence vs entropic ground truth.
    pub rel_err_sink: f64,
    /// Mean relative error of the implied divergence vs exact ground truth.
    pub rel_err_exact: f64,
    /// Mean marginal-constraint violation of the predicted potential.
    pub mean_constraint_violation: f64,
    /// Relative error vs exact ground truth after the warm-start budget.
    pub warmstart_exact: WarmStart,
    /// Marginal violation after the warm-start budget.
    pub warmstart_mcv: WarmStart,
}

/// Everything the hunt returns to the caller: per-step training losses and
/// per-test-set evaluation series, plus step accounting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HuntHistory {
    /// One point per completed predictor optimizer step.
    pub train_loss: Vec<LossPoint>,
    /// One point per completed generator optimizer step.
    pub gen_loss: Vec<LossPoint>,
    /// Evaluation series keyed by test-set name.
    pub eval: BTreeMap<String, Vec<EvalPoint>>,
    /// Completed predictor optimizer steps.
    pub pred_steps: u64,
    /// Completed generator optimizer steps.
    pub gen_steps: u64,
}

impl HuntHistory {
    /// Append an evaluation point for a named test set.
    pub fn push_eval(&mut self, set: &str, point: EvalPoint) {
        self.eval.entry(set.to_string()).or_default().push(point);
    }
}
