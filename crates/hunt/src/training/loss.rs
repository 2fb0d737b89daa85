//! Gauge-invariant regression loss and the generator objective capability.

use burn::prelude::*;

/// Hilbert projective seminorm of the prediction error, averaged over the
/// batch: `mean_b(max_i d_bi − min_i d_bi)` with `d = prediction − target`.
///
/// Adding a constant to any row of either argument leaves the loss
/// unchanged — the same additive gauge freedom the dual potentials carry, so
/// the predictor is never penalized for an irrelevant offset.
pub fn hilbert_loss<B: Backend>(
    prediction: Tensor<B, 2>,
    target: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let diff = prediction.sub(target);
    let spread = diff.clone().max_dim(1).sub(diff.min_dim(1));
    spread.squeeze::<1>(1).mean()
}

/// Training objective for the generator.
///
/// The scheduler treats this as a capability: any implementation mapping
/// (prediction, target) to a scalar loss tensor can drive the generator
/// update, so the sign and form of the objective are a deployment decision
/// rather than something baked into the loop.
pub trait GenObjective<B: Backend> {
    /// Scalar loss for one batch; the generator is updated to minimize it.
    fn objective(&self, prediction: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1>;
}

/// Adversarial default: the generator minimizes the negated predictor loss,
/// i.e. it hunts for pairs the predictor handles worst.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvasionObjective;

impl<B: Backend> GenObjective<B> for EvasionObjective {
    fn objective(&self, prediction: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
        hilbert_loss(prediction, target).neg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    fn t(rows: Vec<f32>, shape: [usize; 2]) -> Tensor<TestBackend, 2> {
        Tensor::from_data(TensorData::new(rows, shape), &Default::default())
    }

    #[test]
    fn test_zero_for_exact_prediction() {
        let target = t(vec![1.0, -2.0, 0.5, 0.5], [1, 4]);
        let loss: f32 = hilbert_loss(target.clone(), target).into_scalar().elem();
        assert!(loss.abs() < 1e-7);
    }

    #[test]
    fn test_invariant_to_constant_shift() {
        let prediction = t(vec![1.0, -2.0, 0.5, 0.5], [1, 4]);
        let target = t(vec![0.0, 0.5, -0.5, 0.0], [1, 4]);
        let base: f32 = hilbert_loss(prediction.clone(), target.clone())
            .into_scalar()
            .elem();
        let shifted: f32 = hilbert_loss(prediction.add_scalar(42.0), target)
            .into_scalar()
            .elem();
        assert!(
            (base - shifted).abs() < 1e-4,
            "shift changed the loss: {base} vs {shifted}"
        );
    }

    #[test]
    fn test_positive_for_wrong_prediction() {
        let prediction = t(vec![2.0, 0.0, 0.0, -2.0], [1, 4]);
        let target = t(vec![-2.0, 0.0, 0.0, 2.0], [1, 4]);
        let loss: f32 = hilbert_loss(prediction, target).into_scalar().elem();
        assert!((loss - 8.0).abs() < 1e-5, "expected spread 8, got {loss}");
    }

    #[test]
    fn test_batch_mean() {
        // Row 1 spread 2, row 2 spread 4 → mean 3.
        let prediction = t(vec![1.0, -1.0, 2.0, -2.0], [2, 2]);
        let target = t(vec![0.0, 0.0, 0.0, 0.0], [2, 2]);
        let loss: f32 = hilbert_loss(prediction, target).into_scalar().elem();
        assert!((loss - 3.0).abs() < 1e-5, "expected 3.0, got {loss}");
    }

    #[test]
    fn test_evasion_negates() {
        let prediction = t(vec![1.0, -1.0], [1, 2]);
        let target = t(vec![0.0, 0.0], [1, 2]);
        let loss: f32 = hilbert_loss(prediction.clone(), target.clone())
            .into_scalar()
            .elem();
        let objective: f32 = EvasionObjective
            .objective(prediction, target)
            .into_scalar()
            .elem();
        assert!((loss + objective).abs() < 1e-6);
    }
}
