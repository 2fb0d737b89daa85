//! Ground-cost construction for square grids.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::{Result, TransportError};

/// Pairwise ground-distance matrix over the flattened cells of a square grid.
///
/// Symmetric, nonnegative, zero diagonal, immutable for the lifetime of a
/// run. The largest entry is cached at construction so the run's
/// regularization parameter can be derived without a device round trip.
#[derive(Debug, Clone)]
pub struct CostMatrix<B: Backend> {
    matrix: Tensor<B, 2>,
    dim: usize,
    max: f64,
}

impl<B: Backend> CostMatrix<B> {
    /// Squared Euclidean distance between the cells of a `length × length`
    /// grid, coordinates scaled to `[0, 1]` on both axes. For `length > 1`
    /// the largest entry is 2.0 (opposite corners).
    pub fn squared_grid(length: usize, device: &B::Device) -> Result<Self> {
        if length == 0 {
            return Err(TransportError::Domain("grid length must be at least 1"));
        }
        let dim = length * length;
        let scale = if length > 1 { (length - 1) as f64 } else { 1.0 };

        let mut flat = vec![0.0f32; dim * dim];
        let mut max = 0.0f64;
        for a in 0..dim {
            let (ar, ac) = (a / length, a % length);
            for b in 0..dim {
                let (br, bc) = (b / length, b % length);
                let dr = (ar as f64 - br as f64) / scale;
                let dc = (ac as f64 - bc as f64) / scale;
                let c = dr * dr + dc * dc;
                if c > max {
                    max = c;
                }
                flat[a * dim + b] = c as f32;
            }
        }

        Ok(Self {
            matrix: Tensor::from_data(TensorData::new(flat, [dim, dim]), device),
            dim,
            max,
        })
    }

    /// Wrap an arbitrary square cost matrix (tests, custom geometries).
    ///
    /// Validates squareness and finiteness; symmetry is the caller's
    /// responsibility.
    pub fn from_tensor(matrix: Tensor<B, 2>) -> Result<Self> {
        let [rows, cols] = matrix.dims();
        if rows != cols {
            return Err(TransportError::Domain("cost matrix must be square"));
        }
        let max: f64 = matrix.clone().max().into_scalar().elem();
        if !max.is_finite() {
            return Err(TransportError::NonFinite("cost matrix"));
        }
        Ok(Self {
            matrix,
            dim: rows,
            max,
        })
    }

    /// The cost matrix as a tensor (cheap clone of the handle).
    pub fn tensor(&self) -> Tensor<B, 2> {
        self.matrix.clone()
    }

    /// Number of grid cells (rows/columns of the matrix).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Largest ground cost.
    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Derive the run's regularization constant as a fixed fraction of the
/// largest ground cost.
pub fn eps_from_cost<B: Backend>(cost: &CostMatrix<B>, frac: f64) -> Result<f64> {
    if !(frac > 0.0 && frac.is_finite()) {
        return Err(TransportError::InvalidRegularization(frac));
    }
    let eps = cost.max() * frac;
    if !(eps > 0.0) {
        return Err(TransportError::InvalidRegularization(eps));
    }
    Ok(eps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_squared_grid_shape_and_range() {
        let device = Default::default();
        let cost = CostMatrix::<TestBackend>::squared_grid(3, &device).unwrap();
        assert_eq!(cost.dim(), 9);
        assert!((cost.max() - 2.0).abs() < 1e-9);

        let data: Vec<f32> = cost.tensor().into_data().to_vec().unwrap();
        // Zero diagonal
        for i in 0..9 {
            assert_eq!(data[i * 9 + i], 0.0);
        }
        // Symmetric
        for i in 0..9 {
            for j in 0..9 {
                assert!((data[i * 9 + j] - data[j * 9 + i]).abs() < 1e-7);
            }
        }
        // Nonnegative
        assert!(data.iter().all(|&c| c >= 0.0));
    }

    #[test]
    fn test_squared_grid_corner_distance() {
        let device = Default::default();
        let cost = CostMatrix::<TestBackend>::squared_grid(2, &device).unwrap();
        let data: Vec<f32> = cost.tensor().into_data().to_vec().unwrap();
        // Cells 0 = (0,0) and 3 = (1,1): squared distance 1 + 1 = 2 on the unit grid.
        assert!((data[0 * 4 + 3] - 2.0).abs() < 1e-6);
        // Cells 0 = (0,0) and 1 = (0,1): squared distance 1.
        assert!((data[0 * 4 + 1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_eps_from_cost() {
        let device = Default::default();
        let cost = CostMatrix::<TestBackend>::squared_grid(28, &device).unwrap();
        let eps = eps_from_cost(&cost, 5e-4).unwrap();
        assert!((eps - cost.max() * 5e-4).abs() < 1e-12);

        assert!(eps_from_cost(&cost, 0.0).is_err());
        assert!(eps_from_cost(&cost, f64::NAN).is_err());
    }

    #[test]
    fn test_from_tensor_rejects_non_square() {
        let device = Default::default();
        let t = Tensor::<TestBackend, 2>::zeros([2, 3], &device);
        assert!(CostMatrix::from_tensor(t).is_err());
    }

    #[test]
    fn test_zero_length_grid_rejected() {
        let device = Default::default();
        assert!(CostMatrix::<TestBackend>::squared_grid(0, &device).is_err());
    }
}
